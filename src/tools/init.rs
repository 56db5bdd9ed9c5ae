use std::sync::Arc;

use crate::tools::bash::BashTool;
use crate::tools::edit::EditTool;
use crate::tools::fetch::FetchTool;
use crate::tools::fs::{CreateTool, ListTool, ReadTool};
use crate::tools::ToolRegistry;

/// Builds the registry with every built-in tool. Scopes are registered
/// separately by the caller.
pub fn initialize_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(ListTool::new()));
    registry.register(Arc::new(ReadTool::new()));
    registry.register(Arc::new(CreateTool::new()));
    registry.register(Arc::new(EditTool::new()));
    registry.register(Arc::new(BashTool::new()));
    registry.register(Arc::new(FetchTool::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_registered() {
        let registry = initialize_tool_registry();
        for tool in ["list", "read", "create", "edit", "bash", "fetch"] {
            assert!(registry.get(tool).is_some(), "missing tool {}", tool);
        }
        assert_eq!(registry.list().len(), 6);
    }
}
