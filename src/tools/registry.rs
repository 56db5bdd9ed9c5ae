use crate::agent::scope::AgentScope;
use crate::tools::types::{Tool, ToolId};
use crate::tools::ToolHandler;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared registry of tool implementations plus the agent scopes permitted
/// to call them. Cloning is cheap; all clones see the same tables.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<ToolId, Arc<dyn ToolHandler>>>>,
    scopes: Arc<RwLock<HashMap<String, AgentScope>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
            scopes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register(&self, tool: Arc<dyn ToolHandler>) {
        let definition = tool.definition();
        let mut tools = self.tools.write().unwrap();
        tools.insert(definition.id.clone(), tool);
    }

    pub fn register_scope(&self, scope: AgentScope) {
        let mut scopes = self.scopes.write().unwrap();
        scopes.insert(scope.name.clone(), scope);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ToolHandler>> {
        let tools = self.tools.read().unwrap();
        tools.get(id).cloned()
    }

    /// Permission check: unknown scopes are denied outright.
    pub fn is_allowed(&self, scope_name: &str, tool: &str) -> bool {
        let scopes = self.scopes.read().unwrap();
        scopes
            .get(scope_name)
            .map(|scope| scope.allows(tool))
            .unwrap_or(false)
    }

    pub fn list(&self) -> Vec<Tool> {
        let tools = self.tools.read().unwrap();
        let mut defs: Vec<Tool> = tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// OpenAI function schemas for the tools a scope may call.
    pub fn schemas_for(&self, scope_name: &str) -> Vec<serde_json::Value> {
        self.list()
            .iter()
            .filter(|tool| self.is_allowed(scope_name, &tool.id))
            .map(|tool| tool.to_openai_schema())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
