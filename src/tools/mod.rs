use serde_json::Value;

pub mod bash;
pub mod edit;
pub mod fetch;
pub mod fs;
pub mod init;
pub mod registry;
pub mod types;
pub mod worker;

pub use bash::BashTool;
pub use edit::EditTool;
pub use fetch::FetchTool;
pub use init::initialize_tool_registry;
pub use registry::ToolRegistry;
pub use types::{
    ParameterSchema, ParameterType, Tool, ToolCallJob, ToolError, ToolId, ToolRequest,
    ToolResponse, ToolResult,
};

pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;
    fn validate(&self, params: &Value) -> Result<(), ToolError>;
    fn execute(&self, params: Value) -> Result<ToolResult, ToolError>;
}

pub fn validate_required(params: &Value, required: &[&str]) -> Result<(), ToolError> {
    let obj = params
        .as_object()
        .ok_or_else(|| ToolError::Validation("Parameters must be an object".to_string()))?;

    for field in required {
        if !obj.contains_key(*field) {
            return Err(ToolError::Validation(format!(
                "Missing required parameter: {}",
                field
            )));
        }
    }

    Ok(())
}

pub fn get_string_param(params: &Value, name: &str) -> Option<String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_integer_param(params: &Value, name: &str) -> Option<i64> {
    params.get(name).and_then(|v| v.as_i64())
}

pub fn get_bool_param(params: &Value, name: &str, default: bool) -> bool {
    params
        .get(name)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_present() {
        let params = serde_json::json!({"path": "/tmp"});
        assert!(validate_required(&params, &["path"]).is_ok());
    }

    #[test]
    fn test_validate_required_missing() {
        let params = serde_json::json!({});
        let err = validate_required(&params, &["path"]).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_param_helpers() {
        let params = serde_json::json!({"name": "x", "count": 3, "flag": true});
        assert_eq!(get_string_param(&params, "name").as_deref(), Some("x"));
        assert_eq!(get_integer_param(&params, "count"), Some(3));
        assert!(get_bool_param(&params, "flag", false));
        assert!(get_bool_param(&params, "missing", true));
    }
}
