use std::sync::Arc;

use crate::channels::ChannelHub;
use crate::tools::types::{ToolCallJob, ToolRequest, ToolResponse};
use crate::tools::ToolRegistry;
use crate::ui::UiUpdate;

/// Long-lived tool worker loop: one request at a time, results always as
/// data. Parallel tool execution means running more instances of this loop,
/// not complicating it.
pub fn run(hub: Arc<ChannelHub>, registry: Arc<ToolRegistry>) {
    hub.worker_started();

    while let Some(request) = hub.tool_request().recv() {
        match request {
            ToolRequest::Shutdown => break,
            ToolRequest::Call(job) => {
                hub.ui_update().try_send(UiUpdate::ToolStarted {
                    tool: job.tool_name.clone(),
                    call_id: job.request_id.clone(),
                });

                let result = execute_job(&registry, &job);

                hub.ui_update().try_send(UiUpdate::ToolFinished {
                    tool: job.tool_name.clone(),
                    call_id: job.request_id.clone(),
                    ok: result.is_ok(),
                });
                hub.tool_response().send(ToolResponse {
                    request_id: job.request_id,
                    tool_name: job.tool_name,
                    result,
                });
            }
        }
    }

    hub.worker_stopped();
}

fn execute_job(registry: &ToolRegistry, job: &ToolCallJob) -> Result<String, String> {
    // Registration first: an unregistered name is "unknown tool" no matter
    // what the scope says.
    let handler = registry
        .get(&job.tool_name)
        .ok_or_else(|| format!("unknown tool '{}'", job.tool_name))?;

    if !registry.is_allowed(&job.scope_name, &job.tool_name) {
        return Err(format!(
            "tool '{}' is not permitted for scope '{}'",
            job.tool_name, job.scope_name
        ));
    }

    let params: serde_json::Value = serde_json::from_str(&job.arguments)
        .map_err(|e| format!("invalid tool arguments: {}", e))?;

    handler.validate(&params).map_err(|e| e.to_string())?;
    handler
        .execute(params)
        .map(|result| result.output)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::scope::AgentScope;
    use crate::tools::types::{Tool, ToolError, ToolResult};
    use crate::tools::ToolHandler;
    use serde_json::Value;
    use std::thread;

    struct UpperTool;

    impl ToolHandler for UpperTool {
        fn definition(&self) -> Tool {
            Tool {
                id: "upper".to_string(),
                description: "Uppercases text".to_string(),
                parameters: Vec::new(),
            }
        }

        fn validate(&self, params: &Value) -> Result<(), ToolError> {
            crate::tools::validate_required(params, &["text"])
        }

        fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
            let text = crate::tools::get_string_param(&params, "text")
                .ok_or_else(|| ToolError::Validation("text is required".to_string()))?;
            Ok(ToolResult::new("Upper", text.to_uppercase()))
        }
    }

    struct FailingTool;

    impl ToolHandler for FailingTool {
        fn definition(&self) -> Tool {
            Tool {
                id: "broken".to_string(),
                description: "Always fails".to_string(),
                parameters: Vec::new(),
            }
        }

        fn validate(&self, _params: &Value) -> Result<(), ToolError> {
            Ok(())
        }

        fn execute(&self, _params: Value) -> Result<ToolResult, ToolError> {
            Err(ToolError::Execution("deliberate failure".to_string()))
        }
    }

    fn test_registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        registry.register(Arc::new(FailingTool));
        registry.register_scope(AgentScope::new(
            "main",
            vec!["upper".to_string(), "broken".to_string()],
        ));
        registry.register_scope(AgentScope::new("restricted", vec!["upper".to_string()]));
        Arc::new(registry)
    }

    fn job(id: &str, tool: &str, arguments: &str, scope: &str) -> ToolCallJob {
        ToolCallJob {
            request_id: id.to_string(),
            tool_name: tool.to_string(),
            arguments: arguments.to_string(),
            scope_name: scope.to_string(),
        }
    }

    fn run_one(job: ToolCallJob) -> ToolResponse {
        let hub = Arc::new(ChannelHub::new());
        let registry = test_registry();
        let worker_hub = Arc::clone(&hub);

        let handle = thread::spawn(move || run(worker_hub, registry));
        hub.tool_request().send(ToolRequest::Call(job));
        hub.signal_shutdown();
        handle.join().unwrap();

        hub.tool_response().try_recv().expect("expected a response")
    }

    #[test]
    fn test_successful_invocation() {
        let resp = run_one(job("call_1", "upper", r#"{"text":"hi"}"#, "main"));
        assert_eq!(resp.request_id, "call_1");
        assert_eq!(resp.result.unwrap(), "HI");
    }

    #[test]
    fn test_execution_failure_is_data() {
        let resp = run_one(job("call_2", "broken", "{}", "main"));
        let err = resp.result.unwrap_err();
        assert!(err.contains("deliberate failure"));
    }

    #[test]
    fn test_permission_denied_for_scope() {
        let resp = run_one(job("call_3", "broken", "{}", "restricted"));
        let err = resp.result.unwrap_err();
        assert!(err.contains("not permitted"));
    }

    #[test]
    fn test_unknown_tool() {
        let resp = run_one(job("call_4", "upper", r#"{"text":"x"}"#, "ghost-scope"));
        assert!(resp.result.is_err());

        let registry = test_registry();
        let err = execute_job(&registry, &job("call_5", "nope", "{}", "main")).unwrap_err();
        assert!(err.contains("unknown tool"));

        // Unregistered beats unpermitted even when the scope lists neither.
        let err = execute_job(&registry, &job("call_6", "nope", "{}", "restricted")).unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[test]
    fn test_invalid_arguments_json() {
        let registry = test_registry();
        let err = execute_job(&registry, &job("call_6", "upper", "{not json", "main")).unwrap_err();
        assert!(err.contains("invalid tool arguments"));
    }

    #[test]
    fn test_validation_failure() {
        let registry = test_registry();
        let err = execute_job(&registry, &job("call_7", "upper", "{}", "main")).unwrap_err();
        assert!(err.contains("Missing required parameter"));
    }

    #[test]
    fn test_ui_updates_pushed() {
        let hub = Arc::new(ChannelHub::new());
        let registry = test_registry();
        let worker_hub = Arc::clone(&hub);

        let handle = thread::spawn(move || run(worker_hub, registry));
        hub.tool_request().send(ToolRequest::Call(job(
            "call_8",
            "upper",
            r#"{"text":"a"}"#,
            "main",
        )));
        hub.signal_shutdown();
        handle.join().unwrap();

        let mut updates = Vec::new();
        while let Some(update) = hub.ui_update().try_recv() {
            updates.push(update);
        }
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ToolStarted { tool, .. } if tool == "upper")));
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ToolFinished { ok: true, .. })));
    }
}
