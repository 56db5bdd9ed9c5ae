use crate::agent::scope::AgentScope;
use crate::tools::ToolRegistry;

/// Builds the system prompt for a driver run: agent role, environment
/// context, the tool schemas the scope permits, and the completion protocol
/// the driver's detector watches for.
pub struct SystemPromptComposer {
    working_directory: String,
    platform: String,
    tool_registry: Option<ToolRegistry>,
}

impl SystemPromptComposer {
    pub fn new(working_directory: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            platform: platform.into(),
            tool_registry: None,
        }
    }

    pub fn with_tool_registry(mut self, registry: ToolRegistry) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    pub fn compose(&self, scope: &AgentScope) -> String {
        let mut parts = Vec::new();

        parts.push(self.get_core_prompt());
        parts.push(self.get_environment_context());

        if let Some(ref registry) = self.tool_registry {
            parts.push(self.get_tools_context(registry, scope));
        }

        parts.push(self.get_completion_protocol());

        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    fn get_core_prompt(&self) -> String {
        r#"You are an autonomous task agent. You are given one task and you work on it until it is done.

Core Directives:
- Work step by step; use tools to inspect before you modify
- Make incremental, verifiable changes
- Fix root causes, not symptoms
- Keep responses short and factual
- Never invent tool output; only rely on results that were returned

Security:
- Assist with defensive security tasks only
- Refuse to create code for malicious purposes"#
            .to_string()
    }

    fn get_environment_context(&self) -> String {
        let date = chrono::Local::now().format("%a %b %d %Y").to_string();
        format!(
            r#"<env>
  Working directory: {}
  Platform: {}
  Today's date: {}
 </env>"#,
            self.working_directory, self.platform, date
        )
    }

    fn get_tools_context(&self, registry: &ToolRegistry, scope: &AgentScope) -> String {
        let schemas = registry.schemas_for(&scope.name);

        if schemas.is_empty() {
            return String::new();
        }

        let tools_json =
            serde_json::to_string_pretty(&schemas).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"You have access to the following tools (JSON schema):

{}

Tool use:
- Use the model's built-in tool/function calling mechanism (do not print tool calls as text).
- If you need file contents, directory listings, running commands, or edits, call the appropriate tool.
- After tool results are returned, use them to decide the next step.
- Calling a tool outside this list will be refused.
"#,
            tools_json
        )
    }

    fn get_completion_protocol(&self) -> String {
        r#"Completion:
- When the task is fully done, say so plainly (for example "Task complete.")
  and finish with a '## Summary' section describing what was done.
- Do not claim completion while work remains."#
            .to_string()
    }
}
