use std::collections::HashSet;

/// The permission boundary a driver run executes under: a name plus the set
/// of tool names it may invoke.
#[derive(Debug, Clone)]
pub struct AgentScope {
    pub name: String,
    allowed: HashSet<String>,
}

impl AgentScope {
    pub fn new(name: impl Into<String>, tools: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            allowed: tools.into_iter().collect(),
        }
    }

    pub fn allows(&self, tool: &str) -> bool {
        self.allowed.contains(tool)
    }

    pub fn allowed_tools(&self) -> &HashSet<String> {
        &self.allowed
    }
}
