use anyhow::Result;

use crate::session::types::{Message, ToolCall};

/// Narrow interface the driver uses to read and write durable history. The
/// driver never manages storage itself; it appends messages as the
/// conversation unfolds and rebuilds request context from `context()`.
pub trait ConversationStore: Send {
    fn add_user_message(&mut self, text: &str) -> Result<()>;
    fn add_assistant_message(&mut self, text: &str, tool_calls: &[ToolCall]) -> Result<()>;
    fn add_tool_message(&mut self, text: &str, tool_call_id: &str) -> Result<()>;
    fn context(&self) -> Vec<Message>;
}

/// In-memory store. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    messages: Vec<Message>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryStore {
    fn add_user_message(&mut self, text: &str) -> Result<()> {
        self.messages.push(Message::user(text));
        Ok(())
    }

    fn add_assistant_message(&mut self, text: &str, tool_calls: &[ToolCall]) -> Result<()> {
        self.messages
            .push(Message::assistant_with_calls(text, tool_calls.to_vec()));
        Ok(())
    }

    fn add_tool_message(&mut self, text: &str, tool_call_id: &str) -> Result<()> {
        self.messages.push(Message::tool(text, tool_call_id));
        Ok(())
    }

    fn context(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
