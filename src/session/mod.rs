pub mod store;
pub mod types;

pub use store::{ConversationStore, MemoryStore};
pub use types::{Message, MessageRole, ToolCall};
