pub mod worker;

use serde::{Deserialize, Serialize};

use crate::session::types::{Message, ToolCall};

/// Request consumed by the API worker.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    /// Swaps the worker's active endpoint without a restart.
    Configure {
        base_url: String,
        api_key: String,
        model: String,
    },
    Chat(ChatRequest),
    /// Sentinel pushed by ChannelHub::signal_shutdown.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Caller-chosen correlation key, unique per in-flight request.
    pub request_id: String,
    pub messages: Vec<Message>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub enable_tools: bool,
    pub tool_schemas: Vec<serde_json::Value>,
    pub scope_name: String,
}

/// Responses streamed back by the API worker. Several responses share one
/// request id; the consumer accumulates until a terminal variant
/// (StreamComplete or StreamError) arrives.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Ready {
        request_id: String,
    },
    StreamChunk {
        request_id: String,
        content: String,
        tool_call_deltas: Vec<ToolCallDelta>,
    },
    /// A fully accumulated tool call. Emitted as soon as the call is
    /// complete, which may be before the stream finishes.
    ToolCallRequest {
        request_id: String,
        tool_call: ToolCall,
    },
    StreamComplete {
        request_id: String,
        usage: Usage,
    },
    StreamError {
        request_id: String,
        error: String,
    },
}

impl ApiResponse {
    pub fn request_id(&self) -> &str {
        match self {
            ApiResponse::Ready { request_id }
            | ApiResponse::StreamChunk { request_id, .. }
            | ApiResponse::ToolCallRequest { request_id, .. }
            | ApiResponse::StreamComplete { request_id, .. }
            | ApiResponse::StreamError { request_id, .. } => request_id,
        }
    }
}

/// A partial tool-call fragment as it arrives on the wire. Fragments for one
/// call share an index; arguments accumulate across fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallDelta {
    pub index: u64,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_request_id_accessor() {
        let resp = ApiResponse::StreamChunk {
            request_id: "req-1".to_string(),
            content: "hi".to_string(),
            tool_call_deltas: Vec::new(),
        };
        assert_eq!(resp.request_id(), "req-1");

        let resp = ApiResponse::StreamError {
            request_id: "req-2".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(resp.request_id(), "req-2");
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage {
            prompt_tokens: 100,
            completion_tokens: 20,
        };
        assert_eq!(usage.total(), 120);
    }
}
