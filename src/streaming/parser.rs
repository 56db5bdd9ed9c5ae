use std::collections::BTreeMap;

use crate::api::{ToolCallDelta, Usage};
use crate::session::types::ToolCall;

/// Events produced while parsing a chat-completions SSE stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallDelta(ToolCallDelta),
    /// A tool call whose fragments have all arrived.
    ToolCall(ToolCall),
    Usage(Usage),
    Done,
    Error(String),
}

#[derive(Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Incremental parser for OpenAI-compatible `data:` lines. Text deltas are
/// emitted immediately; tool-call fragments accumulate per wire index and
/// flush as complete calls once a finish_reason or [DONE] is seen.
pub struct StreamParser {
    partial: BTreeMap<u64, PartialCall>,
    finished: bool,
    flushed: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            partial: BTreeMap::new(),
            finished: false,
            flushed: false,
        }
    }

    /// Parses one line of the SSE body. Lines without a data prefix
    /// (comments, event names, blanks) produce no events.
    pub fn parse_line(&mut self, line: &str) -> Vec<StreamEvent> {
        let Some(data) = line.strip_prefix("data:") else {
            return Vec::new();
        };
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }

        if data == "[DONE]" {
            let mut events = self.flush_tool_calls();
            if !self.finished {
                self.finished = true;
                events.push(StreamEvent::Done);
            }
            return events;
        }

        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => return vec![StreamEvent::Error(format!("Malformed SSE JSON: {}", e))],
        };

        self.handle_chunk(&value)
    }

    /// Flushes pending state when the stream ends without a [DONE] marker.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = self.flush_tool_calls();
        if !self.finished {
            self.finished = true;
            events.push(StreamEvent::Done);
        }
        events
    }

    fn handle_chunk(&mut self, value: &serde_json::Value) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown provider error");
            events.push(StreamEvent::Error(message.to_string()));
            return events;
        }

        if let Some(usage) = value.get("usage").filter(|u| !u.is_null()) {
            events.push(StreamEvent::Usage(Usage {
                prompt_tokens: usage
                    .get("prompt_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
                completion_tokens: usage
                    .get("completion_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0),
            }));
        }

        let Some(choice) = value
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
        else {
            return events;
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    events.push(StreamEvent::TextDelta(text.to_string()));
                }
            }

            if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
                for fragment in tool_calls {
                    if let Some(event) = self.absorb_fragment(fragment) {
                        events.push(event);
                    }
                }
            }
        }

        if choice
            .get("finish_reason")
            .and_then(|v| v.as_str())
            .is_some()
        {
            events.extend(self.flush_tool_calls());
        }

        events
    }

    fn absorb_fragment(&mut self, fragment: &serde_json::Value) -> Option<StreamEvent> {
        let index = fragment.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
        let id = fragment.get("id").and_then(|v| v.as_str()).unwrap_or("");
        let function = fragment.get("function");
        let name = function
            .and_then(|f| f.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let arguments = function
            .and_then(|f| f.get("arguments"))
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let entry = self.partial.entry(index).or_default();
        if !id.is_empty() {
            entry.id = id.to_string();
        }
        if !name.is_empty() {
            entry.name = name.to_string();
        }
        entry.arguments.push_str(arguments);

        if id.is_empty() && name.is_empty() && arguments.is_empty() {
            return None;
        }

        Some(StreamEvent::ToolCallDelta(ToolCallDelta {
            index,
            id: (!id.is_empty()).then(|| id.to_string()),
            name: (!name.is_empty()).then(|| name.to_string()),
            arguments: arguments.to_string(),
        }))
    }

    fn flush_tool_calls(&mut self) -> Vec<StreamEvent> {
        if self.flushed {
            return Vec::new();
        }
        let mut events = Vec::new();
        for (index, partial) in std::mem::take(&mut self.partial) {
            if partial.name.is_empty() {
                continue;
            }
            let id = if partial.id.is_empty() {
                format!("toolcall-{}", index)
            } else {
                partial.id
            };
            events.push(StreamEvent::ToolCall(ToolCall {
                id,
                name: partial.name,
                arguments: partial.arguments,
            }));
        }
        if !events.is_empty() {
            self.flushed = true;
        }
        events
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}
