use std::io::{BufRead, BufReader};

use crate::api::{ToolCallDelta, Usage};
use crate::session::types::{Message, ToolCall};
use crate::streaming::parser::{StreamEvent, StreamParser};

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

pub struct ChatParams<'a> {
    pub messages: &'a [Message],
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tools: Vec<serde_json::Value>,
}

/// Control-contract events yielded by a transport while a response streams.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    TextDelta(String),
    ToolCallDelta(ToolCallDelta),
    ToolCall(ToolCall),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Streaming chat transport: accept a request, yield deltas through the
/// callback, return the final usage summary or an error. Concrete protocol
/// details stay behind this seam.
pub trait ChatTransport: Send {
    fn stream_chat(
        &self,
        config: &ProviderConfig,
        params: &ChatParams,
        on_event: &mut dyn FnMut(TransportEvent),
    ) -> Result<Usage, TransportError>;
}

/// OpenAI-compatible chat-completions transport over blocking HTTP with SSE
/// line parsing.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            // No overall timeout: streams stay open as long as the provider
            // keeps sending. Deadlines live in the driver.
            client: reqwest::blocking::Client::builder()
                .timeout(None)
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    fn build_body(config: &ProviderConfig, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            config.model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> =
            params.messages.iter().map(|m| m.to_wire()).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        if !params.tools.is_empty() {
            body["tools"] = serde_json::Value::Array(params.tools.clone());
        }

        body
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTransport for HttpTransport {
    fn stream_chat(
        &self,
        config: &ProviderConfig,
        params: &ChatParams,
        on_event: &mut dyn FnMut(TransportEvent),
    ) -> Result<Usage, TransportError> {
        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let body = Self::build_body(config, params);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", config.api_key))
            .json(&body)
            .send()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(TransportError::Provider(format!(
                "request failed with status {}: {}",
                status,
                text.trim()
            )));
        }

        let mut parser = StreamParser::new();
        let mut usage = Usage::default();
        let mut done = false;

        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line = line.map_err(|e| TransportError::Http(e.to_string()))?;
            for event in parser.parse_line(&line) {
                match dispatch(event, &mut usage, on_event)? {
                    Flow::Continue => {}
                    Flow::Done => done = true,
                }
            }
            if done {
                break;
            }
        }

        if !done {
            // Stream ended without a [DONE] marker; flush what we have.
            for event in parser.finish() {
                dispatch(event, &mut usage, on_event)?;
            }
        }

        Ok(usage)
    }
}

enum Flow {
    Continue,
    Done,
}

fn dispatch(
    event: StreamEvent,
    usage: &mut Usage,
    on_event: &mut dyn FnMut(TransportEvent),
) -> Result<Flow, TransportError> {
    match event {
        StreamEvent::TextDelta(text) => {
            on_event(TransportEvent::TextDelta(text));
            Ok(Flow::Continue)
        }
        StreamEvent::ToolCallDelta(delta) => {
            on_event(TransportEvent::ToolCallDelta(delta));
            Ok(Flow::Continue)
        }
        StreamEvent::ToolCall(call) => {
            on_event(TransportEvent::ToolCall(call));
            Ok(Flow::Continue)
        }
        StreamEvent::Usage(u) => {
            *usage = u;
            Ok(Flow::Continue)
        }
        StreamEvent::Done => Ok(Flow::Done),
        StreamEvent::Error(message) => Err(TransportError::Provider(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_body_includes_tools_when_present() {
        let config = ProviderConfig {
            base_url: "https://api.example.com/v1".to_string(),
            api_key: "key".to_string(),
            model: "default-model".to_string(),
        };
        let messages = vec![Message::user("hi")];
        let params = ChatParams {
            messages: &messages,
            model: String::new(),
            max_tokens: 1024,
            temperature: 0.2,
            tools: vec![serde_json::json!({"type": "function"})],
        };

        let body = HttpTransport::build_body(&config, &params);
        assert_eq!(body["model"], "default-model");
        assert_eq!(body["stream"], true);
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_build_body_request_model_overrides_config() {
        let config = ProviderConfig {
            base_url: "https://api.example.com".to_string(),
            api_key: "key".to_string(),
            model: "default-model".to_string(),
        };
        let messages = vec![Message::user("hi")];
        let params = ChatParams {
            messages: &messages,
            model: "requested-model".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            tools: Vec::new(),
        };

        let body = HttpTransport::build_body(&config, &params);
        assert_eq!(body["model"], "requested-model");
        assert!(body.get("tools").is_none());
    }
}
