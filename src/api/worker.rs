use std::sync::Arc;

use crate::api::{ApiRequest, ApiResponse, ChatRequest};
use crate::channels::ChannelHub;
use crate::logging;
use crate::streaming::{ChatParams, ChatTransport, ProviderConfig, TransportEvent};

/// Long-lived API worker loop. Consumes requests until a Shutdown sentinel
/// (or queue close) arrives; in-flight work is finished, never interrupted.
pub fn run(
    hub: Arc<ChannelHub>,
    transport: Box<dyn ChatTransport>,
    initial_config: Option<ProviderConfig>,
) {
    hub.worker_started();
    let mut config = initial_config;

    while let Some(request) = hub.api_request().recv() {
        match request {
            ApiRequest::Configure {
                base_url,
                api_key,
                model,
            } => {
                config = Some(ProviderConfig {
                    base_url,
                    api_key,
                    model,
                });
            }
            ApiRequest::Chat(chat) => {
                handle_chat(&hub, transport.as_ref(), config.as_ref(), chat);
            }
            ApiRequest::Shutdown => break,
        }
    }

    hub.worker_stopped();
}

/// Streams one chat request. Every delta goes out the moment it arrives;
/// exactly one terminal response (StreamComplete or StreamError) follows.
fn handle_chat(
    hub: &ChannelHub,
    transport: &dyn ChatTransport,
    config: Option<&ProviderConfig>,
    chat: ChatRequest,
) {
    let request_id = chat.request_id.clone();

    let Some(config) = config else {
        hub.api_response().send(ApiResponse::StreamError {
            request_id,
            error: "API worker is not configured".to_string(),
        });
        return;
    };

    hub.api_response().send(ApiResponse::Ready {
        request_id: request_id.clone(),
    });

    let params = ChatParams {
        messages: &chat.messages,
        model: chat.model.clone(),
        max_tokens: chat.max_tokens,
        temperature: chat.temperature,
        tools: if chat.enable_tools {
            chat.tool_schemas.clone()
        } else {
            Vec::new()
        },
    };

    let rid = request_id.clone();
    let mut on_event = |event: TransportEvent| match event {
        TransportEvent::TextDelta(text) => {
            hub.api_response().send(ApiResponse::StreamChunk {
                request_id: rid.clone(),
                content: text,
                tool_call_deltas: Vec::new(),
            });
        }
        TransportEvent::ToolCallDelta(delta) => {
            hub.api_response().send(ApiResponse::StreamChunk {
                request_id: rid.clone(),
                content: String::new(),
                tool_call_deltas: vec![delta],
            });
        }
        TransportEvent::ToolCall(tool_call) => {
            hub.api_response().send(ApiResponse::ToolCallRequest {
                request_id: rid.clone(),
                tool_call,
            });
        }
    };

    match transport.stream_chat(config, &params, &mut on_event) {
        Ok(usage) => {
            hub.api_response().send(ApiResponse::StreamComplete {
                request_id,
                usage,
            });
        }
        Err(e) => {
            let _ = logging::log(&format!("stream failed for {}: {}", request_id, e));
            hub.api_response().send(ApiResponse::StreamError {
                request_id,
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Usage;
    use crate::session::types::{Message, ToolCall};
    use crate::streaming::TransportError;
    use std::thread;

    /// Scripted transport that replays a fixed event sequence.
    struct ScriptedTransport {
        events: Vec<TransportEvent>,
        outcome: Result<Usage, String>,
    }

    impl ChatTransport for ScriptedTransport {
        fn stream_chat(
            &self,
            _config: &ProviderConfig,
            _params: &ChatParams,
            on_event: &mut dyn FnMut(TransportEvent),
        ) -> Result<Usage, TransportError> {
            for event in &self.events {
                on_event(event.clone());
            }
            self.outcome
                .clone()
                .map_err(TransportError::Provider)
        }
    }

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            base_url: "http://localhost".to_string(),
            api_key: "test".to_string(),
            model: "test-model".to_string(),
        }
    }

    fn chat_request(id: &str) -> ChatRequest {
        ChatRequest {
            request_id: id.to_string(),
            messages: vec![Message::user("hi")],
            model: String::new(),
            max_tokens: 128,
            temperature: 0.0,
            enable_tools: true,
            tool_schemas: Vec::new(),
            scope_name: "main".to_string(),
        }
    }

    fn run_worker(transport: ScriptedTransport, hub: Arc<ChannelHub>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            run(hub, Box::new(transport), Some(test_config()));
        })
    }

    fn drain_responses(hub: &ChannelHub) -> Vec<ApiResponse> {
        let mut responses = Vec::new();
        while let Some(resp) = hub.api_response().try_recv() {
            responses.push(resp);
        }
        responses
    }

    #[test]
    fn test_chat_streams_chunks_then_complete() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: vec![
                TransportEvent::TextDelta("Hel".to_string()),
                TransportEvent::TextDelta("lo".to_string()),
            ],
            outcome: Ok(Usage {
                prompt_tokens: 10,
                completion_tokens: 2,
            }),
        };

        let handle = run_worker(transport, Arc::clone(&hub));
        hub.api_request().send(ApiRequest::Chat(chat_request("req-1")));
        hub.signal_shutdown();
        handle.join().unwrap();

        let responses = drain_responses(&hub);
        assert!(matches!(&responses[0], ApiResponse::Ready { request_id } if request_id == "req-1"));
        assert!(
            matches!(&responses[1], ApiResponse::StreamChunk { content, .. } if content == "Hel")
        );
        assert!(
            matches!(&responses[2], ApiResponse::StreamChunk { content, .. } if content == "lo")
        );
        assert!(matches!(
            &responses[3],
            ApiResponse::StreamComplete { usage, .. } if usage.completion_tokens == 2
        ));
        assert_eq!(responses.len(), 4);
    }

    #[test]
    fn test_tool_calls_interleave_with_text() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: vec![
                TransportEvent::TextDelta("Checking".to_string()),
                TransportEvent::ToolCall(ToolCall {
                    id: "call_1".to_string(),
                    name: "list".to_string(),
                    arguments: "{}".to_string(),
                }),
            ],
            outcome: Ok(Usage::default()),
        };

        let handle = run_worker(transport, Arc::clone(&hub));
        hub.api_request().send(ApiRequest::Chat(chat_request("req-2")));
        hub.signal_shutdown();
        handle.join().unwrap();

        let responses = drain_responses(&hub);
        assert!(matches!(
            &responses[2],
            ApiResponse::ToolCallRequest { tool_call, .. } if tool_call.name == "list"
        ));
        assert!(matches!(&responses[3], ApiResponse::StreamComplete { .. }));
    }

    #[test]
    fn test_transport_failure_is_exactly_one_stream_error() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: Vec::new(),
            outcome: Err("connection refused".to_string()),
        };

        let handle = run_worker(transport, Arc::clone(&hub));
        hub.api_request().send(ApiRequest::Chat(chat_request("req-3")));
        hub.signal_shutdown();
        handle.join().unwrap();

        let responses = drain_responses(&hub);
        let errors: Vec<_> = responses
            .iter()
            .filter(|r| matches!(r, ApiResponse::StreamError { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ApiResponse::StreamError { error, .. } if error.contains("connection refused")
        ));
    }

    #[test]
    fn test_unconfigured_worker_reports_stream_error() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: Vec::new(),
            outcome: Ok(Usage::default()),
        };

        let worker_hub = Arc::clone(&hub);
        let handle = thread::spawn(move || {
            run(worker_hub, Box::new(transport), None);
        });
        hub.api_request().send(ApiRequest::Chat(chat_request("req-4")));
        hub.signal_shutdown();
        handle.join().unwrap();

        let responses = drain_responses(&hub);
        assert!(matches!(&responses[0], ApiResponse::StreamError { .. }));
    }

    #[test]
    fn test_configure_updates_endpoint_without_restart() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: vec![TransportEvent::TextDelta("ok".to_string())],
            outcome: Ok(Usage::default()),
        };

        let worker_hub = Arc::clone(&hub);
        let handle = thread::spawn(move || {
            run(worker_hub, Box::new(transport), None);
        });

        hub.api_request().send(ApiRequest::Configure {
            base_url: "http://localhost".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
        });
        hub.api_request().send(ApiRequest::Chat(chat_request("req-5")));
        hub.signal_shutdown();
        handle.join().unwrap();

        let responses = drain_responses(&hub);
        assert!(matches!(&responses[0], ApiResponse::Ready { .. }));
        assert!(responses
            .iter()
            .any(|r| matches!(r, ApiResponse::StreamComplete { .. })));
    }

    #[test]
    fn test_worker_checks_out_on_shutdown() {
        let hub = Arc::new(ChannelHub::new());
        let transport = ScriptedTransport {
            events: Vec::new(),
            outcome: Ok(Usage::default()),
        };

        let handle = run_worker(transport, Arc::clone(&hub));
        hub.signal_shutdown();
        handle.join().unwrap();
        assert_eq!(hub.active_workers(), 0);
    }
}
