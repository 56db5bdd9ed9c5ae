use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::completion;
use crate::agent::scope::AgentScope;
use crate::api::{ApiRequest, ApiResponse, ChatRequest};
use crate::channels::ChannelHub;
use crate::logging::log_debug;
use crate::session::store::ConversationStore;
use crate::session::types::{Message, ToolCall};
use crate::tools::fetch::cache_path;
use crate::tools::types::{ToolCallJob, ToolRequest, ToolResponse};
use crate::tools::ToolRegistry;
use crate::ui::{UiSink, UiUpdate};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const SUMMARY_PROMPT: &str = "Summarize in two or three sentences what was \
done to complete this task.";

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub model: String,
    pub max_turns: u32,
    pub turn_timeout: Duration,
    pub tool_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_turns: 10,
            turn_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Outcome of one driver run.
#[derive(Debug, Clone, Default)]
pub struct TaskResult {
    pub success: bool,
    pub summary: String,
    /// Files the model created or edited during the run.
    pub modified_artifacts: Vec<String>,
    /// Cache files produced as side effects (fetched pages).
    pub temporary_artifacts: Vec<String>,
    pub tool_call_count: u32,
    pub tokens_used: u64,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("turn {turn} exceeded the {limit_secs}s turn timeout")]
    TurnTimeout { turn: u32, limit_secs: u64 },
    #[error("tool call {call_id} ({tool}) exceeded the {limit_secs}s tool timeout")]
    ToolTimeout {
        call_id: String,
        tool: String,
        limit_secs: u64,
    },
    #[error("stream failed: {0}")]
    Stream(String),
    #[error("turn budget of {0} exhausted without completion")]
    TurnBudget(u32),
    #[error("conversation store error: {0}")]
    Store(String),
}

/// What the model did with one turn.
enum TurnOutcome {
    /// One or more complete tool calls arrived. Any text that streamed
    /// before them is carried along.
    ToolCalls { text: String, calls: Vec<ToolCall> },
    /// The stream finished with text only.
    Text { text: String },
}

/// Runs the agentic loop on the orchestrator thread: request a completion,
/// execute any tool calls the model makes, fold the results back into the
/// conversation, and stop when the model signals completion or the turn
/// budget runs out. All cross-thread traffic goes through the hub.
pub struct AgentDriver {
    hub: Arc<ChannelHub>,
    registry: ToolRegistry,
    scope: AgentScope,
    config: DriverConfig,
    system_prompt: String,
    ui: Box<dyn UiSink>,
    /// Request ids this driver sent whose streams may still be in flight.
    /// Lets a stale StreamComplete contribute its usage instead of being
    /// dropped as foreign traffic.
    issued: HashSet<String>,
    tokens_used: u64,
}

impl AgentDriver {
    pub fn new(
        hub: Arc<ChannelHub>,
        registry: ToolRegistry,
        scope: AgentScope,
        config: DriverConfig,
        system_prompt: String,
        ui: Box<dyn UiSink>,
    ) -> Self {
        Self {
            hub,
            registry,
            scope,
            config,
            system_prompt,
            ui,
            issued: HashSet::new(),
            tokens_used: 0,
        }
    }

    pub fn run(&mut self, store: &mut dyn ConversationStore, task: &str) -> TaskResult {
        self.issued.clear();
        self.tokens_used = 0;

        let mut result = TaskResult::default();

        if let Err(e) = store.add_user_message(task) {
            return self.fail(result, DriverError::Store(e.to_string()));
        }

        for turn in 1..=self.config.max_turns {
            self.hub.ui_update().send(UiUpdate::TurnStarted { turn });

            let request_id = cuid2::create_id();
            self.issued.insert(request_id.clone());
            self.send_chat(&request_id, self.build_messages(store), true);

            let outcome = match self.pump_turn(&request_id, turn) {
                Ok(outcome) => outcome,
                Err(e) => return self.fail(result, e),
            };

            match outcome {
                TurnOutcome::ToolCalls { text, calls } => {
                    if let Err(e) = store.add_assistant_message(&text, &calls) {
                        return self.fail(result, DriverError::Store(e.to_string()));
                    }
                    for call in calls {
                        if let Err(e) = self.execute_call(store, &call, &mut result) {
                            return self.fail(result, e);
                        }
                    }
                }
                TurnOutcome::Text { text } => {
                    // A turn without tool calls ends the task, signal or
                    // not; the detector only refines how the ending reads.
                    if let Err(e) = store.add_assistant_message(&text, &[]) {
                        return self.fail(result, DriverError::Store(e.to_string()));
                    }
                    if !completion::detect(&text).is_signaled() {
                        self.hub.ui_update().send(UiUpdate::Notice(
                            "model finished without an explicit completion signal".to_string(),
                        ));
                    }
                    result.success = true;
                    result.summary = self
                        .request_summary(store)
                        .unwrap_or_else(|| text.trim().to_string());
                    result.tokens_used = self.tokens_used;
                    self.hub
                        .ui_update()
                        .send(UiUpdate::TaskDone { success: true });
                    self.drain_ui();
                    return result;
                }
            }
        }

        self.fail(result, DriverError::TurnBudget(self.config.max_turns))
    }

    fn fail(&mut self, mut result: TaskResult, error: DriverError) -> TaskResult {
        result.success = false;
        result.error = Some(error.to_string());
        result.tokens_used = self.tokens_used;
        self.hub
            .ui_update()
            .send(UiUpdate::TaskDone { success: false });
        self.drain_ui();
        result
    }

    fn build_messages(&self, store: &dyn ConversationStore) -> Vec<Message> {
        let mut messages = vec![Message::system(&self.system_prompt)];
        messages.extend(store.context());
        messages
    }

    fn send_chat(&self, request_id: &str, messages: Vec<Message>, enable_tools: bool) {
        let tool_schemas = if enable_tools {
            self.registry.schemas_for(&self.scope.name)
        } else {
            Vec::new()
        };
        self.hub.api_request().send(ApiRequest::Chat(ChatRequest {
            request_id: request_id.to_string(),
            messages,
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            enable_tools,
            tool_schemas,
            scope_name: self.scope.name.clone(),
        }));
    }

    /// Consumes one turn's stream. Returns as soon as the first complete
    /// tool call arrives (after draining anything already queued), without
    /// waiting for StreamComplete; the request id stays in `issued` so the
    /// late terminal chunk is absorbed instead of discarded.
    fn pump_turn(&mut self, request_id: &str, turn: u32) -> Result<TurnOutcome, DriverError> {
        let deadline = Instant::now() + self.config.turn_timeout;
        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();

        loop {
            self.drain_ui();

            let response = match self.hub.api_response().try_recv() {
                Some(response) => response,
                None => {
                    if !calls.is_empty() {
                        // Early exit: the tool call is complete and nothing
                        // else is queued; do not wait out the stream.
                        return Ok(TurnOutcome::ToolCalls { text, calls });
                    }
                    if Instant::now() >= deadline {
                        return Err(DriverError::TurnTimeout {
                            turn,
                            limit_secs: self.config.turn_timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                    continue;
                }
            };

            if response.request_id() != request_id {
                self.absorb_foreign(response);
                continue;
            }

            match response {
                ApiResponse::Ready { .. } => {}
                ApiResponse::StreamChunk { content, .. } => {
                    if !content.is_empty() {
                        self.hub
                            .ui_update()
                            .send(UiUpdate::AssistantDelta(content.clone()));
                        text.push_str(&content);
                    }
                }
                ApiResponse::ToolCallRequest { tool_call, .. } => {
                    calls.push(tool_call);
                }
                ApiResponse::StreamComplete { usage, .. } => {
                    self.tokens_used += usage.total();
                    self.issued.remove(request_id);
                    if calls.is_empty() {
                        return Ok(TurnOutcome::Text { text });
                    }
                    return Ok(TurnOutcome::ToolCalls { text, calls });
                }
                ApiResponse::StreamError { error, .. } => {
                    self.issued.remove(request_id);
                    return Err(DriverError::Stream(error));
                }
            }
        }
    }

    /// Responses for requests this driver never issued are dropped. A stale
    /// terminal from an early-exited turn still settles that id: a complete
    /// counts its usage, an error is logged; either way the id leaves the
    /// issued set.
    fn absorb_foreign(&mut self, response: ApiResponse) {
        let id = response.request_id().to_string();
        if self.issued.contains(&id) {
            match response {
                ApiResponse::StreamComplete { usage, .. } => {
                    self.tokens_used += usage.total();
                    self.issued.remove(&id);
                }
                ApiResponse::StreamError { error, .. } => {
                    log_debug(&format!("stale stream {} ended in error: {}", id, error));
                    self.issued.remove(&id);
                }
                _ => {}
            }
        } else {
            log_debug(&format!("discarding response for unknown request {}", id));
        }
    }

    fn execute_call(
        &mut self,
        store: &mut dyn ConversationStore,
        call: &ToolCall,
        result: &mut TaskResult,
    ) -> Result<(), DriverError> {
        if !self.registry.is_allowed(&self.scope.name, &call.name) {
            let denial = format!(
                "Tool '{}' is not permitted in scope '{}'.",
                call.name, self.scope.name
            );
            self.hub.ui_update().send(UiUpdate::Notice(denial.clone()));
            store
                .add_tool_message(&denial, &call.id)
                .map_err(|e| DriverError::Store(e.to_string()))?;
            return Ok(());
        }

        result.tool_call_count += 1;
        self.hub
            .tool_request()
            .send(ToolRequest::Call(ToolCallJob {
                request_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: call.arguments.clone(),
                scope_name: self.scope.name.clone(),
            }));

        let response = match self.await_tool_result(&call.id, &call.name) {
            Ok(response) => response,
            Err(e) => {
                // Leave a record of the timeout in the conversation before
                // aborting the run.
                let note = format!(
                    "Tool '{}' timed out after {} seconds.",
                    call.name,
                    self.config.tool_timeout.as_secs()
                );
                store
                    .add_tool_message(&note, &call.id)
                    .map_err(|e| DriverError::Store(e.to_string()))?;
                return Err(e);
            }
        };

        match response.result {
            Ok(output) => {
                self.record_artifacts(call, result);
                store
                    .add_tool_message(&output, &call.id)
                    .map_err(|e| DriverError::Store(e.to_string()))?;
            }
            Err(error) => {
                store
                    .add_tool_message(&format!("Tool error: {}", error), &call.id)
                    .map_err(|e| DriverError::Store(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn await_tool_result(
        &mut self,
        call_id: &str,
        tool: &str,
    ) -> Result<ToolResponse, DriverError> {
        let deadline = Instant::now() + self.config.tool_timeout;
        loop {
            self.drain_ui();
            match self.hub.tool_response().try_recv() {
                Some(response) if response.request_id == call_id => return Ok(response),
                Some(response) => {
                    log_debug(&format!(
                        "discarding tool response for unknown call {}",
                        response.request_id
                    ));
                }
                None => {
                    if Instant::now() >= deadline {
                        return Err(DriverError::ToolTimeout {
                            call_id: call_id.to_string(),
                            tool: tool.to_string(),
                            limit_secs: self.config.tool_timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    fn record_artifacts(&self, call: &ToolCall, result: &mut TaskResult) {
        let args: serde_json::Value =
            serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);
        match call.name.as_str() {
            "create" | "edit" => {
                if let Some(path) = args.get("file_path").and_then(|v| v.as_str()) {
                    let path = path.to_string();
                    if !result.modified_artifacts.contains(&path) {
                        result.modified_artifacts.push(path);
                    }
                }
            }
            "fetch" => {
                if let Some(url) = args.get("url").and_then(|v| v.as_str()) {
                    let path = cache_path(url).to_string_lossy().to_string();
                    if !result.temporary_artifacts.contains(&path) {
                        result.temporary_artifacts.push(path);
                    }
                }
            }
            _ => {}
        }
    }

    /// One extra tools-off request asking the model to recap the run. Best
    /// effort: any failure falls back to the caller's text.
    fn request_summary(&mut self, store: &dyn ConversationStore) -> Option<String> {
        let request_id = cuid2::create_id();
        self.issued.insert(request_id.clone());

        let mut messages = self.build_messages(store);
        messages.push(Message::user(SUMMARY_PROMPT));
        self.send_chat(&request_id, messages, false);

        match self.pump_turn(&request_id, self.config.max_turns) {
            Ok(TurnOutcome::Text { text }) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                log_debug(&format!("summary request failed: {}", e));
                None
            }
        }
    }

    fn drain_ui(&mut self) {
        while let Some(update) = self.hub.ui_update().try_recv() {
            self.ui.update(&update);
        }
    }
}
