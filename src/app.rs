use anyhow::{bail, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::agent::{AgentDriver, AgentScope, DriverConfig, TaskResult};
use crate::channels::ChannelHub;
use crate::config::Settings;
use crate::logging::log;
use crate::persistence::SqliteStore;
use crate::prompt::SystemPromptComposer;
use crate::session::store::{ConversationStore, MemoryStore};
use crate::streaming::{HttpTransport, ProviderConfig};
use crate::tools::initialize_tool_registry;
use crate::ui::ConsoleSink;

const MAIN_SCOPE: &str = "main";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const DEFAULT_TOOLS: &[&str] = &["list", "read", "create", "edit", "bash", "fetch"];

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub task: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_turns: Option<u32>,
    /// Tool names the run may use; empty means every built-in.
    pub allow: Vec<String>,
    /// Named session to resume or create. None runs in memory only.
    pub session: Option<String>,
}

/// Wires the whole stack together and runs one task to completion: settings,
/// hub, tool registry, the two worker threads, and the driver on the calling
/// thread. Returns after shutdown has been signaled and both workers have
/// checked out (or the grace period expired).
pub fn run(options: RunOptions) -> Result<TaskResult> {
    let settings = Settings::load()?;

    let base_url = options.base_url.unwrap_or(settings.base_url.clone());
    let model = options.model.unwrap_or(settings.model.clone());
    let api_key = settings.resolve_api_key();
    if api_key.is_empty() {
        bail!("no API key configured; set TASKFORGE_API_KEY or add one to the config file");
    }
    if model.is_empty() {
        bail!("no model configured; pass --model or add one to the config file");
    }

    let allowed: Vec<String> = if options.allow.is_empty() {
        DEFAULT_TOOLS.iter().map(|s| s.to_string()).collect()
    } else {
        options.allow.clone()
    };

    let registry = initialize_tool_registry();
    let scope = AgentScope::new(MAIN_SCOPE, allowed);
    registry.register_scope(scope.clone());

    let system_prompt = SystemPromptComposer::new(
        std::env::current_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| ".".to_string()),
        std::env::consts::OS,
    )
    .with_tool_registry(registry.clone())
    .compose(&scope);

    let hub = Arc::new(ChannelHub::new());

    let api_handle = {
        let hub = Arc::clone(&hub);
        let provider = ProviderConfig {
            base_url,
            api_key,
            model: model.clone(),
        };
        thread::spawn(move || {
            crate::api::worker::run(hub, Box::new(HttpTransport::new()), Some(provider))
        })
    };
    let tool_handle = {
        let hub = Arc::clone(&hub);
        let registry = registry.clone();
        thread::spawn(move || crate::tools::worker::run(hub, Arc::new(registry)))
    };

    let config = DriverConfig {
        model,
        max_turns: options.max_turns.unwrap_or(settings.max_turns),
        turn_timeout: Duration::from_secs(settings.turn_timeout_secs),
        tool_timeout: Duration::from_secs(settings.tool_timeout_secs),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    };

    let mut driver = AgentDriver::new(
        Arc::clone(&hub),
        registry,
        scope,
        config,
        system_prompt,
        Box::new(ConsoleSink),
    );

    let mut store: Box<dyn ConversationStore> = match &options.session {
        Some(name) => Box::new(SqliteStore::open_default(name)?),
        None => Box::new(MemoryStore::new()),
    };

    let _ = log(&format!("starting task: {}", options.task));
    let result = driver.run(store.as_mut(), &options.task);
    let _ = log(&format!(
        "task finished: success={} tools={} tokens={}",
        result.success, result.tool_call_count, result.tokens_used
    ));

    hub.signal_shutdown();
    if !hub.wait_idle(SHUTDOWN_GRACE) {
        let _ = log("workers did not stop within the grace period");
    }
    let _ = api_handle.join();
    let _ = tool_handle.join();

    Ok(result)
}

pub fn print_result(result: &TaskResult) {
    if result.success {
        println!("\n{}", result.summary);
    } else if let Some(ref error) = result.error {
        eprintln!("\ntask failed: {}", error);
    }

    if !result.modified_artifacts.is_empty() {
        println!("\nModified files:");
        for path in &result.modified_artifacts {
            println!("  {}", path);
        }
    }
    if !result.temporary_artifacts.is_empty() {
        println!("\nCached files:");
        for path in &result.temporary_artifacts {
            println!("  {}", path);
        }
    }
    println!(
        "\n{} tool call(s), {} token(s)",
        result.tool_call_count, result.tokens_used
    );
}
