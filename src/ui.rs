use std::io::Write;

/// Incremental progress events pushed through the hub's ui_update queue.
/// Workers push tool activity, the driver pushes stream text; the
/// orchestrator thread drains them into a UiSink.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    TurnStarted { turn: u32 },
    AssistantDelta(String),
    ToolStarted { tool: String, call_id: String },
    ToolFinished { tool: String, call_id: String, ok: bool },
    Notice(String),
    TaskDone { success: bool },
}

pub trait UiSink: Send {
    fn update(&mut self, update: &UiUpdate);
}

/// Plain terminal renderer for the CLI.
pub struct ConsoleSink;

impl UiSink for ConsoleSink {
    fn update(&mut self, update: &UiUpdate) {
        match update {
            UiUpdate::TurnStarted { turn } => {
                eprintln!("\n--- turn {} ---", turn);
            }
            UiUpdate::AssistantDelta(text) => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            UiUpdate::ToolStarted { tool, .. } => {
                eprintln!("\n[tool] running {}...", tool);
            }
            UiUpdate::ToolFinished { tool, ok, .. } => {
                let status = if *ok { "ok" } else { "failed" };
                eprintln!("[tool] {} {}", tool, status);
            }
            UiUpdate::Notice(text) => {
                eprintln!("[note] {}", text);
            }
            UiUpdate::TaskDone { success } => {
                let status = if *success { "completed" } else { "failed" };
                eprintln!("\n[task] {}", status);
            }
        }
    }
}

/// Discards everything. Default for headless driver use and tests.
pub struct NullSink;

impl UiSink for NullSink {
    fn update(&mut self, _update: &UiUpdate) {}
}

/// Records updates for assertions in tests.
#[cfg(test)]
pub struct RecordingSink(pub Vec<UiUpdate>);

#[cfg(test)]
impl UiSink for RecordingSink {
    fn update(&mut self, update: &UiUpdate) {
        self.0.push(update.clone());
    }
}
