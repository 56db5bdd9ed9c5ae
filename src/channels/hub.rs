use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::api::{ApiRequest, ApiResponse};
use crate::channels::queue::Queue;
use crate::tools::types::{ToolRequest, ToolResponse};
use crate::ui::UiUpdate;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The single rendezvous point between the orchestrator thread and the two
/// worker loops. Owns one queue per (direction, resource) pair plus the
/// shutdown flag and active-worker counter. Shared as Arc<ChannelHub>; no
/// other mutable state crosses thread boundaries.
pub struct ChannelHub {
    api_request: Queue<ApiRequest>,
    api_response: Queue<ApiResponse>,
    tool_request: Queue<ToolRequest>,
    tool_response: Queue<ToolResponse>,
    ui_update: Queue<UiUpdate>,
    shutdown: AtomicBool,
    active_workers: AtomicUsize,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self {
            api_request: Queue::new(),
            api_response: Queue::new(),
            tool_request: Queue::new(),
            tool_response: Queue::new(),
            ui_update: Queue::new(),
            shutdown: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
        }
    }

    pub fn api_request(&self) -> &Queue<ApiRequest> {
        &self.api_request
    }

    pub fn api_response(&self) -> &Queue<ApiResponse> {
        &self.api_response
    }

    pub fn tool_request(&self) -> &Queue<ToolRequest> {
        &self.tool_request
    }

    pub fn tool_response(&self) -> &Queue<ToolResponse> {
        &self.tool_response
    }

    pub fn ui_update(&self) -> &Queue<UiUpdate> {
        &self.ui_update
    }

    /// Sets the shutdown flag and wakes blocked workers with one sentinel per
    /// request queue. Only the first call pushes sentinels; repeated calls
    /// are no-ops.
    pub fn signal_shutdown(&self) {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.api_request.send(ApiRequest::Shutdown);
            self.tool_request.send(ToolRequest::Shutdown);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    pub fn worker_stopped(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Waits until every worker has checked out, or the deadline passes.
    /// Main calls this after signal_shutdown, with a hard-kill fallback.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.active_workers() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
        true
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}
