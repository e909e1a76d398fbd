use std::time::Duration;
use tokio::task::JoinHandle;

/// Gap between a finished reconciliation cycle and the next table poll.
pub const TABLE_POLL_GAP: Duration = Duration::from_millis(2000);

/// Gap between chart refreshes. The upstream data moves every ten minutes
/// or so, so two minutes is plenty.
pub const CHART_REFRESH_GAP: Duration = Duration::from_millis(120_000);

/// Owner of one widget's polling task.
///
/// Aborts the task when dropped, so a widget that goes away takes its timer
/// with it instead of firing against a gone container.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        PollHandle { task }
    }

    /// True once the loop has stopped on its own, e.g. after a failed
    /// fetch.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Explicit teardown; equivalent to dropping the handle.
    pub fn close(self) {}
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
