use std::sync::Arc;

use crate::types::Progress;

/// Sink for per-completion progress events. The embedding shell forwards
/// these to its UI; the CLI logs them.
pub type ProgressSink = Arc<dyn Fn(Progress) + Send + Sync>;

/// Sink for free-text log lines.
pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

pub fn null_progress() -> ProgressSink {
    Arc::new(|_| {})
}

pub fn null_log() -> LogSink {
    Arc::new(|_| {})
}

/// Wrap a log sink so every line is tagged with its originating slot,
/// keeping interleaved batch output traceable.
pub fn slot_log(inner: LogSink, slot: usize) -> LogSink {
    Arc::new(move |line| inner(format!("[slot {}] {}", slot, line)))
}
