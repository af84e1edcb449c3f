use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info};

use accountmint_core::config::BatchConfig;
use accountmint_core::{slot_log, BatchReport, ErrorKind, LogSink, Progress, ProgressSink, SessionResult};

/// One registration attempt, addressable by its global index. The production
/// implementation spins up a `RegistrationSession`; tests substitute fakes.
#[async_trait]
pub trait SessionRunner: Send + Sync + 'static {
    async fn run_session(&self, attempt: usize, log: LogSink) -> SessionResult;
}

/// Runs `count` attempts in consecutive batches of at most the concurrency
/// cap. Slots start staggered to avoid colliding on shared mailbox
/// infrastructure; the scheduler waits for a whole batch before the next one,
/// pausing in between. A failing session never takes its siblings down.
pub struct BatchScheduler<R> {
    runner: Arc<R>,
    config: BatchConfig,
}

impl<R: SessionRunner> BatchScheduler<R> {
    pub fn new(runner: Arc<R>, config: BatchConfig) -> Self {
        Self { runner, config }
    }

    pub async fn run(&self, count: usize, on_progress: ProgressSink, on_log: LogSink) -> BatchReport {
        let cap = self.config.max_concurrent.max(1);
        let stagger = Duration::from_secs(self.config.slot_stagger_seconds);
        let pause = Duration::from_secs(self.config.inter_batch_pause_seconds);

        on_log(format!(
            "starting batch registration of {} accounts, {} concurrent",
            count, cap
        ));

        let mut report = BatchReport::default();
        let mut completed = 0usize;
        let mut start = 0usize;
        let mut batch_index = 0usize;

        while start < count {
            let size = cap.min(count - start);
            batch_index += 1;
            on_log(format!("batch {}: {} sessions", batch_index, size));

            let (tx, mut rx) = mpsc::channel::<SessionResult>(size);
            for slot in 0..size {
                let attempt = start + slot;
                let runner = self.runner.clone();
                let tx = tx.clone();
                let log = slot_log(on_log.clone(), attempt + 1);
                let delay = stagger * slot as u32;

                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    log("starting registration".to_string());

                    let task_log = log.clone();
                    let task =
                        tokio::spawn(async move { runner.run_session(attempt, task_log).await });
                    let result = match task.await {
                        Ok(result) => result,
                        // A panicking session is isolated into a failure
                        // result like any other.
                        Err(join_error) => {
                            error!(attempt, %join_error, "session task aborted");
                            SessionResult::failed(
                                ErrorKind::UnknownOutcome,
                                format!("session task aborted: {}", join_error),
                            )
                        }
                    };

                    if result.success {
                        let email = result
                            .record
                            .as_ref()
                            .map(|r| r.email.as_str())
                            .unwrap_or("<unknown>");
                        log(format!("registration succeeded: {}", email));
                    } else {
                        log(format!(
                            "registration failed: {}",
                            result.detail.as_deref().unwrap_or("unknown")
                        ));
                    }

                    let _ = tx.send(result).await;
                });
            }
            drop(tx);

            // Collect in completion order; the channel closes once every slot
            // has reported.
            while let Some(result) = rx.recv().await {
                completed += 1;
                on_progress(Progress {
                    current: completed,
                    total: count,
                });
                report.push(result);
            }

            start += size;
            if start < count {
                on_log(format!(
                    "pausing {}s before next batch",
                    self.config.inter_batch_pause_seconds
                ));
                tokio::time::sleep(pause).await;
            }
        }

        info!(
            total = report.len(),
            succeeded = report.successes(),
            failed = report.failures(),
            "batch complete"
        );
        on_log(format!(
            "batch complete: {} succeeded, {} failed",
            report.successes(),
            report.failures()
        ));

        report
    }
}
