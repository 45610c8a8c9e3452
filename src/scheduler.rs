use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::client::SnapshotRepository;
use crate::lifecycle::Lifecycle;
use crate::metrics::{Metrics, RunStatus};
use crate::retry::{self, ExponentialBackoff};

/// Intervals below this run a single iteration and return.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler<R> {
    lifecycle: Lifecycle<R>,
    backoff: ExponentialBackoff,
    interval: Duration,
    metrics: Arc<Metrics>,
}

impl<R: SnapshotRepository> Scheduler<R> {
    pub fn new(
        lifecycle: Lifecycle<R>,
        backoff: ExponentialBackoff,
        interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            lifecycle,
            backoff,
            interval,
            metrics,
        }
    }

    /// Run forever, or exactly once when the interval is below one second.
    pub async fn run(&self) {
        loop {
            self.run_iteration().await;

            if self.interval < MIN_INTERVAL {
                info!("Interval below one second, exiting after a single run");
                return;
            }
            info!(
                wait_seconds = self.interval.as_secs(),
                "Waiting until next run"
            );
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One retry-wrapped lifecycle run, recorded to metrics.
    pub async fn run_iteration(&self) -> RunStatus {
        let start = Instant::now();

        let result = retry::retry_notify(
            &self.backoff,
            move || self.lifecycle.run_once(),
            |err, wait| {
                warn!(
                    error = %err,
                    transient = err.is_transient(),
                    retry_in_seconds = wait.as_secs_f64(),
                    "Snapshot lifecycle run failed, retrying"
                );
            },
        )
        .await;

        let duration = start.elapsed().as_secs_f64();
        self.metrics.observe_duration("backup", duration);

        match result {
            Ok(report) => {
                self.metrics.record_run(RunStatus::Ok);
                self.metrics.record_report(&report);
                info!(
                    status = RunStatus::Ok.as_str(),
                    created = report.created.as_deref().unwrap_or(""),
                    deleted_count = report.deleted.len(),
                    failed_deletions = report.failed_deletions,
                    duration_seconds = duration,
                    "Snapshot lifecycle run completed"
                );
                RunStatus::Ok
            }
            Err(e) => {
                self.metrics.record_run(RunStatus::Failed);
                error!(
                    status = RunStatus::Failed.as_str(),
                    error = %e,
                    duration_seconds = duration,
                    "Snapshot lifecycle run failed, giving up until next run"
                );
                RunStatus::Failed
            }
        }
    }
}
