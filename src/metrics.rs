//! Prometheus metrics for elasticsearch-backup.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::lifecycle::RunReport;

/// Labels for run outcome metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RunLabels {
    pub status: String,
}

/// Labels for duration metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: String,
}

/// Outcome of one scheduler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Failed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        }
    }
}

pub struct Metrics {
    pub runs_total: Family<RunLabels, Counter>,
    pub duration_seconds: Family<OperationLabels, Histogram>,
    pub snapshots_created_total: Counter,
    pub snapshots_deleted_total: Counter,
    pub snapshot_delete_failures_total: Counter,
}

/// Buckets for run duration (1s to 4h): a blocking snapshot creation on a
/// large cluster can take hours.
const DURATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
];

impl Metrics {
    /// Create and register all metrics with the given registry.
    pub fn new(registry: &mut Registry) -> Self {
        let runs_total = Family::<RunLabels, Counter>::default();
        registry.register(
            "elasticsearch_backup_runs",
            "Number of elasticsearch backup runs",
            runs_total.clone(),
        );

        let duration_seconds = Family::<OperationLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(DURATION_BUCKETS.iter().copied())
        });
        registry.register(
            "elasticsearch_backup_duration_seconds",
            "Duration of elasticsearch backup runs in seconds",
            duration_seconds.clone(),
        );

        let snapshots_created_total = Counter::default();
        registry.register(
            "elasticsearch_backup_snapshots_created",
            "Number of snapshots created",
            snapshots_created_total.clone(),
        );

        let snapshots_deleted_total = Counter::default();
        registry.register(
            "elasticsearch_backup_snapshots_deleted",
            "Number of snapshots deleted by retention",
            snapshots_deleted_total.clone(),
        );

        let snapshot_delete_failures_total = Counter::default();
        registry.register(
            "elasticsearch_backup_snapshot_delete_failures",
            "Number of snapshot deletions that failed",
            snapshot_delete_failures_total.clone(),
        );

        Self {
            runs_total,
            duration_seconds,
            snapshots_created_total,
            snapshots_deleted_total,
            snapshot_delete_failures_total,
        }
    }

    pub fn record_run(&self, status: RunStatus) {
        self.runs_total
            .get_or_create(&RunLabels {
                status: status.as_str().to_string(),
            })
            .inc();
    }

    pub fn observe_duration(&self, operation: &str, seconds: f64) {
        self.duration_seconds
            .get_or_create(&OperationLabels {
                operation: operation.to_string(),
            })
            .observe(seconds);
    }

    pub fn record_report(&self, report: &RunReport) {
        if report.created.is_some() {
            self.snapshots_created_total.inc();
        }
        self.snapshots_deleted_total
            .inc_by(report.deleted.len() as u64);
        self.snapshot_delete_failures_total
            .inc_by(report.failed_deletions as u64);
    }
}
