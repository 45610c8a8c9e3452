//! Snapshot lifecycle decisions: create when due, prune past retention.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::client::SnapshotRepository;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// How long settled snapshots are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Delete snapshots that finished before `now - age`.
    Age(Duration),
    /// Keep only the newest `n` snapshots.
    Count(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub interval: Duration,
    pub retention: Retention,
}

/// What a single lifecycle run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub created: Option<String>,
    pub deleted: Vec<String>,
    pub failed_deletions: usize,
}

pub struct Lifecycle<R> {
    repository: R,
    policy: RetentionPolicy,
}

impl<R: SnapshotRepository> Lifecycle<R> {
    pub fn new(repository: R, policy: RetentionPolicy) -> Self {
        Self { repository, policy }
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        self.run_once_at(Utc::now()).await
    }

    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let mut report = RunReport::default();

        debug!("Fetching snapshots");
        let snapshots = self.repository.list().await?;
        for (idx, snapshot) in snapshots.iter().enumerate() {
            debug!(index = idx, snapshot = %snapshot, "Known snapshot");
        }

        match next_due(&snapshots, self.policy.interval) {
            Some(due) if due >= now => {
                debug!(next_due = %due.to_rfc3339(), "Not creating snapshot");
            }
            _ => {
                debug!("Creating snapshot");
                let name = self.repository.create().await?;
                info!(snapshot = %name, "Created snapshot");
                report.created = Some(name);
            }
        }

        // Re-list after creating so the new snapshot counts towards retention.
        let snapshots = if report.created.is_some() {
            match self.repository.list().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(error = %e, "Failed to refresh snapshots after creation, pruning previous list");
                    snapshots
                }
            }
        } else {
            snapshots
        };

        for snapshot in expired(&snapshots, self.policy.retention, now) {
            match self.repository.delete(&snapshot.name).await {
                Ok(()) => {
                    info!(snapshot = %snapshot, "Deleted snapshot");
                    report.deleted.push(snapshot.name.clone());
                }
                Err(e) => {
                    warn!(snapshot = %snapshot, error = %e, "Failed to delete snapshot");
                    report.failed_deletions += 1;
                }
            }
        }

        Ok(report)
    }
}

/// When the next snapshot is due, or `None` if there is no snapshot yet.
fn next_due(snapshots: &[Snapshot], interval: Duration) -> Option<DateTime<Utc>> {
    let last = snapshots.iter().max_by_key(|s| s.completed_at())?;
    Some(
        last.completed_at()
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

/// Settled snapshots that fall outside the retention policy.
fn expired(snapshots: &[Snapshot], retention: Retention, now: DateTime<Utc>) -> Vec<&Snapshot> {
    let mut settled: Vec<&Snapshot> = snapshots.iter().filter(|s| !s.is_in_progress()).collect();

    match retention {
        Retention::Age(age) => {
            let keep_after = now
                .checked_sub_signed(age)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            settled.retain(|s| s.completed_at() < keep_after);
            settled
        }
        Retention::Count(keep) => {
            settled.sort_by_key(|s| s.completed_at());
            let excess = settled.len().saturating_sub(keep);
            settled.truncate(excess);
            settled
        }
    }
}
