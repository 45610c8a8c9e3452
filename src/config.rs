use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{BackupError, Result};
use crate::lifecycle::{Retention, RetentionPolicy};
use crate::retry::ExponentialBackoff;

pub mod env {
    pub const HOST: &str = "HOST";
    pub const KEEP: &str = "KEEP";
    pub const KEEP_COUNT: &str = "KEEP_COUNT";
    pub const NAME: &str = "NAME";
    pub const INTERVAL: &str = "INTERVAL";
    pub const LISTEN: &str = "LISTEN";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Older name for `LOG_LEVEL`, read when `LOG_LEVEL` is unset.
    pub const LOGLEVEL: &str = "LOGLEVEL";
    pub const RETRY_INITIAL_SECS: &str = "RETRY_INITIAL_SECS";
    pub const RETRY_MULTIPLIER: &str = "RETRY_MULTIPLIER";
    pub const RETRY_MAX_INTERVAL_SECS: &str = "RETRY_MAX_INTERVAL_SECS";
    pub const RETRY_MAX_ELAPSED_SECS: &str = "RETRY_MAX_ELAPSED_SECS";
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
}

/// Periodic Elasticsearch snapshot creation and retention pruning
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Elasticsearch host and port
    #[arg(long, env = env::HOST, default_value = "localhost:9200")]
    pub host: String,

    /// Days to keep completed snapshots
    #[arg(long, env = env::KEEP, default_value = "7")]
    pub keep: u64,

    /// Keep only the newest N snapshots instead of pruning by age
    #[arg(long, env = env::KEEP_COUNT)]
    pub keep_count: Option<usize>,

    /// Snapshot repository name
    #[arg(long, env = env::NAME, default_value = "backup")]
    pub name: String,

    /// Hours between snapshots (0 = run once and exit)
    #[arg(long, env = env::INTERVAL, default_value = "24")]
    pub interval: u64,

    /// Listen address for /health and /metrics
    #[arg(long, env = env::LISTEN, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Log format: json or pretty
    #[arg(long, env = env::LOG_FORMAT, default_value = "json")]
    pub log_format: String,

    /// Log level: trace, debug, info, warn, error [default: info]
    #[arg(long, env = env::LOG_LEVEL)]
    pub log_level: Option<String>,

    /// Initial wait between retries in seconds
    #[arg(long, env = env::RETRY_INITIAL_SECS, default_value = "1")]
    pub retry_initial_secs: u64,

    /// Growth factor applied to the retry wait after each failure
    #[arg(long, env = env::RETRY_MULTIPLIER, default_value = "1.5")]
    pub retry_multiplier: f64,

    /// Maximum wait between retries in seconds
    #[arg(long, env = env::RETRY_MAX_INTERVAL_SECS, default_value = "60")]
    pub retry_max_interval_secs: u64,

    /// Give up retrying a run after this many seconds (0 = never give up)
    #[arg(long, env = env::RETRY_MAX_ELAPSED_SECS, default_value = "900")]
    pub retry_max_elapsed_secs: u64,

    /// HTTP request timeout in seconds (0 = no timeout)
    #[arg(long, env = env::REQUEST_TIMEOUT_SECS, default_value = "0")]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BackupError::Config("host must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(BackupError::Config(
                "repository name must not be empty".to_string(),
            ));
        }
        match self.keep_count {
            Some(0) => {
                return Err(BackupError::Config(
                    "keep-count must be at least 1".to_string(),
                ));
            }
            None if self.keep == 0 => {
                return Err(BackupError::Config("keep must be at least 1 day".to_string()));
            }
            _ => {}
        }
        if self.retry_initial_secs == 0 {
            return Err(BackupError::Config(
                "retry-initial-secs must be at least 1".to_string(),
            ));
        }
        if !self.retry_multiplier.is_finite() || self.retry_multiplier < 1.0 {
            return Err(BackupError::Config(format!(
                "retry-multiplier must be at least 1.0, got {}",
                self.retry_multiplier
            )));
        }
        if self.retry_max_interval_secs < self.retry_initial_secs {
            return Err(BackupError::Config(
                "retry-max-interval-secs must not be lower than retry-initial-secs".to_string(),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Base URL of the snapshot API.
    pub fn base_url(&self) -> String {
        format!("http://{}/_snapshot", self.host)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| BackupError::Config(format!("invalid listen address {}: {e}", self.listen)))
    }

    /// Time between scheduler iterations.
    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.interval.saturating_mul(3600))
    }

    pub fn policy(&self) -> RetentionPolicy {
        let hours = i64::try_from(self.interval).unwrap_or(i64::MAX);
        let days = i64::try_from(self.keep).unwrap_or(i64::MAX);
        let retention = match self.keep_count {
            Some(count) => Retention::Count(count),
            None => Retention::Age(
                chrono::Duration::try_days(days).unwrap_or(chrono::Duration::MAX),
            ),
        };
        RetentionPolicy {
            interval: chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX),
            retention,
        }
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(self.retry_initial_secs),
            multiplier: self.retry_multiplier,
            max_interval: Duration::from_secs(self.retry_max_interval_secs),
            max_elapsed_time: Duration::from_secs(self.retry_max_elapsed_secs),
        }
    }

    /// `--log-level`/`LOG_LEVEL`, then the legacy `LOGLEVEL` value, then `info`.
    pub fn resolve_log_level(&self, legacy: Option<&str>) -> String {
        self.log_level
            .as_deref()
            .or(legacy)
            .filter(|level| !level.trim().is_empty())
            .unwrap_or("info")
            .to_lowercase()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
