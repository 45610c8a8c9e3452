//! Error types for elasticsearch-backup.

use thiserror::Error;

/// Errors raised while talking to the snapshot repository or loading config.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned status {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BackupError {
    /// Returns true if the remote service could recover on a later attempt.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
