use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::{BackupError, Result};
use crate::snapshot::{self, Snapshot, SnapshotList};

/// Operations the lifecycle engine needs from a snapshot repository.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// All settled snapshots, oldest first.
    async fn list(&self) -> Result<Vec<Snapshot>>;

    /// Create a snapshot and wait until it settles. Returns its name.
    async fn create(&self) -> Result<String>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// Elasticsearch `_snapshot` API client bound to one repository.
pub struct HttpRepository {
    client: Client,
    base_url: String,
    repository: String,
}

impl HttpRepository {
    pub fn new(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
        // Creation blocks until the snapshot settles, so no timeout unless asked for.
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackupError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.repository, path)
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response> {
        debug!(method = %method, url = %url, "Sending snapshot API request");

        let response = self
            .client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|source| BackupError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(BackupError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SnapshotRepository for HttpRepository {
    async fn list(&self) -> Result<Vec<Snapshot>> {
        let url = self.url("_all");
        let response = self.send(Method::GET, &url).await?;

        let body = response
            .bytes()
            .await
            .map_err(|source| BackupError::Transport {
                url: url.clone(),
                source,
            })?;
        let list: SnapshotList =
            serde_json::from_slice(&body).map_err(|source| BackupError::Decode { url, source })?;

        let total = list.snapshots.len();
        let settled = list.into_settled();
        debug!(
            total,
            settled = settled.len(),
            "Fetched snapshot list"
        );
        Ok(settled)
    }

    async fn create(&self) -> Result<String> {
        let name = snapshot::snapshot_name(Utc::now());
        let url = format!("{}?wait_for_completion=true", self.url(&name));
        self.send(Method::PUT, &url).await?;
        Ok(name)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let url = self.url(name);
        self.send(Method::DELETE, &url).await?;
        Ok(())
    }
}
