use crate::{RegraphError, Result};
use reqwest::Client;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

/// Blob store access: one best-effort attempt per URL, no retries.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        HttpFetcher { client }
    }
}

impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(path) = url.strip_prefix("file://") {
            let path = PathBuf::from(path);
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| RegraphError::ReadFile { path, source });
        }

        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RegraphError::Http {
                url: url.to_string(),
                source,
            })?
            .error_for_status()
            .map_err(|source| RegraphError::Http {
                url: url.to_string(),
                source,
            })?;

        let body = response.text().await.map_err(|source| RegraphError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(
            %url,
            bytes = body.len(),
            elapsed = started.elapsed().as_secs_f64(),
            "artifact fetched"
        );

        Ok(body)
    }
}
