//! Elasticsearch REST client.

use crate::bulk::{bulk_body, BulkItemOutcome, BulkResponse};
use crate::traits::{IndexDocument, SearchIndex};
use anyhow::{Context, Result};
use sync_core::{retry, RetryPolicy};

/// [`SearchIndex`] implementation over the Elasticsearch HTTP API.
///
/// The HTTP client is built lazily. Before each operation the cluster root
/// is probed; a failed probe causes a transparent, retry-wrapped
/// re-establishment, so callers never observe a one-off connection error.
pub struct ElasticsearchClient {
    base_url: String,
    retry_policy: RetryPolicy,
    http: Option<reqwest::Client>,
}

impl ElasticsearchClient {
    /// Create a client for the given base URL (e.g. `http://localhost:9200`).
    /// No I/O happens here.
    pub fn new(base_url: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            retry_policy,
            http: None,
        }
    }

    async fn ping(http: &reqwest::Client, base_url: &str) -> bool {
        match http.get(base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Return a live HTTP client, rebuilding it when the probe fails.
    async fn ensure_connected(&mut self) -> Result<reqwest::Client> {
        if let Some(http) = &self.http {
            if Self::ping(http, &self.base_url).await {
                return Ok(http.clone());
            }
            tracing::warn!(
                "Elasticsearch ping failed; re-establishing connection to {}",
                self.base_url
            );
            self.http = None;
        }

        let base_url = self.base_url.clone();
        let http = retry(&self.retry_policy, "elasticsearch connect", || {
            let base_url = base_url.clone();
            async move {
                let client = reqwest::Client::builder()
                    .build()
                    .context("failed to build HTTP client")?;
                let response = client
                    .get(&base_url)
                    .send()
                    .await
                    .with_context(|| format!("elasticsearch unreachable at {base_url}"))?;
                let status = response.status();
                if !status.is_success() {
                    anyhow::bail!("elasticsearch at {base_url} answered with status {status}");
                }
                Ok(client)
            }
        })
        .await?;

        tracing::debug!("Connected to Elasticsearch at {}", self.base_url);
        self.http = Some(http.clone());
        Ok(http)
    }
}

#[async_trait::async_trait]
impl SearchIndex for ElasticsearchClient {
    async fn ensure_index(&mut self, name: &str, definition: &serde_json::Value) -> Result<()> {
        let http = self.ensure_connected().await?;
        let url = format!("{}/{}", self.base_url, name);

        retry(&self.retry_policy, "elasticsearch create index", || {
            let http = http.clone();
            let url = url.clone();
            let definition = definition.clone();
            let name = name.to_string();
            async move {
                let response = http
                    .put(&url)
                    .json(&definition)
                    .send()
                    .await
                    .context("index creation request failed")?;
                let status = response.status();
                if status.is_success() {
                    tracing::info!("Created index {name}");
                    return Ok(());
                }

                let body = response.text().await.unwrap_or_default();
                if body.contains("resource_already_exists_exception") {
                    tracing::debug!("Index {name} already exists");
                    return Ok(());
                }
                anyhow::bail!("index creation failed with status {status}: {body}")
            }
        })
        .await
    }

    async fn bulk_write(
        &mut self,
        index: &str,
        batch: &[IndexDocument],
    ) -> Result<Vec<BulkItemOutcome>> {
        let http = self.ensure_connected().await?;
        let url = format!("{}/_bulk", self.base_url);
        let body = bulk_body(index, batch)?;

        let response: BulkResponse = retry(&self.retry_policy, "elasticsearch bulk write", || {
            let http = http.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = http
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                    .body(body)
                    .send()
                    .await
                    .context("bulk request failed")?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    anyhow::bail!("bulk write failed with status {status}: {text}");
                }
                response
                    .json::<BulkResponse>()
                    .await
                    .context("malformed bulk response")
            }
        })
        .await?;

        if response.errors {
            tracing::debug!("Bulk response reported item-level errors");
        }

        Ok(response
            .items
            .into_iter()
            .map(|item| item.index.into())
            .collect())
    }
}
