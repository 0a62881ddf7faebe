//! Redis-backed checkpoint storage.

use crate::CheckpointStore;
use anyhow::{Context, Result};
use sync_core::{retry, RetryPolicy};

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;

/// Redis implementation of [`CheckpointStore`].
///
/// The connection is established lazily on first use. Before every
/// operation the connection is health-probed with `PING`; a failed probe
/// causes a transparent, retry-wrapped reconnect. When reconnection itself
/// fails, the operation surfaces an error rather than pretending the store
/// is empty.
pub struct RedisStore {
    url: String,
    retry_policy: RetryPolicy,
    conn: Option<ConnectionManager>,
}

impl RedisStore {
    /// Create a store for the given `redis://` URL. No I/O happens here.
    pub fn new(url: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            url: url.into(),
            retry_policy,
            conn: None,
        }
    }

    /// Return a live connection, replacing one that fails the health probe.
    async fn ensure_connected(&mut self) -> Result<&mut ConnectionManager> {
        let alive = match self.conn.as_mut() {
            Some(conn) => {
                let pong: ::redis::RedisResult<String> =
                    ::redis::cmd("PING").query_async(conn).await;
                pong.is_ok()
            }
            None => false,
        };

        if !alive {
            if self.conn.is_some() {
                tracing::warn!("Checkpoint store ping failed; reconnecting to {}", self.url);
            }
            let client = ::redis::Client::open(self.url.as_str())
                .with_context(|| format!("invalid redis URL: {}", self.url))?;

            let conn = retry(&self.retry_policy, "checkpoint store connect", || {
                let client = client.clone();
                async move {
                    ConnectionManager::new(client)
                        .await
                        .context("redis connection failed")
                }
            })
            .await?;

            tracing::debug!("Connected to checkpoint store at {}", self.url);
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("checkpoint store connection unavailable"))
    }
}

#[async_trait::async_trait]
impl CheckpointStore for RedisStore {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let conn = self.ensure_connected().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("failed to read checkpoint {key:?}"))?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let conn = self.ensure_connected().await?;
        let _: () = conn
            .set(key, value)
            .await
            .with_context(|| format!("failed to persist checkpoint {key:?}"))?;
        Ok(())
    }
}
