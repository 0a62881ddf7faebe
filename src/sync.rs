//! The replication loop.
//!
//! Drives extract-load cycles forever: read the checkpoint, render the
//! query, stream records out of the source, upsert them in batches, sleep,
//! repeat. Every data-path failure resolves to "log and retry on the next
//! cycle"; correctness rests on idempotent upserts and monotonic checkpoint
//! advancement, not on any single cycle succeeding.

use crate::query;
use anyhow::{Context, Result};
use checkpoint::{CheckpointStore, WATERMARK_KEY};
use search_sync_elasticsearch_sink::{SearchIndex, SinkWriter, UpsertOutcome};
use std::time::Duration;
use sync_core::{RecordSource, Watermark};

/// Tuning knobs for the loop.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Records per extraction page and per bulk write batch.
    pub batch_size: usize,
    /// Sleep between cycles; bounds replication lag.
    pub poll_interval: Duration,
}

/// Orchestrates one source, one sink, and one checkpoint store.
///
/// All collaborators are injected at construction and driven strictly
/// serially; no connection is shared between them.
pub struct ReplicationLoop<S, I, C> {
    source: S,
    sink: SinkWriter<I>,
    checkpoint: C,
    settings: SyncSettings,
}

impl<S, I, C> ReplicationLoop<S, I, C>
where
    S: RecordSource,
    I: SearchIndex,
    C: CheckpointStore,
{
    pub fn new(source: S, sink: SinkWriter<I>, checkpoint: C, settings: SyncSettings) -> Self {
        Self {
            source,
            sink,
            checkpoint,
            settings,
        }
    }

    /// Drive cycles until the process is stopped externally. Data-path
    /// errors are logged and absorbed; this never returns on them.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            tracing::info!("Starting sync cycle");
            match self.run_cycle().await {
                Ok(outcome) => {
                    if let Some(watermark) = outcome.checkpoint {
                        tracing::info!(
                            "Cycle complete: {} indexed, {} rejected, checkpoint {watermark}",
                            outcome.indexed,
                            outcome.failed
                        );
                    } else {
                        tracing::info!(
                            "Cycle complete: {} indexed, {} rejected, checkpoint unchanged",
                            outcome.indexed,
                            outcome.failed
                        );
                    }
                }
                Err(e) => tracing::error!("Sync cycle failed: {e:#}"),
            }
            tracing::info!(
                "Sleeping {}s until the next cycle",
                self.settings.poll_interval.as_secs()
            );
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// One extract-load pass.
    ///
    /// A checkpoint store outage fails the cycle; it is never treated as
    /// "no checkpoint yet", which would silently restart replication from
    /// the beginning of time.
    pub async fn run_cycle(&mut self) -> Result<UpsertOutcome> {
        let stored = self
            .checkpoint
            .get(WATERMARK_KEY)
            .await
            .context("checkpoint store unavailable")?;

        let watermark = match stored {
            Some(raw) => Watermark::parse(&raw)
                .with_context(|| format!("stored checkpoint is malformed: {raw:?}"))?,
            None => {
                tracing::info!("No checkpoint stored; replicating from the beginning of time");
                Watermark::MIN
            }
        };

        let query = query::movies_query(&watermark);
        let mut records = self
            .source
            .extract(&query, self.settings.batch_size)
            .await
            .context("extraction failed")?;

        self.sink
            .bulk_upsert(
                records.as_mut(),
                self.settings.batch_size,
                &mut self.checkpoint,
            )
            .await
    }
}
