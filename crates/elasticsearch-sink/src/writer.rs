//! Batching writer with checkpoint advancement.

use crate::bulk::BulkItemOutcome;
use crate::traits::{IndexDocument, SearchIndex};
use anyhow::{Context, Result};
use checkpoint::{CheckpointStore, WATERMARK_KEY};
use sync_core::{Record, RecordStream, Watermark};

/// Groups a record stream into bounded write batches, upserts each batch,
/// and advances the checkpoint only past durably written records.
pub struct SinkWriter<I> {
    index: I,
    index_name: String,
}

/// Result of one `bulk_upsert` call.
#[derive(Debug, Clone, Default)]
pub struct UpsertOutcome {
    /// Documents accepted by the index.
    pub indexed: usize,
    /// Documents rejected item-by-item by the index.
    pub failed: usize,
    /// The checkpoint persisted by this call, if it advanced.
    pub checkpoint: Option<Watermark>,
}

impl<I: SearchIndex> SinkWriter<I> {
    pub fn new(index: I, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Idempotently create the destination index.
    pub async fn ensure_index(&mut self, definition: &serde_json::Value) -> Result<()> {
        self.index.ensure_index(&self.index_name, definition).await
    }

    /// Consume `records` in batches of at most `chunk_size` and upsert each
    /// batch.
    ///
    /// After a batch with zero item failures the batch's maximum watermark
    /// is persisted. A batch with item failures advances the checkpoint only
    /// to the last item before the first failure and withholds all further
    /// advancement for this call, so no rejected record is ever skipped
    /// past; the unchanged watermark makes the next cycle re-extract it.
    /// Consuming zero records is a quiescent success and touches nothing.
    pub async fn bulk_upsert<C: CheckpointStore + ?Sized>(
        &mut self,
        records: &mut dyn RecordStream,
        chunk_size: usize,
        checkpoint: &mut C,
    ) -> Result<UpsertOutcome> {
        let chunk_size = chunk_size.max(1);
        let mut outcome = UpsertOutcome::default();
        let mut committed: Option<Watermark> = None;
        let mut consumed = 0usize;
        let mut hold = false;

        loop {
            let batch = next_batch(records, chunk_size).await?;
            if batch.is_empty() {
                break;
            }
            consumed += batch.len();

            let mut docs = Vec::with_capacity(batch.len());
            let mut marks = Vec::with_capacity(batch.len());
            for record in &batch {
                docs.push(IndexDocument {
                    id: record.document_id(),
                    body: record.document().context("failed to serialize document")?,
                });
                marks.push(record.modified);
            }

            let results = self.index.bulk_write(&self.index_name, &docs).await?;

            // A response shorter than the batch leaves the tail unaccounted
            // for; treat the first missing item as failed.
            let first_failure = results
                .iter()
                .position(|r| !r.is_success())
                .or_else(|| (results.len() < docs.len()).then_some(results.len()));

            match first_failure {
                None => {
                    outcome.indexed += docs.len();
                    if !hold {
                        if let Some(max) = marks.iter().max().copied() {
                            advance(checkpoint, &mut committed, max).await?;
                        }
                    }
                }
                Some(idx) => {
                    log_item_failures(&results);
                    let rejected = results.iter().filter(|r| !r.is_success()).count()
                        + docs.len().saturating_sub(results.len());
                    outcome.indexed += docs.len() - rejected;
                    outcome.failed += rejected;

                    if !hold {
                        if let Some(max) = marks[..idx].iter().max().copied() {
                            advance(checkpoint, &mut committed, max).await?;
                        }
                        tracing::warn!(
                            "Withholding checkpoint advancement after partial batch failure"
                        );
                    }
                    hold = true;
                }
            }
        }

        if consumed == 0 {
            tracing::info!("Nothing to update for index {}", self.index_name);
        } else {
            tracing::info!(
                "Upserted {} documents into {} ({} rejected)",
                outcome.indexed,
                self.index_name,
                outcome.failed
            );
        }

        outcome.checkpoint = committed;
        Ok(outcome)
    }
}

/// Pull up to `chunk_size` records from the stream.
async fn next_batch(records: &mut dyn RecordStream, chunk_size: usize) -> Result<Vec<Record>> {
    let mut batch = Vec::with_capacity(chunk_size);
    while batch.len() < chunk_size {
        match records.next().await {
            Some(Ok(record)) => batch.push(record),
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }
    Ok(batch)
}

/// Persist `candidate` unless it would move the checkpoint backwards.
async fn advance<C: CheckpointStore + ?Sized>(
    checkpoint: &mut C,
    committed: &mut Option<Watermark>,
    candidate: Watermark,
) -> Result<()> {
    if committed.is_some_and(|current| candidate <= current) {
        return Ok(());
    }
    checkpoint
        .set(WATERMARK_KEY, &candidate.to_rfc3339())
        .await
        .context("failed to advance checkpoint")?;
    tracing::debug!("Checkpoint advanced to {candidate}");
    *committed = Some(candidate);
    Ok(())
}

fn log_item_failures(results: &[BulkItemOutcome]) {
    for result in results.iter().filter(|r| !r.is_success()) {
        tracing::error!(
            "Bulk item rejected: id={}, status={}, error={}",
            result.id,
            result.status,
            result.error.as_deref().unwrap_or("unknown")
        );
    }
}
