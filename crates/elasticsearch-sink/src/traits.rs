//! SearchIndex trait definition.
//!
//! This trait abstracts the destination index API, allowing the batching
//! and checkpoint logic in [`crate::SinkWriter`] to be compiled against a
//! single interface and tested without a live cluster.

use crate::bulk::BulkItemOutcome;
use anyhow::Result;

/// One document ready for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    /// Destination document id; equals the source record identifier so
    /// redelivery replaces instead of duplicating.
    pub id: String,
    /// Document payload, already stripped of replication metadata.
    pub body: serde_json::Value,
}

/// Trait for writing to a search index.
#[async_trait::async_trait]
pub trait SearchIndex: Send {
    /// Idempotently create the destination index. "Already exists" is
    /// success; this is invoked on every process start.
    async fn ensure_index(&mut self, name: &str, definition: &serde_json::Value) -> Result<()>;

    /// Write one batch of documents with insert-or-replace semantics.
    ///
    /// Returns per-item outcomes in batch order. A transport-level failure
    /// is an `Err`; individual rejected documents are reported through
    /// their outcome.
    async fn bulk_write(
        &mut self,
        index: &str,
        batch: &[IndexDocument],
    ) -> Result<Vec<BulkItemOutcome>>;
}

#[async_trait::async_trait]
impl<T: SearchIndex + ?Sized> SearchIndex for &mut T {
    async fn ensure_index(&mut self, name: &str, definition: &serde_json::Value) -> Result<()> {
        (**self).ensure_index(name, definition).await
    }

    async fn bulk_write(
        &mut self,
        index: &str,
        batch: &[IndexDocument],
    ) -> Result<Vec<BulkItemOutcome>> {
        (**self).bulk_write(index, batch).await
    }
}
