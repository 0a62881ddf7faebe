//! Traits for record extraction.
//!
//! These traits decouple the replication loop and the sink writer from the
//! concrete database driver, so the pipeline can be exercised in tests with
//! in-memory sources.

use crate::record::Record;

/// A finite, forward-only stream of records in ascending effective-modified
/// order.
///
/// A stream is not restartable; obtain a fresh one via
/// [`RecordSource::extract`], which re-executes the query.
#[async_trait::async_trait]
pub trait RecordStream: Send {
    /// The next record, or `None` once the stream is exhausted.
    async fn next(&mut self) -> Option<anyhow::Result<Record>>;
}

/// A record source that can execute a watermark-parameterized query.
///
/// A single source serves one extraction at a time; the replication loop
/// invokes it serially.
#[async_trait::async_trait]
pub trait RecordSource: Send {
    /// Execute `query` and stream the matching records, fetching from the
    /// server in pages of `chunk_size`. The full result set is never
    /// materialized in memory.
    async fn extract(
        &mut self,
        query: &str,
        chunk_size: usize,
    ) -> anyhow::Result<Box<dyn RecordStream>>;
}

#[async_trait::async_trait]
impl<T: RecordSource + ?Sized> RecordSource for &mut T {
    async fn extract(
        &mut self,
        query: &str,
        chunk_size: usize,
    ) -> anyhow::Result<Box<dyn RecordStream>> {
        (**self).extract(query, chunk_size).await
    }
}
