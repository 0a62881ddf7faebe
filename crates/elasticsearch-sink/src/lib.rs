//! Elasticsearch loading for search-sync
//!
//! Consumes a record stream in bounded batches, performs idempotent bulk
//! upserts against the destination index, and advances the checkpoint only
//! past records that were durably written.
//!
//! # Architecture
//!
//! - [`SearchIndex`] - trait over the destination index API, so the writer
//!   logic can be exercised against an in-memory index in tests
//! - [`ElasticsearchClient`] - production implementation over the REST API
//! - [`SinkWriter`] - batching, per-item failure handling, and checkpoint
//!   advancement

mod bulk;
mod client;
mod traits;
mod writer;

pub use bulk::BulkItemOutcome;
pub use client::ElasticsearchClient;
pub use traits::{IndexDocument, SearchIndex};
pub use writer::{SinkWriter, UpsertOutcome};
