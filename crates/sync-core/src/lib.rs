//! Core types for the search-sync replication framework.
//!
//! This crate provides the foundational types used across the replication
//! pipeline:
//!
//! - [`Record`] - The denormalized film document extracted from PostgreSQL
//! - [`Watermark`] - The replication cursor (effective-modified timestamp)
//! - [`RetryPolicy`] / [`retry`] - Exponential-backoff wrapper for fallible I/O
//! - [`RecordSource`] / [`RecordStream`] - Traits decoupling the replication
//!   loop from the concrete database driver
//!
//! # Architecture
//!
//! The sync-core crate sits at the foundation of the pipeline:
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── checkpoint                        (watermark persistence)
//!    ├─── search-sync-postgresql-source    (implements RecordSource)
//!    ├─── search-sync-elasticsearch-sink   (consumes RecordStream)
//!    └─── search-sync                      (drives the loop)
//! ```

pub mod record;
pub mod retry;
pub mod source;
pub mod watermark;

// Re-exports for convenience
pub use record::{Person, Record};
pub use retry::{retry, RetryPolicy};
pub use source::{RecordSource, RecordStream};
pub use watermark::Watermark;
