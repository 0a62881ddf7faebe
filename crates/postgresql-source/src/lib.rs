//! PostgreSQL extraction for search-sync
//!
//! Executes the watermark-parameterized join query against PostgreSQL and
//! streams the matching records in bounded server-side pages, so the full
//! result set is never materialized client-side.
//!
//! The connection is established lazily and health-checked before each
//! extraction; a stale or closed connection is dropped and replaced, never
//! reused.

mod cursor;
mod row;

pub use cursor::{PostgresCursor, PostgresRecordStream};
