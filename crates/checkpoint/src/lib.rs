//! Checkpoint management for search-sync
//!
//! Provides durable storage for the replication watermark, keyed by name,
//! surviving process restarts.
//!
//! # Architecture
//!
//! This crate provides a storage-agnostic checkpoint system:
//! - Defines the [`CheckpointStore`] trait for get/set over string keys
//! - Provides [`RedisStore`], the production backend
//! - Provides [`MemoryStore`] for tests and dry runs
//!
//! # Failure semantics
//!
//! `get` returning `Ok(None)` strictly means "no checkpoint stored yet" -
//! the expected steady state on a first run. A store that cannot be reached
//! returns `Err` instead, so a connectivity failure is never mistaken for an
//! empty store; conflating the two would silently restart replication from
//! the beginning of time on every outage.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// The key under which the replication watermark is persisted.
pub const WATERMARK_KEY: &str = "modified";

/// Durable key-value watermark storage.
#[async_trait::async_trait]
pub trait CheckpointStore: Send {
    /// Read the persisted value for `key`.
    ///
    /// Returns `Ok(None)` when the key has never been set. Transport
    /// failures are errors.
    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>>;

    /// Persist `value` under `key`, overwriting any prior value.
    async fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for &mut T {
    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value).await
    }
}
