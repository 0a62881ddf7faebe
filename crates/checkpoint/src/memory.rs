//! In-memory checkpoint storage for tests and dry runs.

use crate::CheckpointStore;
use std::collections::HashMap;

/// Non-durable [`CheckpointStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryStore {
    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WATERMARK_KEY;

    #[tokio::test]
    async fn test_get_absent_key_is_none_not_error() {
        let mut store = MemoryStore::new();
        let value = store.get(WATERMARK_KEY).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let mut store = MemoryStore::new();
        store
            .set(WATERMARK_KEY, "2023-01-02T00:00:00+00:00")
            .await
            .unwrap();

        let value = store.get(WATERMARK_KEY).await.unwrap();
        assert_eq!(value.as_deref(), Some("2023-01-02T00:00:00+00:00"));
    }

    #[tokio::test]
    async fn test_set_overwrites_prior_value() {
        let mut store = MemoryStore::new();
        store.set(WATERMARK_KEY, "a").await.unwrap();
        store.set(WATERMARK_KEY, "b").await.unwrap();

        let value = store.get(WATERMARK_KEY).await.unwrap();
        assert_eq!(value.as_deref(), Some("b"));
    }
}
