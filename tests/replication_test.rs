//! End-to-end replication scenarios over in-memory collaborators.

use checkpoint::{CheckpointStore, MemoryStore, WATERMARK_KEY};
use search_sync::testing::{record, RecordingIndex, ScriptedSource};
use search_sync::{schema, ReplicationLoop, SyncSettings};
use search_sync_elasticsearch_sink::SinkWriter;
use std::time::Duration;
use sync_core::Watermark;
use uuid::Uuid;

fn settings() -> SyncSettings {
    SyncSettings {
        batch_size: 1000,
        poll_interval: Duration::from_secs(0),
    }
}

async fn stored(store: &mut MemoryStore) -> Option<String> {
    store.get(WATERMARK_KEY).await.unwrap()
}

#[tokio::test]
async fn test_two_records_then_quiescent_cycle() {
    let a = record(Uuid::new_v4(), "film a", "2023-01-01T00:00:00Z");
    let b = record(Uuid::new_v4(), "film b", "2023-01-02T00:00:00Z");

    let mut source = ScriptedSource::new(vec![vec![a.clone(), b.clone()], vec![]]);
    let mut index = RecordingIndex::default();
    let mut store = MemoryStore::new();

    {
        let sink = SinkWriter::new(&mut index, "movies");
        let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());

        let first = replication.run_cycle().await.unwrap();
        assert_eq!(first.indexed, 2);
        assert_eq!(first.failed, 0);
        assert_eq!(
            first.checkpoint,
            Some(Watermark::parse("2023-01-02T00:00:00Z").unwrap())
        );

        let second = replication.run_cycle().await.unwrap();
        assert_eq!(second.indexed, 0);
        assert!(second.checkpoint.is_none());
    }

    // Both documents landed in one batch, in ascending order.
    assert_eq!(index.batches, vec![vec![a.document_id(), b.document_id()]]);
    assert_eq!(index.documents.len(), 2);

    // The checkpoint holds B's effective-modified time and the quiescent
    // second cycle left it untouched.
    assert_eq!(
        stored(&mut store).await.as_deref(),
        Some("2023-01-02T00:00:00+00:00")
    );

    // The second extraction was parameterized by the stored checkpoint.
    assert!(source.queries[1].contains("2023-01-02T00:00:00+00:00"));
}

#[tokio::test]
async fn test_first_run_replicates_from_the_beginning_of_time() {
    let mut source = ScriptedSource::new(vec![vec![]]);
    let mut index = RecordingIndex::default();
    let mut store = MemoryStore::new();

    let sink = SinkWriter::new(&mut index, "movies");
    let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());
    replication.run_cycle().await.unwrap();
    drop(replication);

    assert!(source.queries[0].contains("1970-01-01T00:00:00"));
}

#[tokio::test]
async fn test_quiescent_cycle_leaves_existing_watermark_untouched() {
    let watermark = "2023-06-15T12:00:00+00:00";
    let mut source = ScriptedSource::new(vec![vec![]]);
    let mut index = RecordingIndex::default();
    let mut store = MemoryStore::new();
    store.set(WATERMARK_KEY, watermark).await.unwrap();

    {
        let sink = SinkWriter::new(&mut index, "movies");
        let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());

        let outcome = replication.run_cycle().await.unwrap();
        assert_eq!(outcome.indexed, 0);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.checkpoint.is_none());
    }

    assert!(index.batches.is_empty());
    assert_eq!(stored(&mut store).await.as_deref(), Some(watermark));
    assert!(source.queries[0].contains(watermark));
}

/// Store that fails its next read, simulating a checkpoint backend outage.
struct FlakyStore {
    inner: MemoryStore,
    fail_next_get: bool,
}

#[async_trait::async_trait]
impl CheckpointStore for FlakyStore {
    async fn get(&mut self, key: &str) -> anyhow::Result<Option<String>> {
        if self.fail_next_get {
            self.fail_next_get = false;
            anyhow::bail!("connection refused");
        }
        self.inner.get(key).await
    }

    async fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.inner.set(key, value).await
    }
}

#[tokio::test]
async fn test_checkpoint_outage_fails_cycle_without_restarting_from_scratch() {
    let a = record(Uuid::new_v4(), "film a", "2023-01-01T00:00:00Z");

    let mut source = ScriptedSource::new(vec![vec![a], vec![]]);
    let mut index = RecordingIndex::default();
    let mut store = FlakyStore {
        inner: MemoryStore::new(),
        fail_next_get: false,
    };

    {
        let sink = SinkWriter::new(&mut index, "movies");
        let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());
        replication.run_cycle().await.unwrap();
    }

    // The store becomes unreachable: the next cycle must fail outright
    // instead of falling back to the default watermark.
    store.fail_next_get = true;
    {
        let sink = SinkWriter::new(&mut index, "movies");
        let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());

        assert!(replication.run_cycle().await.is_err());

        // Once the store recovers, replication resumes from the committed
        // watermark, not from the beginning of time.
        replication.run_cycle().await.unwrap();
    }

    assert_eq!(
        stored(&mut store.inner).await.as_deref(),
        Some("2023-01-01T00:00:00+00:00")
    );
    // The failed cycle never reached extraction; the recovery cycle was
    // parameterized by the surviving watermark.
    assert_eq!(source.queries.len(), 2);
    assert!(source.queries[1].contains("2023-01-01T00:00:00+00:00"));
}

#[tokio::test]
async fn test_malformed_checkpoint_skips_cycle_before_extraction() {
    let mut source = ScriptedSource::new(vec![vec![]]);
    let mut index = RecordingIndex::default();
    let mut store = MemoryStore::new();
    store.set(WATERMARK_KEY, "not-a-timestamp").await.unwrap();

    {
        let sink = SinkWriter::new(&mut index, "movies");
        let mut replication = ReplicationLoop::new(&mut source, sink, &mut store, settings());
        assert!(replication.run_cycle().await.is_err());
    }

    assert!(source.queries.is_empty());
    assert_eq!(stored(&mut store).await.as_deref(), Some("not-a-timestamp"));
}

#[tokio::test]
async fn test_ensure_index_is_idempotent_across_restarts() {
    let mut index = RecordingIndex::default();

    {
        let mut sink = SinkWriter::new(&mut index, "movies");
        sink.ensure_index(&schema::movies_index()).await.unwrap();
        sink.ensure_index(&schema::movies_index()).await.unwrap();
    }

    assert_eq!(index.created, vec!["movies", "movies"]);
}
