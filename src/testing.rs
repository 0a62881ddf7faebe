//! In-memory test doubles for exercising the replication pipeline without
//! live services.

use anyhow::Result;
use search_sync_elasticsearch_sink::{BulkItemOutcome, IndexDocument, SearchIndex};
use std::collections::{HashMap, VecDeque};
use sync_core::{Record, RecordSource, RecordStream, Watermark};
use uuid::Uuid;

/// Stream over a pre-built vector of records.
pub struct StaticRecordStream(std::vec::IntoIter<Record>);

impl StaticRecordStream {
    pub fn new(records: Vec<Record>) -> Self {
        Self(records.into_iter())
    }
}

#[async_trait::async_trait]
impl RecordStream for StaticRecordStream {
    async fn next(&mut self) -> Option<Result<Record>> {
        self.0.next().map(Ok)
    }
}

/// Source that replays one scripted result set per extraction call and
/// records the queries it receives. Calls beyond the script yield empty
/// streams.
#[derive(Default)]
pub struct ScriptedSource {
    results: VecDeque<Vec<Record>>,
    pub queries: Vec<String>,
}

impl ScriptedSource {
    pub fn new(results: Vec<Vec<Record>>) -> Self {
        Self {
            results: results.into(),
            queries: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for ScriptedSource {
    async fn extract(&mut self, query: &str, _chunk_size: usize) -> Result<Box<dyn RecordStream>> {
        self.queries.push(query.to_string());
        let records = self.results.pop_front().unwrap_or_default();
        Ok(Box::new(StaticRecordStream::new(records)))
    }
}

/// In-memory index that stores documents by id, records the id order of
/// every bulk call, and can be told to reject specific ids.
#[derive(Default)]
pub struct RecordingIndex {
    pub documents: HashMap<String, serde_json::Value>,
    pub batches: Vec<Vec<String>>,
    pub reject: HashMap<String, u16>,
    pub created: Vec<String>,
}

#[async_trait::async_trait]
impl SearchIndex for RecordingIndex {
    async fn ensure_index(&mut self, name: &str, _definition: &serde_json::Value) -> Result<()> {
        self.created.push(name.to_string());
        Ok(())
    }

    async fn bulk_write(
        &mut self,
        _index: &str,
        batch: &[IndexDocument],
    ) -> Result<Vec<BulkItemOutcome>> {
        self.batches
            .push(batch.iter().map(|doc| doc.id.clone()).collect());

        let mut results = Vec::with_capacity(batch.len());
        for doc in batch {
            match self.reject.get(&doc.id) {
                Some(&status) => {
                    results.push(BulkItemOutcome::failure(&doc.id, status, "rejected"))
                }
                None => {
                    self.documents.insert(doc.id.clone(), doc.body.clone());
                    results.push(BulkItemOutcome::success(&doc.id, 200));
                }
            }
        }
        Ok(results)
    }
}

/// Build a minimal record for tests.
pub fn record(id: Uuid, title: &str, modified: &str) -> Record {
    Record {
        id,
        imdb_rating: None,
        title: Some(title.to_string()),
        description: None,
        genre: None,
        director: None,
        actors_names: None,
        writers_names: None,
        actors: None,
        writers: None,
        modified: Watermark::parse(modified).expect("valid test timestamp"),
    }
}
