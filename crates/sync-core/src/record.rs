//! The denormalized film record extracted from PostgreSQL.

use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A credited person embedded in a film document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
}

/// One film aggregate joined with its genres and credited people.
///
/// `id` doubles as the destination document id, so redelivering a record
/// replaces the previous document instead of duplicating it. `modified` is
/// the effective modification time (the maximum over the film row and all
/// joined rows); it drives checkpointing and is excluded from the serialized
/// document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub director: Option<Vec<String>>,
    pub actors_names: Option<Vec<String>>,
    pub writers_names: Option<Vec<String>>,
    pub actors: Option<Vec<Person>>,
    pub writers: Option<Vec<Person>>,
    #[serde(skip_serializing)]
    pub modified: Watermark,
}

impl Record {
    /// The destination document id.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }

    /// Serialize the document payload. The watermark field is replication
    /// metadata and is not part of the payload.
    pub fn document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
