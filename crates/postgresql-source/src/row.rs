//! Mapping from query rows onto the statically typed record.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sync_core::{Person, Record, Watermark};
use tokio_postgres::Row;
use uuid::Uuid;

/// Map one result row onto a [`Record`].
///
/// Fails when a column is missing or has an unexpected type; the caller
/// logs and skips such rows.
pub(crate) fn record_from_row(row: &Row) -> Result<Record> {
    let id: Uuid = row.try_get("id").context("column id")?;
    let modified: DateTime<Utc> = row.try_get("modified").context("column modified")?;

    Ok(Record {
        id,
        imdb_rating: row.try_get("imdb_rating").context("column imdb_rating")?,
        title: row.try_get("title").context("column title")?,
        description: row.try_get("description").context("column description")?,
        genre: row.try_get("genre").context("column genre")?,
        director: row.try_get("director").context("column director")?,
        actors_names: row
            .try_get("actors_names")
            .context("column actors_names")?,
        writers_names: row
            .try_get("writers_names")
            .context("column writers_names")?,
        actors: person_list(row, "actors")?,
        writers: person_list(row, "writers")?,
        modified: Watermark::new(modified),
    })
}

/// Decode a `jsonb_agg` column of `{id, name}` objects.
fn person_list(row: &Row, column: &str) -> Result<Option<Vec<Person>>> {
    let value: Option<serde_json::Value> = row
        .try_get(column)
        .with_context(|| format!("column {column}"))?;

    match value {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("column {column} does not hold a person list")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_list_decodes_aggregated_objects() {
        let raw = serde_json::json!([
            {"id": "00000000-0000-0000-0000-000000000001", "name": "A. Actor"},
            {"id": "00000000-0000-0000-0000-000000000002", "name": "B. Actor"}
        ]);

        let people: Vec<Person> = serde_json::from_value(raw).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].name, "B. Actor");
    }

    #[test]
    fn test_person_list_rejects_non_object_items() {
        let raw = serde_json::json!(["just-a-string"]);
        let decoded: Result<Vec<Person>, _> = serde_json::from_value(raw);
        assert!(decoded.is_err());
    }
}
