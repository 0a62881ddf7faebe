//! Bulk request body construction and response parsing.

use crate::traits::IndexDocument;
use anyhow::Result;
use serde::Deserialize;

/// Build the newline-delimited body for a `_bulk` request: one action line
/// and one document line per item.
pub(crate) fn bulk_body(index: &str, batch: &[IndexDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in batch {
        let action = serde_json::json!({"index": {"_index": index, "_id": doc.id}});
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.body)?);
        body.push('\n');
    }
    Ok(body)
}

/// Top-level `_bulk` response.
#[derive(Debug, Deserialize)]
pub(crate) struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItem {
    #[serde(rename = "index")]
    pub index: BulkItemResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkItemResult {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Per-item result of a bulk write, in batch order.
#[derive(Debug, Clone)]
pub struct BulkItemOutcome {
    pub id: String,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItemOutcome {
    pub fn success(id: impl Into<String>, status: u16) -> Self {
        Self {
            id: id.into(),
            status,
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, status: u16, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

impl From<BulkItemResult> for BulkItemOutcome {
    fn from(item: BulkItemResult) -> Self {
        Self {
            id: item.id,
            status: item.status,
            error: item.error.map(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> IndexDocument {
        IndexDocument {
            id: id.to_string(),
            body: serde_json::json!({"title": "t"}),
        }
    }

    #[test]
    fn test_bulk_body_pairs_action_and_document_lines() {
        let body = bulk_body("movies", &[doc("a"), doc("b")]).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "movies");
        assert_eq!(action["index"]["_id"], "a");
        let document: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(document["title"], "t");
        let second: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(second["index"]["_id"], "b");
    }

    #[test]
    fn test_bulk_body_ends_with_newline() {
        let body = bulk_body("movies", &[doc("a")]).unwrap();
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_bulk_response_parses_per_item_status() {
        let raw = serde_json::json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "movies", "_id": "a", "status": 200}},
                {"index": {"_index": "movies", "_id": "b", "status": 400,
                           "error": {"type": "mapper_parsing_exception", "reason": "bad field"}}}
            ]
        });

        let response: BulkResponse = serde_json::from_value(raw).unwrap();
        assert!(response.errors);
        assert_eq!(response.items.len(), 2);

        let outcomes: Vec<BulkItemOutcome> = response
            .items
            .into_iter()
            .map(|i| i.index.into())
            .collect();
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[1].id, "b");
        assert_eq!(outcomes[1].status, 400);
        assert!(outcomes[1]
            .error
            .as_deref()
            .unwrap()
            .contains("mapper_parsing_exception"));
    }

    #[test]
    fn test_created_status_is_success() {
        assert!(BulkItemOutcome::success("a", 201).is_success());
        assert!(!BulkItemOutcome::failure("a", 429, "rejected").is_success());
    }
}
