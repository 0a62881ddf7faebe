//! Replication watermark.
//!
//! A watermark is the replication cursor: all records whose effective-modified
//! timestamp is less than or equal to it are known to be durably replicated.
//! The value is persisted as an RFC 3339 string, which sorts lexically in the
//! same order as the underlying timestamps.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the effective-modified timeline.
///
/// Watermarks are totally ordered and only ever move forward over the
/// lifetime of a deployment: the checkpoint is advanced to a batch maximum
/// after a successful write and never regresses, even when overlapping
/// records are redelivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// The beginning of time. Used when no checkpoint has been stored yet,
    /// so a first run replicates everything.
    pub const MIN: Watermark = Watermark(DateTime::UNIX_EPOCH);

    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Watermark(timestamp)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Render for persistence and for substitution into the extraction query.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Parse a persisted watermark string.
    pub fn parse(s: &str) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(s)
            .map_err(|e| anyhow::anyhow!("invalid watermark timestamp {s:?}: {e}"))?
            .with_timezone(&Utc);

        Ok(Watermark(timestamp))
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Watermark(timestamp)
    }
}
