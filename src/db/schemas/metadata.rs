//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps as unix milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Whether this document has been soft-deleted
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,

    /// When the document was created
    #[serde(default)]
    pub created_at: i64,

    /// When the document was last updated
    #[serde(default)]
    pub updated_at: i64,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark as soft-deleted at `now`
    pub fn mark_deleted(&mut self, now: i64) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

/// Current time in unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a unix-millisecond timestamp as RFC 3339
pub fn rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
