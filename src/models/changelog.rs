//! Changelog entries, owned by a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One released version of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub version: String,
    pub date: DateTime<Utc>,
    pub notes: String,
}

/// Request body for appending a changelog entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangelogEntry {
    pub version: String,
    /// Defaults to the time of the write
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}
