//! Content Versions

use crate::models::content::ContentNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a node taken every time it is saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentVersion {
    pub version_id: i64,
    pub content_id: i64,
    pub version_date: DateTime<Utc>,
    pub user_id: i64,
    /// Whether this version was the published one when it was stored
    pub published: bool,
    pub content: ContentNode,
}
