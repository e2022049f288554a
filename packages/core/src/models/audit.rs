//! Audit Trail Entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditType {
    New,
    Save,
    SaveVariant,
    Publish,
    PublishVariant,
    Unpublish,
    UnpublishVariant,
    Move,
    Copy,
    Delete,
    Sort,
    RollBack,
    AssignPermission,
}

/// One audit record, written in the same scope as the change it describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub audit_type: AuditType,
    pub user_id: i64,
    pub entity_id: i64,
    /// "Document" or "Element"
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        audit_type: AuditType,
        user_id: i64,
        entity_id: i64,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            audit_type,
            user_id,
            entity_id,
            object_type: object_type.into(),
            comment: None,
            parameters: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }
}
