//! Relations Between Content Nodes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relation type recorded between an original and its copy
pub const RELATE_DOCUMENT_ON_COPY_ALIAS: &str = "relateDocumentOnCopy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// 0 until stored
    pub id: i64,
    pub parent_id: i64,
    pub child_id: i64,
    pub relation_type_alias: String,
    /// Dependency relations count as references (the child is used by the parent)
    pub is_dependency: bool,
    pub create_date: DateTime<Utc>,
}

impl Relation {
    pub fn new(parent_id: i64, child_id: i64, relation_type_alias: impl Into<String>) -> Self {
        Self {
            id: 0,
            parent_id,
            child_id,
            relation_type_alias: relation_type_alias.into(),
            is_dependency: false,
            create_date: Utc::now(),
        }
    }

    pub fn dependency(parent_id: i64, child_id: i64, relation_type_alias: impl Into<String>) -> Self {
        Self {
            is_dependency: true,
            ..Self::new(parent_id, child_id, relation_type_alias)
        }
    }
}
