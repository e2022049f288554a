//! Domain Events for Committed Tree Changes
//!
//! Once a scope commits, the tree changes it recorded are sent on a tokio
//! broadcast channel so that caches (and anything else that mirrors the tree)
//! can refresh without coupling to the services.
//!
//! # Event Flow
//!
//! 1. A service records tree changes on its scope
//! 2. The scope commits its transaction
//! 3. The changes are sent as one [`DomainEvent::TreeChanged`]
//! 4. Every subscriber receives the event asynchronously

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a subscriber has to refresh for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeChangeKind {
    /// Only this node changed
    RefreshNode,
    /// This node and all of its descendants changed
    RefreshBranch,
    /// The whole tree changed
    RefreshAll,
    /// The node (and its descendants) no longer exist
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeChange {
    pub id: i64,
    pub key: Uuid,
    pub kind: TreeChangeKind,
    /// Cultures published by the change (culture-variant content only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_cultures: Option<Vec<String>>,
    /// Cultures unpublished by the change (culture-variant content only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpublished_cultures: Option<Vec<String>>,
}

impl TreeChange {
    pub fn new(id: i64, key: Uuid, kind: TreeChangeKind) -> Self {
        Self {
            id,
            key,
            kind,
            published_cultures: None,
            unpublished_cultures: None,
        }
    }

    pub fn with_published_cultures(mut self, cultures: Vec<String>) -> Self {
        if !cultures.is_empty() {
            self.published_cultures = Some(cultures);
        }
        self
    }

    pub fn with_unpublished_cultures(mut self, cultures: Vec<String>) -> Self {
        if !cultures.is_empty() {
            self.unpublished_cultures = Some(cultures);
        }
        self
    }
}

/// Domain events emitted after a scope commits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// Nodes of one object type ("Document", "Element") changed
    #[serde(rename = "treeChanged")]
    TreeChanged {
        #[serde(rename = "objectType")]
        object_type: String,
        changes: Vec<TreeChange>,
    },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::TreeChanged { .. } => "tree:changed",
        }
    }

    pub fn changes(&self) -> &[TreeChange] {
        match self {
            DomainEvent::TreeChanged { changes, .. } => changes,
        }
    }
}
