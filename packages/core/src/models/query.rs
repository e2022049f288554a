//! Content Queries
//!
//! [`ContentQuery`] is the storage-agnostic filter the services hand to a
//! [`ContentRepository`](crate::db::ContentRepository). Every field is optional
//! and all set fields must match.
//!
//! # Examples
//!
//! ```rust
//! use contenttree_core::models::{ContentQuery, Ordering};
//!
//! // Every descendant of the node at path -1,1050
//! let query = ContentQuery::default().descendants_of("-1,1050");
//! assert_eq!(query.path_prefix.as_deref(), Some("-1,1050,"));
//! let _ordering = Ordering::PathAscending;
//! ```

use crate::models::content::ContentNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    /// Nodes whose parent is this id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,

    /// Nodes whose path starts with this prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<i64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type_alias: Option<String>,

    /// Case-insensitive substring of the display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
}

impl ContentQuery {
    pub fn children_of(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Strict descendants of the node at `path` (the node itself excluded)
    pub fn descendants_of(mut self, path: &str) -> Self {
        self.path_prefix = Some(format!("{},", path));
        self
    }

    pub fn with_ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn trashed(mut self, trashed: bool) -> Self {
        self.trashed = Some(trashed);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn of_type(mut self, alias: impl Into<String>) -> Self {
        self.content_type_alias = Some(alias.into());
        self
    }

    pub fn name_contains(mut self, text: impl Into<String>) -> Self {
        self.name_contains = Some(text.into());
        self
    }

    pub fn matches(&self, node: &ContentNode) -> bool {
        if let Some(parent_id) = self.parent_id {
            if node.parent_id != parent_id {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !node.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&node.id) {
                return false;
            }
        }
        if let Some(trashed) = self.trashed {
            if node.trashed != trashed {
                return false;
            }
        }
        if let Some(published) = self.published {
            if node.published != published {
                return false;
            }
        }
        if let Some(alias) = &self.content_type_alias {
            if &node.content_type.alias != alias {
                return false;
            }
        }
        if let Some(text) = &self.name_contains {
            let text = text.to_lowercase();
            let found = node
                .name()
                .map(|name| name.to_lowercase().contains(&text))
                .unwrap_or(false);
            if !found {
                return false;
            }
        }
        true
    }
}

/// Sort order for paged queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ordering {
    /// Plain string comparison of materialized paths (ancestors first)
    #[default]
    PathAscending,
    /// Deepest-looking paths first; used when deleting bottom-up
    PathDescending,
    SortOrderAscending,
    NameAscending,
    IdAscending,
}

impl Ordering {
    pub fn compare(&self, a: &ContentNode, b: &ContentNode) -> std::cmp::Ordering {
        match self {
            Ordering::PathAscending => a.path.cmp(&b.path),
            Ordering::PathDescending => b.path.cmp(&a.path),
            Ordering::SortOrderAscending => a
                .sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.id.cmp(&b.id)),
            Ordering::NameAscending => a
                .name()
                .unwrap_or_default()
                .to_lowercase()
                .cmp(&b.name().unwrap_or_default().to_lowercase())
                .then_with(|| a.id.cmp(&b.id)),
            Ordering::IdAscending => a.id.cmp(&b.id),
        }
    }
}

/// One page of a paged query plus the total number of matches
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, ContentVariation, ROOT_ID, SUPER_USER_ID};

    fn node_at(id: i64, path: &str) -> ContentNode {
        let ct = ContentType::new("page", "Page", ContentVariation::Nothing);
        let mut node = ContentNode::new(format!("Node {}", id), ROOT_ID, &ct, SUPER_USER_ID);
        node.id = id;
        node.path = path.to_string();
        node
    }

    #[test]
    fn test_descendant_prefix_excludes_self_and_lookalikes() {
        let query = ContentQuery::default().descendants_of("-1,10");
        assert!(query.matches(&node_at(11, "-1,10,11")));
        assert!(!query.matches(&node_at(10, "-1,10")));
        assert!(!query.matches(&node_at(100, "-1,100")));
    }

    #[test]
    fn test_path_ordering_puts_ancestors_first() {
        let parent = node_at(10, "-1,10");
        let child = node_at(11, "-1,10,11");
        assert_eq!(
            Ordering::PathAscending.compare(&parent, &child),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Ordering::PathDescending.compare(&parent, &child),
            std::cmp::Ordering::Greater
        );
    }
}
