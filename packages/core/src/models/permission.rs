//! Explicit Entity Permissions
//!
//! Permissions are granted to user groups per node as a set of single-letter
//! verbs (`F` browse, `U` publish, ...). Only explicitly assigned permissions
//! are modelled here; inheritance is resolved by callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPermission {
    pub user_group_id: i64,
    pub entity_id: i64,
    pub verbs: BTreeSet<String>,
}

impl EntityPermission {
    pub fn new<I, S>(user_group_id: i64, entity_id: i64, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_group_id,
            entity_id,
            verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }
}

/// All explicit permissions on one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPermissionSet {
    pub entity_id: i64,
    pub permissions: Vec<EntityPermission>,
}

impl EntityPermissionSet {
    pub fn new(entity_id: i64, permissions: Vec<EntityPermission>) -> Self {
        Self {
            entity_id,
            permissions,
        }
    }

    /// Same grants, attached to another entity
    pub fn retarget(&self, entity_id: i64) -> Self {
        Self {
            entity_id,
            permissions: self
                .permissions
                .iter()
                .map(|p| EntityPermission {
                    user_group_id: p.user_group_id,
                    entity_id,
                    verbs: p.verbs.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
