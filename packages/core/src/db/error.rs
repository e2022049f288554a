//! Repository Error Types
//!
//! Errors raised by repository implementations. They cross the repository
//! trait seam as `anyhow::Error` and are wrapped into service-layer errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Entity does not exist in the store
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Parent referenced by a new node does not exist
    #[error("Parent {parent_id} not found for new {entity}")]
    MissingParent { entity: String, parent_id: i64 },

    /// Key already used by another entity
    #[error("Duplicate key for {entity}: {key}")]
    DuplicateKey { entity: String, key: String },

    /// Transaction could not be started, committed or rolled back
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn missing_parent(entity: impl Into<String>, parent_id: i64) -> Self {
        Self::MissingParent {
            entity: entity.into(),
            parent_id,
        }
    }

    pub fn duplicate_key(entity: impl Into<String>, key: impl ToString) -> Self {
        Self::DuplicateKey {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }
}
