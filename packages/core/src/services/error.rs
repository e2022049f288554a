//! Service Layer Error Types
//!
//! Structural failures (missing parent, unknown content type, invalid
//! arguments, storage errors) are raised as `ContentServiceError` and roll
//! back the surrounding scope. Expected business outcomes are not errors; they
//! come back as `PublishResult` / `OperationResult` values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentServiceError {
    /// Entity not found by id or key
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Parent does not exist or cannot hold children
    #[error("Invalid parent: {parent_id}")]
    InvalidParent { parent_id: i64 },

    #[error("Content type not found: {alias}")]
    ContentTypeNotFound { alias: String },

    /// Caller passed arguments the operation cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation is not allowed in the node's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Repository operation failed
    #[error("Repository operation failed: {0}")]
    Repository(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ContentServiceError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(parent_id: i64) -> Self {
        Self::InvalidParent { parent_id }
    }

    /// Create a content type not found error
    pub fn content_type_not_found(alias: impl Into<String>) -> Self {
        Self::ContentTypeNotFound {
            alias: alias.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
