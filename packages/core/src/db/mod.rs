//! Repository Layer
//!
//! This module defines the storage seam the services are written against:
//!
//! - `ContentRepository` - hierarchical nodes, versions and permissions
//! - `ContentTypeRepository` / `LanguageRepository` - schema lookups
//! - `AuditRepository` / `RelationRepository` - audit trail and relations
//! - Domain events broadcast after a scope commits
//!
//! # Architecture
//!
//! Every trait is async and returns `anyhow::Result`, so a SQL or network
//! backend can replace the in-memory implementations in [`memory`] without
//! touching the services.

mod audit_repository;
mod content_repository;
mod error;
pub mod events;
pub mod memory;
mod schema_repository;

pub use audit_repository::{AuditRepository, RelationRepository};
pub use content_repository::{ContentRepository, RepositoryTransaction};
pub use error::RepositoryError;
pub use events::{DomainEvent, TreeChange, TreeChangeKind};
pub use memory::{
    MemoryAuditRepository, MemoryContentRepository, MemoryContentTypeRepository,
    MemoryLanguageRepository, MemoryRelationRepository,
};
pub use schema_repository::{ContentTypeRepository, LanguageRepository};
