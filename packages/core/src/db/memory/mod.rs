//! In-memory repository implementations
//!
//! Used by the test suites and by embedders that keep the tree in process.

mod audit_store;
mod content_store;
mod schema_store;

pub use audit_store::{MemoryAuditRepository, MemoryRelationRepository};
pub use content_store::MemoryContentRepository;
pub use schema_store::{MemoryContentTypeRepository, MemoryLanguageRepository};
