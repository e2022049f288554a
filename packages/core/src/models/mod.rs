//! Data Models
//!
//! This module contains the data structures shared by the repositories and
//! services:
//!
//! - `ContentNode` - one entry in the content tree, with culture names and
//!   draft/published property values
//! - `ContentType` - the schema a node is built from
//! - Outcome types (`PublishResult`, `OperationResult`) returned by services
//! - Supporting records: audit entries, relations, permissions, versions,
//!   languages
//!
//! Nodes never own their content type; they carry a `ContentTypeRef` and the
//! full definition is looked up when needed.

mod audit;
mod content;
mod content_type;
mod event_messages;
mod language;
mod permission;
mod query;
mod relation;
mod results;
mod version;

pub use audit::{AuditEntry, AuditType};
pub use content::{
    ContentNode, CultureInfo, Property, PropertyValue, PublishedState, INVARIANT_CULTURE,
    RECYCLE_BIN_ID, RECYCLE_BIN_LEVEL, RECYCLE_BIN_PATH, ROOT_ID, SUPER_USER_ID,
};
pub use content_type::{ContentType, ContentTypeRef, ContentVariation, PropertyEditor, PropertyType};
pub use event_messages::{EventMessage, EventMessageType, EventMessages};
pub use language::Language;
pub use permission::{EntityPermission, EntityPermissionSet};
pub use query::{ContentQuery, Ordering, Page};
pub use relation::{Relation, RELATE_DOCUMENT_ON_COPY_ALIAS};
pub use results::{
    OperationResult, OperationResultType, PublishBranchFilter, PublishResult, PublishResultType,
};
pub use version::ContentVersion;
