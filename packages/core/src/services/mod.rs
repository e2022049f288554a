//! Business Services
//!
//! This module contains the content services:
//!
//! - `ContentService` - the document tree: save, publish, move, copy, sort,
//!   rollback, recycle bin and tree reads
//! - `ElementService` - flat publishable elements
//! - `ContentPublishingService` - key-based publishing with culture checks and
//!   background branch publishing
//! - `LongRunningOperationService` - named background operations
//!
//! Documents and elements share one publishing skeleton, `PublishingCore`,
//! parameterized by a `ContentKind`.

mod content_publishing_service;
mod content_service;
mod context;
mod element_service;
pub mod error;
pub mod kinds;
mod long_running;
mod publish_branch;
mod publishing_core;
mod relate_on_copy;
mod validation;

pub use content_publishing_service::{
    ContentPublishingBranchItemResult, ContentPublishingBranchResult,
    ContentPublishingOperationStatus, ContentPublishingResult, ContentPublishingService,
};
pub use content_service::ContentService;
pub use context::ContentServiceContext;
pub use element_service::ElementService;
pub use error::ContentServiceError;
pub use kinds::{ContentKind, Document, Element};
pub use long_running::{
    LongRunningOperationError, LongRunningOperationService, LongRunningOperationStatus,
};
pub use publish_branch::should_publish;
pub use publishing_core::PublishingCore;
pub use relate_on_copy::RelateOnCopyHandler;
pub use validation::{PropertyValidationService, NAME_ALIAS};
