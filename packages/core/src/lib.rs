//! Content Tree Core
//!
//! This crate provides the content services of a hierarchical CMS: a tree of
//! culture-variant documents with draft and published versions, plus flat
//! publishable elements.
//!
//! # Architecture
//!
//! - **Scoped operations**: every service call runs in a `Scope` holding a
//!   tree-wide lock and a repository transaction; "after" notifications are
//!   delivered only once the scope commits
//! - **Cancelable notifications**: "before" notifications go out immediately
//!   and any handler can cancel the operation
//! - **Materialized paths**: nodes carry `-1,<ancestor ids>,<id>` paths, so
//!   subtree reads are prefix queries
//! - **Repository seam**: async traits with in-memory implementations
//!
//! # Modules
//!
//! - [`models`] - Content nodes, content types, results and queries
//! - [`services`] - ContentService, ElementService, ContentPublishingService
//! - [`notifications`] - Notification bus and content notifications
//! - [`scoping`] - Locks, scopes and deferred delivery
//! - [`db`] - Repository traits and in-memory implementations
//! - [`config`] - Service configuration
//! - [`logging`] - Default tracing setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod scoping;
pub mod services;

// Re-export commonly used types
pub use config::ContentServiceConfig;
pub use models::*;
pub use services::*;
