//! Scoping
//!
//! Units of work for the services: tree-wide locks, repository transactions,
//! and deferred notifications that only fire once a scope commits.

mod locks;
mod scope;

pub use locks::{HeldLocks, LockGuard, LockId, LockManager};
pub use scope::{Scope, ScopeProvider};
