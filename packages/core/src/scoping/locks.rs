//! Tree-Wide Locks
//!
//! One reader/writer lock per tree. Write operations hold the write lock for
//! their whole scope (every page of a cascade included); listings take the
//! read lock. There is no per-node or per-subtree locking.
//!
//! The locks are not reentrant. While a scope delivers a "before"
//! notification it publishes the locks it holds as [`HeldLocks`], and scopes
//! opened by handlers on the same task join those locks instead of waiting
//! on them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

tokio::task_local! {
    static HELD_LOCKS: HeldLocks;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockId {
    ContentTree,
    ElementTree,
}

impl LockId {
    pub const ALL: [LockId; 2] = [LockId::ContentTree, LockId::ElementTree];
}

/// A lock held by a scope until it completes
#[derive(Debug)]
pub enum LockGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
    /// Joined from the enclosing scope; releasing it is a no-op
    Inherited { write: bool },
}

impl LockGuard {
    pub fn is_write(&self) -> bool {
        match self {
            LockGuard::Read(_) => false,
            LockGuard::Write(_) => true,
            LockGuard::Inherited { write } => *write,
        }
    }
}

/// Locks held by the enclosing scopes of the current task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldLocks(Vec<(LockId, bool)>);

impl HeldLocks {
    /// Locks published by enclosing scopes, empty outside a handler
    pub fn current() -> Self {
        HELD_LOCKS.try_with(Clone::clone).unwrap_or_default()
    }

    /// `Some(is_write)` when the lock is held
    pub fn holds(&self, id: LockId) -> Option<bool> {
        self.0
            .iter()
            .filter(|(held, _)| *held == id)
            .map(|(_, write)| *write)
            .reduce(|a, b| a || b)
    }

    pub fn insert(&mut self, id: LockId, write: bool) {
        match self.0.iter_mut().find(|(held, _)| *held == id) {
            Some(entry) => entry.1 |= write,
            None => self.0.push((id, write)),
        }
    }

    /// Run `future` with these locks visible to scopes it opens
    pub async fn while_held<F: Future>(self, future: F) -> F::Output {
        HELD_LOCKS.scope(self, future).await
    }
}

#[derive(Debug)]
pub struct LockManager {
    locks: HashMap<LockId, Arc<RwLock<()>>>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self {
            locks: LockId::ALL
                .iter()
                .map(|id| (*id, Arc::new(RwLock::new(()))))
                .collect(),
        }
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, id: LockId) -> Arc<RwLock<()>> {
        match self.locks.get(&id) {
            Some(lock) => Arc::clone(lock),
            // every LockId is registered in Default
            None => Arc::new(RwLock::new(())),
        }
    }

    pub async fn read(&self, id: LockId) -> LockGuard {
        LockGuard::Read(self.lock(id).read_owned().await)
    }

    pub async fn write(&self, id: LockId) -> LockGuard {
        LockGuard::Write(self.lock(id).write_owned().await)
    }
}
