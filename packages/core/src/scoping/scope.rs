//! Scopes
//!
//! A scope is the unit of work of one service operation. It holds the tree
//! locks the operation asked for, the repository transaction opened by the
//! first write lock, and everything that must only happen if the operation
//! commits: "after" notifications, tree-change signals and audit entries.
//!
//! # Lifecycle
//!
//! 1. `ScopeProvider::create_scope` for the repository being changed
//! 2. `read_lock` / `write_lock` (the first write lock begins a transaction)
//! 3. Cancelable "before" notifications are delivered immediately
//! 4. "After" notifications, tree changes and audit entries are queued
//! 5. The operation calls `complete()` when its changes should stick
//! 6. `finish()` commits (or rolls back), releases the locks, then delivers
//!    the queued notifications in order; a rolled-back scope drops them
//!
//! A scope opened by a "before" notification handler joins the locks of the
//! scope delivering it. Joining a write lock also joins that scope's
//! transaction, so the handler's writes commit or roll back with it.

use crate::db::{
    AuditRepository, ContentRepository, DomainEvent, RepositoryTransaction, TreeChange,
};
use crate::models::{AuditEntry, EventMessages};
use crate::notifications::{
    CancelableNotification, Notification, NotificationBus, TreeChangeNotification,
};
use crate::scoping::locks::{HeldLocks, LockGuard, LockId, LockManager};
use crate::services::error::ContentServiceError;
use crate::services::kinds::ContentKind;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

type Deferred = Box<
    dyn FnOnce(Arc<NotificationBus>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
>;

/// Shared infrastructure every scope needs
pub struct ScopeProvider {
    locks: LockManager,
    bus: Arc<NotificationBus>,
    audit: Arc<dyn AuditRepository>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl ScopeProvider {
    pub fn new(
        bus: Arc<NotificationBus>,
        audit: Arc<dyn AuditRepository>,
        event_channel_capacity: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(event_channel_capacity.max(1));
        Self {
            locks: LockManager::new(),
            bus,
            audit,
            event_tx,
        }
    }

    /// Start a unit of work against `repository`
    pub fn create_scope(self: &Arc<Self>, repository: Arc<dyn ContentRepository>) -> Scope {
        Scope {
            provider: Arc::clone(self),
            repository,
            inherited: HeldLocks::current(),
            locks: HashMap::new(),
            transaction: None,
            deferred: Vec::new(),
            audit_entries: Vec::new(),
            messages: EventMessages::new(),
            completed: false,
        }
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn audit_repository(&self) -> &Arc<dyn AuditRepository> {
        &self.audit
    }

    /// Subscribe to committed domain events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Committed domain events as a stream
    ///
    /// A subscriber that falls behind skips the events it missed.
    pub fn event_stream(&self) -> impl Stream<Item = DomainEvent> + Send + 'static {
        BroadcastStream::new(self.event_tx.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Domain event subscriber lagged, skipped {} events", skipped);
                None
            }
        })
    }
}

pub struct Scope {
    provider: Arc<ScopeProvider>,
    repository: Arc<dyn ContentRepository>,
    inherited: HeldLocks,
    locks: HashMap<LockId, LockGuard>,
    transaction: Option<Box<dyn RepositoryTransaction>>,
    deferred: Vec<Deferred>,
    audit_entries: Vec<AuditEntry>,
    messages: EventMessages,
    completed: bool,
}

impl Scope {
    /// Take the read lock on a tree (no-op when any lock on it is held)
    pub async fn read_lock(&mut self, id: LockId) {
        if self.locks.contains_key(&id) {
            return;
        }
        if let Some(write) = self.inherited.holds(id) {
            self.locks.insert(id, LockGuard::Inherited { write });
            return;
        }
        let guard = self.provider.locks.read(id).await;
        self.locks.insert(id, guard);
    }

    /// Take the write lock on a tree and open the repository transaction
    pub async fn write_lock(&mut self, id: LockId) -> Result<(), ContentServiceError> {
        match self.locks.get(&id).map(LockGuard::is_write) {
            Some(true) => {}
            held => {
                if self.inherited.holds(id) == Some(true) {
                    debug!("Joining {:?} write lock of the enclosing scope", id);
                    self.locks.insert(id, LockGuard::Inherited { write: true });
                    return Ok(());
                }
                if held.is_some() {
                    // no upgrade path: release the read lock first
                    debug!("Upgrading {:?} lock to write", id);
                    self.locks.remove(&id);
                }
                let guard = self.provider.locks.write(id).await;
                self.locks.insert(id, guard);
            }
        }

        if self.transaction.is_none() {
            self.transaction = Some(self.repository.begin_transaction().await?);
        }
        Ok(())
    }

    /// Messages shared by every notification of this scope
    pub fn messages(&self) -> EventMessages {
        self.messages.clone()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.provider.bus
    }

    /// Deliver a "before" notification now
    ///
    /// # Returns
    ///
    /// `true` when a handler cancelled the operation
    pub async fn publish_cancelable<N: CancelableNotification>(&self, notification: &mut N) -> bool {
        self.held_locks()
            .while_held(self.provider.bus.publish_cancelable(notification))
            .await
    }

    /// Locks this scope holds, joined ones included
    fn held_locks(&self) -> HeldLocks {
        let mut held = self.inherited.clone();
        for (id, guard) in &self.locks {
            held.insert(*id, guard.is_write());
        }
        held
    }

    /// Queue an "after" notification until the scope commits
    pub fn notify<N: Notification>(&mut self, notification: N) {
        self.deferred.push(Box::new(
            move |bus: Arc<NotificationBus>| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                Box::pin(async move {
                    let mut notification = notification;
                    bus.publish(&mut notification).await;
                })
            },
        ));
    }

    /// Queue a tree-change notification and its domain event
    pub fn tree_changed<K: ContentKind>(&mut self, changes: Vec<TreeChange>) {
        if changes.is_empty() {
            return;
        }
        let event_tx = self.provider.event_tx.clone();
        let notification = TreeChangeNotification::<K>::new(changes, self.messages());
        self.deferred.push(Box::new(
            move |bus: Arc<NotificationBus>| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                Box::pin(async move {
                    let mut notification = notification;
                    bus.publish(&mut notification).await;
                    // no subscribers is fine
                    let _ = event_tx.send(DomainEvent::TreeChanged {
                        object_type: K::NAME.to_string(),
                        changes: notification.changes,
                    });
                })
            },
        ));
    }

    /// Queue an audit entry until the scope commits
    pub fn audit(&mut self, entry: AuditEntry) {
        self.audit_entries.push(entry);
    }

    /// Mark the work as done; `finish` will commit
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Commit or roll back, then deliver queued notifications
    ///
    /// The scope commits only when `outcome` is `Ok` and `complete()` was
    /// called. Locks are released before notifications are delivered, so
    /// handlers may call back into the services.
    pub async fn finish<T>(
        self,
        outcome: Result<T, ContentServiceError>,
    ) -> Result<T, ContentServiceError> {
        let mut this = self;
        let commit = outcome.is_ok() && this.completed;

        if !commit {
            if let Some(transaction) = this.transaction.take() {
                transaction.rollback().await?;
                debug!("Scope rolled back");
            }
            this.deferred.clear();
            this.audit_entries.clear();
            this.locks.clear();
            return outcome;
        }

        if let Some(transaction) = this.transaction.take() {
            transaction.commit().await?;
        }
        for entry in this.audit_entries.drain(..) {
            this.provider.audit.save(entry).await?;
        }
        this.locks.clear();

        let bus = Arc::clone(&this.provider.bus);
        for deferred in this.deferred.drain(..) {
            deferred(Arc::clone(&bus)).await;
        }

        outcome
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            // dropping the transaction rolls it back
            warn!("Scope dropped without finish, rolling back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryAuditRepository, MemoryContentRepository};
    use crate::models::{AuditType, ContentNode, ContentType, ContentVariation, ROOT_ID};
    use crate::notifications::ContentSavedNotification;
    use crate::services::kinds::Document;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        provider: Arc<ScopeProvider>,
        repository: Arc<MemoryContentRepository>,
        audit: Arc<MemoryAuditRepository>,
        saved: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        let bus = Arc::new(NotificationBus::new());
        let saved = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&saved);
        bus.subscribe_fn(move |_: &mut ContentSavedNotification| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let audit = Arc::new(MemoryAuditRepository::new());
        Fixture {
            provider: Arc::new(ScopeProvider::new(bus, audit.clone(), 16)),
            repository: Arc::new(MemoryContentRepository::new()),
            audit,
            saved,
        }
    }

    async fn save_in_scope(f: &Fixture, complete: bool) -> Result<(), ContentServiceError> {
        let mut scope = f.provider.create_scope(f.repository.clone());
        let outcome = async {
            scope.write_lock(LockId::ContentTree).await?;
            let page = ContentType::new("page", "Page", ContentVariation::Nothing);
            let mut node = ContentNode::new("Home", ROOT_ID, &page, -1);
            f.repository.save(&mut node, -1).await?;
            scope.notify(ContentSavedNotification::new(vec![node], scope.messages()));
            scope.audit(AuditEntry::new(AuditType::Save, -1, 1000, "Document"));
            if complete {
                scope.complete();
            }
            Ok::<(), ContentServiceError>(())
        }
        .await;
        scope.finish(outcome).await
    }

    #[tokio::test]
    async fn test_commit_delivers_deferred_work() {
        let f = fixture();
        save_in_scope(&f, true).await.unwrap();

        assert_eq!(f.repository.len(), 1);
        assert_eq!(f.saved.load(Ordering::SeqCst), 1);
        assert_eq!(f.audit.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_scope_discards_everything() {
        let f = fixture();
        save_in_scope(&f, false).await.unwrap();

        assert!(f.repository.is_empty());
        assert_eq!(f.saved.load(Ordering::SeqCst), 0);
        assert!(f.audit.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tree_changes_reach_event_subscribers() {
        let f = fixture();
        let mut rx = f.provider.subscribe_to_events();

        let mut scope = f.provider.create_scope(f.repository.clone());
        scope.tree_changed::<Document>(vec![TreeChange::new(
            1000,
            uuid::Uuid::new_v4(),
            crate::db::TreeChangeKind::RefreshNode,
        )]);
        scope.complete();
        scope.finish(Ok(())).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.changes()[0].id, 1000);
    }
}
