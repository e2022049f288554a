//! In-Process Notification Bus
//!
//! Handlers subscribe per notification type (keyed by `TypeId`) and are run
//! in subscription order. Handlers receive the notification mutably so that a
//! handler of a cancelable notification can veto the operation.
//!
//! # Examples
//!
//! ```rust
//! use contenttree_core::notifications::{ContentSavingNotification, NotificationBus};
//!
//! let bus = NotificationBus::new();
//! bus.subscribe_fn(|notification: &mut ContentSavingNotification| {
//!     if notification.entities.iter().any(|n| n.name() == Some("forbidden")) {
//!         notification.cancel_operation("save", "This name is not allowed");
//!     }
//! });
//! ```

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Marker for anything that can travel over the bus
pub trait Notification: Any + Send + Sync {}

/// A "before" notification that handlers may cancel
pub trait CancelableNotification: Notification {
    fn cancel(&mut self);

    fn cancelled(&self) -> bool;
}

/// Handler for one notification type
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    async fn handle(&self, notification: &mut N);
}

/// Adapter so plain closures can subscribe
struct FnHandler<F>(F);

#[async_trait]
impl<N, F> NotificationHandler<N> for FnHandler<F>
where
    N: Notification,
    F: Fn(&mut N) + Send + Sync + 'static,
{
    async fn handle(&self, notification: &mut N) {
        (self.0)(notification)
    }
}

/// Type-erased handler stored in the registry
#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn handle_any(&self, notification: &mut (dyn Any + Send + Sync));
}

struct TypedHandler<N, H> {
    handler: H,
    _notification: PhantomData<fn() -> N>,
}

#[async_trait]
impl<N, H> ErasedHandler for TypedHandler<N, H>
where
    N: Notification,
    H: NotificationHandler<N>,
{
    async fn handle_any(&self, notification: &mut (dyn Any + Send + Sync)) {
        if let Some(notification) = notification.downcast_mut::<N>() {
            self.handler.handle(notification).await;
        }
    }
}

#[derive(Default)]
pub struct NotificationBus {
    handlers: RwLock<HashMap<TypeId, Vec<Arc<dyn ErasedHandler>>>>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("NotificationBus")
            .field("notification_types", &types)
            .finish()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<N, H>(&self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N>,
    {
        let handler: Arc<dyn ErasedHandler> = Arc::new(TypedHandler {
            handler,
            _notification: PhantomData,
        });
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<N>())
            .or_default()
            .push(handler);
        debug!("Subscribed handler for {}", std::any::type_name::<N>());
    }

    pub fn subscribe_fn<N, F>(&self, handler: F)
    where
        N: Notification,
        F: Fn(&mut N) + Send + Sync + 'static,
    {
        self.subscribe::<N, _>(FnHandler(handler));
    }

    pub fn has_handlers<N: Notification>(&self) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<N>())
            .map(|h| !h.is_empty())
            .unwrap_or(false)
    }

    fn handlers_for<N: Notification>(&self) -> Vec<Arc<dyn ErasedHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<N>())
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver a notification to every handler
    pub async fn publish<N: Notification>(&self, notification: &mut N) {
        for handler in self.handlers_for::<N>() {
            let erased: &mut (dyn Any + Send + Sync) = &mut *notification;
            handler.handle_any(erased).await;
        }
    }

    /// Deliver a cancelable notification
    ///
    /// Stops at the first handler that cancels.
    ///
    /// # Returns
    ///
    /// `true` when the operation was cancelled
    pub async fn publish_cancelable<N: CancelableNotification>(&self, notification: &mut N) -> bool {
        for handler in self.handlers_for::<N>() {
            let erased: &mut (dyn Any + Send + Sync) = &mut *notification;
            handler.handle_any(erased).await;
            if notification.cancelled() {
                debug!("{} cancelled by handler", std::any::type_name::<N>());
                break;
            }
        }
        notification.cancelled()
    }
}
