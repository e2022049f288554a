//! Content Notifications
//!
//! Every operation fires a cancelable "before" notification (`Saving`,
//! `Moving`, ...) right away and queues its "after" notification (`Saved`,
//! `Moved`, ...) on the scope, to be delivered only once the scope commits.
//!
//! Notifications are generic over the [`ContentKind`], so
//! `SavingNotification<Document>` and `SavingNotification<Element>` are
//! different types with separate subscribers.
//!
//! # State passing
//!
//! A handler can stash values in the `state` map of a "before" notification.
//! The operation copies that map onto the paired "after" notification with
//! `with_state_from`, so the same handler can pick it up again:
//!
//! ```rust
//! use contenttree_core::models::EventMessages;
//! use contenttree_core::notifications::{ContentSavedNotification, ContentSavingNotification};
//! use serde_json::json;
//!
//! let messages = EventMessages::new();
//! let mut saving = ContentSavingNotification::new(Vec::new(), messages.clone());
//! saving.state.insert("startedAt".to_string(), json!(42));
//!
//! let saved = ContentSavedNotification::new(Vec::new(), messages).with_state_from(&saving);
//! assert_eq!(saved.state.get("startedAt"), Some(&json!(42)));
//! ```

use crate::db::TreeChange;
use crate::models::{ContentNode, EventMessageType, EventMessages};
use crate::notifications::bus::{CancelableNotification, Notification};
use crate::services::kinds::{ContentKind, Document, Element};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Values handed from a "before" notification to its "after" pair
pub type NotificationState = HashMap<String, Value>;

/// Notifications that carry event messages and a state map
pub trait StatefulNotification: Notification {
    fn messages(&self) -> &EventMessages;

    fn state(&self) -> &NotificationState;
}

macro_rules! content_notification {
    ($(#[$meta:meta])* cancelable $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        content_notification!($(#[$meta])* $name { $($field: $ty),* });

        impl<K: ContentKind> CancelableNotification for $name<K> {
            fn cancel(&mut self) {
                self.cancelled = true;
            }

            fn cancelled(&self) -> bool {
                self.cancelled
            }
        }

        impl<K: ContentKind> $name<K> {
            /// Cancel and tell the caller why
            pub fn cancel_operation(&mut self, category: &str, message: &str) {
                self.messages.add(category, message, EventMessageType::Error);
                self.cancelled = true;
            }
        }
    };
    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<K: ContentKind> {
            $(pub $field: $ty,)*
            pub messages: EventMessages,
            pub state: NotificationState,
            #[allow(dead_code)]
            cancelled: bool,
            _kind: PhantomData<K>,
        }

        impl<K: ContentKind> $name<K> {
            pub fn new($($field: $ty,)* messages: EventMessages) -> Self {
                Self {
                    $($field,)*
                    messages,
                    state: NotificationState::new(),
                    cancelled: false,
                    _kind: PhantomData,
                }
            }

            /// Carry over the state map of the paired "before" notification
            pub fn with_state_from<N: StatefulNotification>(mut self, before: &N) -> Self {
                self.state = before.state().clone();
                self
            }
        }

        impl<K: ContentKind> Notification for $name<K> {}

        impl<K: ContentKind> StatefulNotification for $name<K> {
            fn messages(&self) -> &EventMessages {
                &self.messages
            }

            fn state(&self) -> &NotificationState {
                &self.state
            }
        }
    };
}

/// One node relocated by a move
#[derive(Debug, Clone)]
pub struct MoveEventInfo {
    pub entity: ContentNode,
    pub original_path: String,
    pub new_parent_id: i64,
}

content_notification!(cancelable SavingNotification { entities: Vec<ContentNode> });
content_notification!(SavedNotification { entities: Vec<ContentNode> });

content_notification!(cancelable PublishingNotification { entities: Vec<ContentNode> });
content_notification!(PublishedNotification { entities: Vec<ContentNode> });

content_notification!(cancelable UnpublishingNotification { entities: Vec<ContentNode> });
content_notification!(UnpublishedNotification { entities: Vec<ContentNode> });

content_notification!(cancelable MovingNotification { move_infos: Vec<MoveEventInfo> });
content_notification!(MovedNotification { move_infos: Vec<MoveEventInfo> });

content_notification!(cancelable MovingToRecycleBinNotification { move_infos: Vec<MoveEventInfo> });
content_notification!(MovedToRecycleBinNotification { move_infos: Vec<MoveEventInfo> });

content_notification!(
    /// Fired once per node being copied; cancelling skips that node
    cancelable CopyingNotification { original: ContentNode, copy: ContentNode, parent_id: i64 }
);
content_notification!(CopiedNotification {
    original: ContentNode,
    copy: ContentNode,
    parent_id: i64,
    relate_to_original: bool,
});

content_notification!(cancelable DeletingNotification { entities: Vec<ContentNode> });
content_notification!(DeletedNotification { entities: Vec<ContentNode> });

content_notification!(cancelable EmptyingRecycleBinNotification { entities: Vec<ContentNode> });
content_notification!(EmptiedRecycleBinNotification { entities: Vec<ContentNode> });

content_notification!(cancelable SortingNotification { entities: Vec<ContentNode> });
content_notification!(SortedNotification { entities: Vec<ContentNode> });

content_notification!(cancelable RollingBackNotification { entity: ContentNode });
content_notification!(RolledBackNotification { entity: ContentNode });

content_notification!(
    /// Committed structural changes; the cache-refresh signal
    TreeChangeNotification { changes: Vec<TreeChange> }
);

pub type ContentSavingNotification = SavingNotification<Document>;
pub type ContentSavedNotification = SavedNotification<Document>;
pub type ContentPublishingNotification = PublishingNotification<Document>;
pub type ContentPublishedNotification = PublishedNotification<Document>;
pub type ContentUnpublishingNotification = UnpublishingNotification<Document>;
pub type ContentUnpublishedNotification = UnpublishedNotification<Document>;
pub type ContentMovingNotification = MovingNotification<Document>;
pub type ContentMovedNotification = MovedNotification<Document>;
pub type ContentCopyingNotification = CopyingNotification<Document>;
pub type ContentCopiedNotification = CopiedNotification<Document>;
pub type ContentDeletingNotification = DeletingNotification<Document>;
pub type ContentDeletedNotification = DeletedNotification<Document>;
pub type ContentSortingNotification = SortingNotification<Document>;
pub type ContentSortedNotification = SortedNotification<Document>;
pub type ContentTreeChangeNotification = TreeChangeNotification<Document>;

pub type ElementSavingNotification = SavingNotification<Element>;
pub type ElementPublishedNotification = PublishedNotification<Element>;
pub type ElementTreeChangeNotification = TreeChangeNotification<Element>;
