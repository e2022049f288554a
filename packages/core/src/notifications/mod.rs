//! Notifications
//!
//! In-process publish/subscribe used by the services:
//!
//! - `bus` - the `NotificationBus` and handler traits
//! - `content` - the notifications fired by content and element operations

mod bus;
mod content;

pub use bus::{CancelableNotification, Notification, NotificationBus, NotificationHandler};
pub use content::*;
