//! Event Messages
//!
//! Messages that notification handlers attach to an operation (for example
//! "this node is referenced elsewhere"). One `EventMessages` instance is shared
//! by every notification of a scope and ends up on the operation's result.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventMessageType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub category: String,
    pub message: String,
    pub message_type: EventMessageType,
}

/// Shared, append-only list of messages for one scope
#[derive(Debug, Clone, Default)]
pub struct EventMessages {
    inner: Arc<Mutex<Vec<EventMessage>>>,
}

impl EventMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        category: impl Into<String>,
        message: impl Into<String>,
        message_type: EventMessageType,
    ) {
        let message = EventMessage {
            category: category.into(),
            message: message.into(),
            message_type,
        };
        // a poisoned list only means a handler panicked mid-push; keep the messages
        let mut messages = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        messages.push(message);
    }

    pub fn all(&self) -> Vec<EventMessage> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_messages() {
        let messages = EventMessages::new();
        let handle = messages.clone();
        handle.add("publish", "node is referenced", EventMessageType::Warning);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages.all()[0].category, "publish");
    }
}
