//! Operation Outcomes
//!
//! Expected business outcomes (a subscriber cancelled, the node is already
//! published, values are invalid) are returned as values rather than errors
//! so that a branch cascade can keep going past one failed node.

use crate::models::event_messages::EventMessages;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome kind of a publish or unpublish attempt on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishResultType {
    SuccessPublish,
    SuccessPublishCulture,
    SuccessPublishAlready,
    SuccessUnpublish,
    SuccessUnpublishAlready,
    SuccessUnpublishCulture,
    SuccessUnpublishLastCulture,
    SuccessUnpublishMandatoryCulture,
    FailedPublish,
    FailedPublishAlready,
    FailedPublishPathNotPublished,
    FailedPublishIsTrashed,
    FailedPublishCancelledByEvent,
    FailedPublishContentInvalid,
    FailedPublishNothingToPublish,
    FailedPublishMandatoryCultureMissing,
    FailedPublishUnsavedChanges,
    FailedUnpublish,
    FailedUnpublishCancelledByEvent,
}

impl PublishResultType {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PublishResultType::SuccessPublish
                | PublishResultType::SuccessPublishCulture
                | PublishResultType::SuccessPublishAlready
                | PublishResultType::SuccessUnpublish
                | PublishResultType::SuccessUnpublishAlready
                | PublishResultType::SuccessUnpublishCulture
                | PublishResultType::SuccessUnpublishLastCulture
                | PublishResultType::SuccessUnpublishMandatoryCulture
        )
    }
}

/// Outcome of publishing or unpublishing one node
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub result_type: PublishResultType,
    pub event_messages: EventMessages,
    pub content_id: i64,
    pub content_key: Uuid,
    /// Aliases of the properties that failed validation
    pub invalid_properties: Vec<String>,
}

impl PublishResult {
    pub fn new(
        result_type: PublishResultType,
        event_messages: EventMessages,
        content_id: i64,
        content_key: Uuid,
    ) -> Self {
        Self {
            result_type,
            event_messages,
            content_id,
            content_key,
            invalid_properties: Vec::new(),
        }
    }

    pub fn with_invalid_properties(mut self, aliases: Vec<String>) -> Self {
        self.invalid_properties = aliases;
        self
    }

    pub fn success(&self) -> bool {
        self.result_type.is_success()
    }
}

/// Outcome kind of a non-publishing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationResultType {
    Success,
    NoOperation,
    FailedCancelledByEvent,
    FailedCannot,
}

#[derive(Debug, Clone)]
pub struct OperationResult {
    pub result_type: OperationResultType,
    pub event_messages: EventMessages,
}

impl OperationResult {
    pub fn new(result_type: OperationResultType, event_messages: EventMessages) -> Self {
        Self {
            result_type,
            event_messages,
        }
    }

    pub fn succeed(event_messages: EventMessages) -> Self {
        Self::new(OperationResultType::Success, event_messages)
    }

    pub fn no_operation(event_messages: EventMessages) -> Self {
        Self::new(OperationResultType::NoOperation, event_messages)
    }

    pub fn cancel(event_messages: EventMessages) -> Self {
        Self::new(OperationResultType::FailedCancelledByEvent, event_messages)
    }

    pub fn cannot(event_messages: EventMessages) -> Self {
        Self::new(OperationResultType::FailedCannot, event_messages)
    }

    /// `NoOperation` counts as success: nothing needed doing
    pub fn success(&self) -> bool {
        matches!(
            self.result_type,
            OperationResultType::Success | OperationResultType::NoOperation
        )
    }
}

/// Which descendants a branch publish touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBranchFilter {
    /// Also publish descendants that have never been published
    pub include_unpublished: bool,
    /// Republish published descendants even when they have no edits
    pub force_republish: bool,
}

impl PublishBranchFilter {
    pub const DEFAULT: Self = Self {
        include_unpublished: false,
        force_republish: false,
    };

    pub const INCLUDE_UNPUBLISHED: Self = Self {
        include_unpublished: true,
        force_republish: false,
    };

    pub const FORCE_REPUBLISH: Self = Self {
        include_unpublished: false,
        force_republish: true,
    };

    pub const ALL: Self = Self {
        include_unpublished: true,
        force_republish: true,
    };
}
