//! Content Publishing Service
//!
//! Key-based publishing facade over [`ContentService`]. It checks the
//! requested cultures against the node and the configured languages before
//! anything is attempted, and can run branch publishes in the background
//! through [`LongRunningOperationService`].

use crate::db::LanguageRepository;
use crate::models::{
    ContentNode, PublishBranchFilter, PublishResult, PublishResultType, INVARIANT_CULTURE,
};
use crate::services::content_service::ContentService;
use crate::services::context::ContentServiceContext;
use crate::services::error::ContentServiceError;
use crate::services::long_running::{LongRunningOperationError, LongRunningOperationService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentPublishingOperationStatus {
    Success,
    /// Work was handed to a background operation
    Accepted,
    ContentNotFound,
    InvalidCulture,
    CultureMissing,
    CannotPublishInvariantWhenVariant,
    CannotPublishVariantWhenNotVariant,
    TaskResultNotFound,
    Failed,
}

/// Outcome of a single-node publish or unpublish
#[derive(Debug, Clone)]
pub struct ContentPublishingResult {
    pub status: ContentPublishingOperationStatus,
    pub content: Option<ContentNode>,
    pub results: Vec<PublishResult>,
}

impl ContentPublishingResult {
    fn status(status: ContentPublishingOperationStatus) -> Self {
        Self {
            status,
            content: None,
            results: Vec::new(),
        }
    }
}

/// One node of a branch publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPublishingBranchItemResult {
    pub key: Uuid,
    pub result_type: PublishResultType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPublishingBranchResult {
    pub status: ContentPublishingOperationStatus,
    pub content_key: Uuid,
    pub succeeded_items: Vec<ContentPublishingBranchItemResult>,
    pub failed_items: Vec<ContentPublishingBranchItemResult>,
    /// Handle of the background operation, when one was started
    pub accepted_task_id: Option<Uuid>,
}

impl ContentPublishingBranchResult {
    fn status(content_key: Uuid, status: ContentPublishingOperationStatus) -> Self {
        Self {
            status,
            content_key,
            succeeded_items: Vec::new(),
            failed_items: Vec::new(),
            accepted_task_id: None,
        }
    }

    fn from_results(content_key: Uuid, results: &[PublishResult]) -> Self {
        let (succeeded, failed): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.success());
        let item = |r: &PublishResult| ContentPublishingBranchItemResult {
            key: r.content_key,
            result_type: r.result_type,
        };
        let status = if failed.is_empty() {
            ContentPublishingOperationStatus::Success
        } else {
            ContentPublishingOperationStatus::Failed
        };
        Self {
            status,
            content_key,
            succeeded_items: succeeded.into_iter().map(item).collect(),
            failed_items: failed.into_iter().map(item).collect(),
            accepted_task_id: None,
        }
    }
}

#[derive(Clone)]
pub struct ContentPublishingService {
    content: ContentService,
    languages: Arc<dyn LanguageRepository>,
    operations: LongRunningOperationService,
}

impl ContentPublishingService {
    pub fn new(
        content: ContentService,
        context: &ContentServiceContext,
        operations: LongRunningOperationService,
    ) -> Self {
        Self {
            content,
            languages: Arc::clone(&context.languages),
            operations,
        }
    }

    /// Publish the given cultures of the node with this key
    ///
    /// Variant content must name its cultures; invariant content takes `*`.
    pub async fn publish(
        &self,
        key: Uuid,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<ContentPublishingResult, ContentServiceError> {
        let Some(mut node) = self.content.get_by_key(key).await? else {
            return Ok(ContentPublishingResult::status(
                ContentPublishingOperationStatus::ContentNotFound,
            ));
        };
        if let Some(status) = self.validate_cultures(&node, cultures, false).await? {
            debug!("Rejected publish of {}: {:?}", key, status);
            return Ok(ContentPublishingResult::status(status));
        }

        let result = self.content.publish(&mut node, cultures, user_id).await?;
        let status = if result.success() {
            ContentPublishingOperationStatus::Success
        } else {
            ContentPublishingOperationStatus::Failed
        };
        Ok(ContentPublishingResult {
            status,
            content: Some(node),
            results: vec![result],
        })
    }

    /// Unpublish cultures of the node with this key, one at a time
    ///
    /// `*` unpublishes the whole node. Stops at the first failure.
    pub async fn unpublish(
        &self,
        key: Uuid,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<ContentPublishingResult, ContentServiceError> {
        let Some(mut node) = self.content.get_by_key(key).await? else {
            return Ok(ContentPublishingResult::status(
                ContentPublishingOperationStatus::ContentNotFound,
            ));
        };
        if let Some(status) = self.validate_cultures(&node, cultures, true).await? {
            debug!("Rejected unpublish of {}: {:?}", key, status);
            return Ok(ContentPublishingResult::status(status));
        }

        let cultures: Vec<&str> = if cultures.contains(&INVARIANT_CULTURE) {
            vec![INVARIANT_CULTURE]
        } else {
            cultures.to_vec()
        };

        let mut results = Vec::new();
        let mut status = ContentPublishingOperationStatus::Success;
        for culture in cultures {
            let result = self
                .content
                .unpublish(&mut node, Some(culture), user_id)
                .await?;
            let success = result.success();
            results.push(result);
            if !success {
                status = ContentPublishingOperationStatus::Failed;
                break;
            }
        }

        Ok(ContentPublishingResult {
            status,
            content: Some(node),
            results,
        })
    }

    /// Publish a node and its descendants
    ///
    /// With `use_background` the cascade runs as a long-running operation and
    /// the result only carries `accepted_task_id`; poll
    /// [`Self::is_publishing_branch`] and [`Self::get_publish_branch_result`].
    /// Background requests for the same branch may overlap; each queues on
    /// the content tree write lock.
    pub async fn publish_branch(
        &self,
        key: Uuid,
        cultures: &[&str],
        filter: PublishBranchFilter,
        user_id: i64,
        use_background: bool,
    ) -> Result<ContentPublishingBranchResult, ContentServiceError> {
        let Some(node) = self.content.get_by_key(key).await? else {
            return Ok(ContentPublishingBranchResult::status(
                key,
                ContentPublishingOperationStatus::ContentNotFound,
            ));
        };
        if let Some(status) = self.validate_cultures(&node, cultures, true).await? {
            debug!("Rejected branch publish of {}: {:?}", key, status);
            return Ok(ContentPublishingBranchResult::status(key, status));
        }

        let cultures: Vec<String> = cultures.iter().map(|c| c.to_string()).collect();
        if !use_background {
            return publish_branch_now(&self.content, node, &cultures, filter, user_id).await;
        }

        let content = self.content.clone();
        let work = async move {
            publish_branch_now(&content, node, &cultures, filter, user_id).await
        };
        let task_id = self
            .operations
            .run(&branch_operation_name(key), work, true)
            .await
            .map_err(|e| ContentServiceError::invalid_operation(e.to_string()))?;
        info!("Branch publish of {} accepted as {}", key, task_id);
        let mut result =
            ContentPublishingBranchResult::status(key, ContentPublishingOperationStatus::Accepted);
        result.accepted_task_id = Some(task_id);
        Ok(result)
    }

    /// Whether a background branch publish is still enqueued or running
    pub async fn is_publishing_branch(&self, task_id: Uuid) -> bool {
        self.operations.get_status(task_id).await.is_active()
    }

    /// Result of a finished background branch publish
    pub async fn get_publish_branch_result(
        &self,
        task_id: Uuid,
    ) -> ContentPublishingBranchResult {
        let content_key = self
            .operations
            .get_name(task_id)
            .await
            .and_then(|name| branch_key(&name))
            .unwrap_or_else(Uuid::nil);
        match self
            .operations
            .get_result::<ContentPublishingBranchResult>(task_id)
            .await
        {
            Ok(mut result) => {
                result.accepted_task_id = Some(task_id);
                result
            }
            Err(LongRunningOperationError::Failed { message, .. }) => {
                debug!("Branch publish {} failed: {}", task_id, message);
                let mut result = ContentPublishingBranchResult::status(
                    content_key,
                    ContentPublishingOperationStatus::Failed,
                );
                result.accepted_task_id = Some(task_id);
                result
            }
            Err(_) => ContentPublishingBranchResult::status(
                content_key,
                ContentPublishingOperationStatus::TaskResultNotFound,
            ),
        }
    }

    async fn validate_cultures(
        &self,
        node: &ContentNode,
        cultures: &[&str],
        allow_all: bool,
    ) -> Result<Option<ContentPublishingOperationStatus>, ContentServiceError> {
        if cultures.is_empty() {
            return Ok(Some(ContentPublishingOperationStatus::CultureMissing));
        }

        if !node.varies_by_culture() {
            if cultures.iter().any(|c| *c != INVARIANT_CULTURE) {
                return Ok(Some(
                    ContentPublishingOperationStatus::CannotPublishVariantWhenNotVariant,
                ));
            }
            return Ok(None);
        }

        if cultures.contains(&INVARIANT_CULTURE) {
            if allow_all && cultures.len() == 1 {
                return Ok(None);
            }
            return Ok(Some(
                ContentPublishingOperationStatus::CannotPublishInvariantWhenVariant,
            ));
        }

        let known: Vec<String> = self
            .languages
            .get_all()
            .await?
            .into_iter()
            .map(|l| l.iso_code)
            .collect();
        if cultures.iter().any(|c| !known.iter().any(|k| k == c)) {
            return Ok(Some(ContentPublishingOperationStatus::InvalidCulture));
        }
        Ok(None)
    }
}

const BRANCH_OPERATION_PREFIX: &str = "ContentPublishingService:PublishBranch:";

fn branch_operation_name(key: Uuid) -> String {
    format!("{}{}", BRANCH_OPERATION_PREFIX, key)
}

/// Root key of a branch operation, recovered from its name
fn branch_key(name: &str) -> Option<Uuid> {
    name.strip_prefix(BRANCH_OPERATION_PREFIX)
        .and_then(|key| Uuid::parse_str(key).ok())
}

/// The cascade both the synchronous and the background path run
async fn publish_branch_now(
    content: &ContentService,
    mut root: ContentNode,
    cultures: &[String],
    filter: PublishBranchFilter,
    user_id: i64,
) -> Result<ContentPublishingBranchResult, ContentServiceError> {
    let key = root.key;
    let cultures: Vec<&str> = cultures.iter().map(String::as_str).collect();
    let results = content
        .publish_branch(&mut root, filter, &cultures, user_id)
        .await?;
    Ok(ContentPublishingBranchResult::from_results(key, &results))
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "content_publishing_service_test.rs"]
mod content_publishing_service_test;
