//! Element Service
//!
//! Elements are flat, publishable content blocks. They share the publishing
//! skeleton with documents but never have children, so moves, copies and
//! the recycle bin do not apply.

use crate::db::ContentRepository;
use crate::models::{
    ContentNode, ContentQuery, ContentVersion, OperationResult, Ordering, Page, PublishResult,
    ROOT_ID,
};
use crate::services::context::ContentServiceContext;
use crate::services::error::ContentServiceError;
use crate::services::kinds::Element;
use crate::services::publishing_core::PublishingCore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ElementService {
    core: PublishingCore<Element>,
}

impl ElementService {
    pub fn new(repository: Arc<dyn ContentRepository>, context: ContentServiceContext) -> Self {
        Self {
            core: PublishingCore::new(repository, context),
        }
    }

    /// Build an element at root level without saving it
    pub async fn create(
        &self,
        name: &str,
        content_type_alias: &str,
        user_id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        self.core
            .create(name, ROOT_ID, content_type_alias, user_id)
            .await
    }

    pub async fn create_and_save(
        &self,
        name: &str,
        content_type_alias: &str,
        user_id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        let mut element = self.create(name, content_type_alias, user_id).await?;
        self.core.save(&mut element, user_id).await?;
        Ok(element)
    }

    pub async fn save(
        &self,
        element: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        self.core.save(element, user_id).await
    }

    pub async fn publish(
        &self,
        element: &mut ContentNode,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        self.core.publish(element, cultures, user_id).await
    }

    pub async fn unpublish(
        &self,
        element: &mut ContentNode,
        culture: Option<&str>,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        self.core.unpublish(element, culture, user_id).await
    }

    pub async fn delete(
        &self,
        element: &ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        self.core.delete(element, user_id).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ContentNode>, ContentServiceError> {
        self.core.get_by_id(id).await
    }

    pub async fn get_by_key(&self, key: Uuid) -> Result<Option<ContentNode>, ContentServiceError> {
        self.core.get_by_key(key).await
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<ContentNode>, ContentServiceError> {
        self.core.get_by_ids(ids).await
    }

    /// Page over every element
    pub async fn get_paged(
        &self,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>, ContentServiceError> {
        self.core
            .get_paged(
                &ContentQuery::default().children_of(ROOT_ID),
                page_index,
                page_size,
                filter,
                ordering,
            )
            .await
    }

    pub async fn get_versions(&self, id: i64) -> Result<Vec<ContentVersion>, ContentServiceError> {
        self.core.get_versions(id).await
    }

    pub async fn get_version(
        &self,
        version_id: i64,
    ) -> Result<Option<ContentVersion>, ContentServiceError> {
        self.core.get_version(version_id).await
    }
}
