//! Publishing Core
//!
//! The save/publish/unpublish/delete skeleton shared by documents and
//! elements. `PublishingCore<K>` is parameterised by a [`ContentKind`], which
//! decides the lock taken, the object type written to audit entries and
//! domain events, and whether deletes cascade to descendants.
//!
//! # Scopes
//!
//! Every public operation runs in its own scope:
//!
//! ```text
//! create_scope -> [cancelable notification] -> write_lock -> writes
//!              -> queue "after" notifications + audit -> complete -> finish
//! ```
//!
//! The `*_locked` / `*_item` helpers run inside a scope the caller owns, so
//! composite operations (branch publish, rollback, sort) reuse them without
//! nesting scopes.

use crate::db::{ContentRepository, TreeChange, TreeChangeKind};
use crate::models::{
    AuditEntry, AuditType, ContentNode, ContentQuery, ContentType, ContentVersion,
    EventMessageType, EventMessages, OperationResult, Ordering, Page, PublishResult,
    PublishResultType, PublishedState, INVARIANT_CULTURE, ROOT_ID,
};
use crate::notifications::{
    DeletedNotification, DeletingNotification, NotificationState, PublishedNotification,
    PublishingNotification, SavedNotification, SavingNotification, UnpublishedNotification,
    UnpublishingNotification,
};
use crate::scoping::Scope;
use crate::services::context::ContentServiceContext;
use crate::services::error::ContentServiceError;
use crate::services::kinds::ContentKind;
use crate::services::validation::PropertyValidationService;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct PublishingCore<K: ContentKind> {
    repository: Arc<dyn ContentRepository>,
    context: ContentServiceContext,
    validator: Arc<PropertyValidationService>,
    _kind: PhantomData<K>,
}

// Manual Clone: K itself need not be Clone
impl<K: ContentKind> Clone for PublishingCore<K> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            context: self.context.clone(),
            validator: Arc::clone(&self.validator),
            _kind: PhantomData,
        }
    }
}

fn publish_result(
    result_type: PublishResultType,
    messages: &EventMessages,
    node: &ContentNode,
) -> PublishResult {
    PublishResult::new(result_type, messages.clone(), node.id, node.key)
}

impl<K: ContentKind> PublishingCore<K> {
    pub fn new(repository: Arc<dyn ContentRepository>, context: ContentServiceContext) -> Self {
        Self {
            repository,
            context,
            validator: Arc::new(PropertyValidationService::new()),
            _kind: PhantomData,
        }
    }

    pub fn repository(&self) -> &Arc<dyn ContentRepository> {
        &self.repository
    }

    pub fn context(&self) -> &ContentServiceContext {
        &self.context
    }

    pub(crate) fn create_scope(&self) -> Scope {
        self.context.scopes.create_scope(Arc::clone(&self.repository))
    }

    pub(crate) async fn read_scope(&self) -> Scope {
        let mut scope = self.create_scope();
        scope.read_lock(K::LOCK).await;
        scope
    }

    pub(crate) async fn content_type_of(
        &self,
        node: &ContentNode,
    ) -> Result<ContentType, ContentServiceError> {
        self.context
            .content_types
            .get_by_alias(&node.content_type.alias)
            .await?
            .ok_or_else(|| ContentServiceError::content_type_not_found(&node.content_type.alias))
    }

    //
    // CREATE
    //

    /// Build a new node without saving it
    ///
    /// Nodes of culture-variant types are named for the default language
    /// when one is configured.
    pub async fn create(
        &self,
        name: &str,
        parent_id: i64,
        content_type_alias: &str,
        user_id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        let content_type = self
            .context
            .content_types
            .get_by_alias(content_type_alias)
            .await?
            .ok_or_else(|| ContentServiceError::content_type_not_found(content_type_alias))?;

        if parent_id != ROOT_ID {
            if !K::HIERARCHICAL {
                return Err(ContentServiceError::invalid_parent(parent_id));
            }
            match self.get_by_id(parent_id).await? {
                Some(parent) if !parent.trashed => {}
                _ => return Err(ContentServiceError::invalid_parent(parent_id)),
            }
        }

        let node = match self.context.languages.default_iso_code().await? {
            Some(culture) if content_type.varies_by_culture() => {
                ContentNode::new_with_culture(name, &culture, parent_id, &content_type, user_id)
            }
            _ => ContentNode::new(name, parent_id, &content_type, user_id),
        };
        debug!("Created {} '{}' under {}", K::NAME, name, parent_id);
        Ok(node)
    }

    //
    // SAVE
    //

    fn ensure_savable(&self, node: &ContentNode) -> Result<(), ContentServiceError> {
        if matches!(
            node.published_state,
            PublishedState::Publishing | PublishedState::Unpublishing
        ) {
            return Err(ContentServiceError::invalid_operation(format!(
                "Cannot save (un)publishing content '{}' in state {:?}",
                node.name().unwrap_or_default(),
                node.published_state
            )));
        }

        let max = self.context.config.max_name_length;
        let names = node
            .name()
            .into_iter()
            .chain(node.culture_infos().map(|c| c.name.as_str()));
        for name in names {
            if name.chars().count() > max {
                return Err(ContentServiceError::invalid_argument(format!(
                    "Name '{}' cannot be more than {} characters in length",
                    name, max
                )));
            }
        }
        Ok(())
    }

    pub async fn save(
        &self,
        node: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        self.ensure_savable(node)?;

        let mut scope = self.create_scope();
        let outcome = async {
            let result = self.save_locked(&mut scope, node, user_id).await?;
            if result.success() {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    /// Save inside the caller's scope
    pub(crate) async fn save_locked(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let messages = scope.messages();
        let mut saving = SavingNotification::<K>::new(vec![node.clone()], messages.clone());
        if scope.publish_cancelable(&mut saving).await {
            warn!("Save of {} {} cancelled by a handler", K::NAME, node.id);
            return Ok(OperationResult::cancel(messages));
        }

        scope.write_lock(K::LOCK).await?;

        if !K::HIERARCHICAL && node.parent_id != ROOT_ID {
            return Err(ContentServiceError::invalid_parent(node.parent_id));
        }
        if !node.has_identity() {
            node.creator_id = user_id;
        }

        let dirty_cultures = node.dirty_cultures();
        self.repository.save(node, user_id).await?;

        scope.notify(
            SavedNotification::<K>::new(vec![node.clone()], messages.clone())
                .with_state_from(&saving),
        );
        scope.tree_changed::<K>(vec![TreeChange::new(
            node.id,
            node.key,
            TreeChangeKind::RefreshNode,
        )]);

        let entry = if node.varies_by_culture() && !dirty_cultures.is_empty() {
            let languages = dirty_cultures.join(", ");
            AuditEntry::new(AuditType::SaveVariant, user_id, node.id, K::NAME)
                .with_comment(format!("Saved languages: {}", languages))
                .with_parameters(languages)
        } else {
            AuditEntry::new(AuditType::Save, user_id, node.id, K::NAME)
        };
        scope.audit(entry);

        info!("Saved {} {} (version {})", K::NAME, node.id, node.version_id);
        Ok(OperationResult::succeed(messages))
    }

    //
    // PUBLISH
    //

    /// Resolve the cultures a single publish asks for
    fn publish_cultures(
        &self,
        node: &ContentNode,
        cultures: &[&str],
    ) -> Result<Vec<String>, ContentServiceError> {
        if cultures.is_empty() {
            return Err(ContentServiceError::invalid_argument(
                "At least one culture must be given",
            ));
        }

        let wildcard = cultures.contains(&INVARIANT_CULTURE);
        if !node.varies_by_culture() {
            if cultures.len() != 1 || !wildcard {
                return Err(ContentServiceError::invalid_argument(
                    "Invariant content can only be published with culture '*'",
                ));
            }
            return Ok(vec![INVARIANT_CULTURE.to_string()]);
        }

        if wildcard {
            if cultures.len() > 1 {
                return Err(ContentServiceError::invalid_argument(
                    "Culture '*' cannot be combined with specific cultures",
                ));
            }
            return Ok(node.available_cultures());
        }

        let mut resolved: Vec<String> = cultures.iter().map(|c| c.to_string()).collect();
        resolved.sort();
        resolved.dedup();
        Ok(resolved)
    }

    /// Publish the given cultures (`*` for invariant content or all cultures)
    pub async fn publish(
        &self,
        node: &mut ContentNode,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        let cultures = self.publish_cultures(node, cultures)?;

        let mut scope = self.create_scope();
        let outcome = async {
            scope.write_lock(K::LOCK).await?;

            if cultures.is_empty() {
                debug!("{} {} has no culture to publish", K::NAME, node.id);
                return Ok(publish_result(
                    PublishResultType::FailedPublishNothingToPublish,
                    &scope.messages(),
                    node,
                ));
            }

            let (result, _) = self
                .publish_item(&mut scope, node, &cultures, user_id, false)
                .await?;
            if result.success() {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    /// Publish one node inside the caller's scope
    ///
    /// `in_branch` leaves the published notification, the tree change and
    /// the audit entry to the branch cascade, which emits them once for the
    /// whole branch. Returns the state of the saving notification so the
    /// caller can hand it on.
    pub(crate) async fn publish_item(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        cultures: &[String],
        user_id: i64,
        in_branch: bool,
    ) -> Result<(PublishResult, NotificationState), ContentServiceError> {
        let messages = scope.messages();

        if node.is_dirty() {
            debug!("{} {} has unsaved changes", K::NAME, node.id);
            return Ok((
                publish_result(PublishResultType::FailedPublishUnsavedChanges, &messages, node),
                NotificationState::new(),
            ));
        }
        if matches!(
            node.published_state,
            PublishedState::Publishing | PublishedState::Unpublishing
        ) {
            return Ok((
                publish_result(PublishResultType::FailedPublishAlready, &messages, node),
                NotificationState::new(),
            ));
        }
        if cultures.is_empty() {
            return Ok((
                publish_result(PublishResultType::SuccessPublishAlready, &messages, node),
                NotificationState::new(),
            ));
        }

        let mut saving = SavingNotification::<K>::new(vec![node.clone()], messages.clone());
        if scope.publish_cancelable(&mut saving).await {
            warn!("Publish of {} {} cancelled while saving", K::NAME, node.id);
            return Ok((
                publish_result(PublishResultType::FailedPublishCancelledByEvent, &messages, node),
                saving.state,
            ));
        }

        let content_type = self.content_type_of(node).await?;
        let invalid = self
            .validator
            .validate_for_publish(node, &content_type, cultures);
        if !invalid.is_empty() {
            debug!(
                "{} {} has invalid properties: {}",
                K::NAME,
                node.id,
                invalid.join(", ")
            );
            return Ok((
                publish_result(PublishResultType::FailedPublishContentInvalid, &messages, node)
                    .with_invalid_properties(invalid),
                saving.state,
            ));
        }

        let original = node.clone();
        let now = Utc::now();
        for culture in cultures {
            node.publish_culture_values(culture, now);
        }

        let result = self
            .commit_publish(scope, node, &saving, user_id, in_branch)
            .await?;
        if !result.success() {
            *node = original;
        }
        Ok((result, saving.state))
    }

    /// Check publish preconditions and persist the published version
    async fn commit_publish(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        saving: &SavingNotification<K>,
        user_id: i64,
        in_branch: bool,
    ) -> Result<PublishResult, ContentServiceError> {
        let messages = scope.messages();

        let mut publishing = PublishingNotification::<K>::new(vec![node.clone()], messages.clone());
        if scope.publish_cancelable(&mut publishing).await {
            warn!("Publish of {} {} cancelled by a handler", K::NAME, node.id);
            return Ok(publish_result(
                PublishResultType::FailedPublishCancelledByEvent,
                &messages,
                node,
            ));
        }
        if node.trashed {
            return Ok(publish_result(
                PublishResultType::FailedPublishIsTrashed,
                &messages,
                node,
            ));
        }
        if !self.repository.is_path_published(node).await? {
            debug!("Ancestors of {} {} are not published", K::NAME, node.id);
            return Ok(publish_result(
                PublishResultType::FailedPublishPathNotPublished,
                &messages,
                node,
            ));
        }
        if node.varies_by_culture() {
            let mandatory = self.context.languages.mandatory_iso_codes().await?;
            if let Some(missing) = mandatory.iter().find(|c| !node.is_culture_published(c)) {
                messages.add(
                    "publish",
                    format!("Mandatory culture {} is not published", missing),
                    EventMessageType::Warning,
                );
                return Ok(publish_result(
                    PublishResultType::FailedPublishMandatoryCultureMissing,
                    &messages,
                    node,
                ));
            }
        }

        let previously_published = node.published;
        node.published_state = PublishedState::Publishing;
        self.repository.save(node, user_id).await?;
        let cultures = node.take_publishing_cultures();

        scope.notify(
            SavedNotification::<K>::new(vec![node.clone()], messages.clone())
                .with_state_from(saving),
        );

        let result_type = if node.varies_by_culture() {
            PublishResultType::SuccessPublishCulture
        } else {
            PublishResultType::SuccessPublish
        };

        if !in_branch {
            scope.notify(
                PublishedNotification::<K>::new(vec![node.clone()], messages.clone())
                    .with_state_from(saving),
            );

            let refresh_branch = K::HIERARCHICAL && !previously_published;
            let kind = if refresh_branch {
                TreeChangeKind::RefreshBranch
            } else {
                TreeChangeKind::RefreshNode
            };
            let mut change = TreeChange::new(node.id, node.key, kind);
            if node.varies_by_culture() {
                change = change.with_published_cultures(cultures.clone());
            }
            scope.tree_changed::<K>(vec![change]);

            if refresh_branch {
                // descendants that kept their published flag are live again
                let flagged = self
                    .repository
                    .query(
                        &ContentQuery::default()
                            .descendants_of(&node.path)
                            .published(true)
                            .trashed(false),
                    )
                    .await?;
                let mut visible = Vec::new();
                for descendant in flagged {
                    if self.repository.is_path_published(&descendant).await? {
                        visible.push(descendant);
                    }
                }
                if !visible.is_empty() {
                    scope.notify(PublishedNotification::<K>::new(visible, messages.clone()));
                }
            }

            let entry = if node.varies_by_culture() {
                let languages = cultures.join(", ");
                AuditEntry::new(AuditType::PublishVariant, user_id, node.id, K::NAME)
                    .with_comment(format!("Published languages: {}", languages))
                    .with_parameters(languages)
            } else {
                AuditEntry::new(AuditType::Publish, user_id, node.id, K::NAME)
            };
            scope.audit(entry);
            info!("Published {} {}", K::NAME, node.id);
        }

        Ok(publish_result(result_type, &messages, node))
    }

    //
    // UNPUBLISH
    //

    /// Unpublish one culture, or the whole node when `culture` is `None` or `*`
    pub async fn unpublish(
        &self,
        node: &mut ContentNode,
        culture: Option<&str>,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        let culture = culture.unwrap_or(INVARIANT_CULTURE).to_string();
        if !node.varies_by_culture() && culture != INVARIANT_CULTURE {
            return Err(ContentServiceError::invalid_argument(format!(
                "Culture {} is not valid for invariant content",
                culture
            )));
        }

        let mut scope = self.create_scope();
        let outcome = async {
            scope.write_lock(K::LOCK).await?;
            let result = self
                .unpublish_locked(&mut scope, node, &culture, user_id)
                .await?;
            if result.success() {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    async fn unpublish_locked(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        culture: &str,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        let messages = scope.messages();

        if !node.published {
            return Ok(publish_result(
                PublishResultType::SuccessUnpublishAlready,
                &messages,
                node,
            ));
        }

        let original = node.clone();
        if culture == INVARIANT_CULTURE {
            return self
                .unpublish_document(
                    scope,
                    node,
                    &original,
                    user_id,
                    PublishResultType::SuccessUnpublish,
                )
                .await;
        }

        if !node.is_culture_published(culture) {
            return Ok(publish_result(
                PublishResultType::SuccessUnpublishAlready,
                &messages,
                node,
            ));
        }

        let mandatory = self
            .context
            .languages
            .mandatory_iso_codes()
            .await?
            .iter()
            .any(|c| c == culture);
        node.unpublish_culture_values(culture);

        if mandatory {
            return self
                .unpublish_document(
                    scope,
                    node,
                    &original,
                    user_id,
                    PublishResultType::SuccessUnpublishMandatoryCulture,
                )
                .await;
        }
        if node.published_cultures().is_empty() {
            return self
                .unpublish_document(
                    scope,
                    node,
                    &original,
                    user_id,
                    PublishResultType::SuccessUnpublishLastCulture,
                )
                .await;
        }

        let mut saving = SavingNotification::<K>::new(vec![node.clone()], messages.clone());
        if scope.publish_cancelable(&mut saving).await {
            *node = original;
            return Ok(publish_result(
                PublishResultType::FailedUnpublishCancelledByEvent,
                &messages,
                node,
            ));
        }

        let unpublished = node.take_unpublishing_cultures();
        self.repository.save(node, user_id).await?;

        scope.notify(
            SavedNotification::<K>::new(vec![node.clone()], messages.clone())
                .with_state_from(&saving),
        );
        scope.tree_changed::<K>(vec![TreeChange::new(
            node.id,
            node.key,
            TreeChangeKind::RefreshNode,
        )
        .with_unpublished_cultures(unpublished.clone())]);

        let languages = unpublished.join(", ");
        scope.audit(
            AuditEntry::new(AuditType::UnpublishVariant, user_id, node.id, K::NAME)
                .with_comment(format!("Unpublished languages: {}", languages))
                .with_parameters(languages),
        );
        info!("Unpublished culture {} of {} {}", culture, K::NAME, node.id);

        Ok(publish_result(
            PublishResultType::SuccessUnpublishCulture,
            &messages,
            node,
        ))
    }

    /// Take the whole node offline; `original` is restored on failure
    async fn unpublish_document(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        original: &ContentNode,
        user_id: i64,
        success: PublishResultType,
    ) -> Result<PublishResult, ContentServiceError> {
        let messages = scope.messages();

        if self.context.config.disable_unpublish_when_referenced
            && self.context.relations.is_referenced(node.id).await?
        {
            *node = original.clone();
            messages.add(
                "publish",
                "Content is referenced by other items and cannot be unpublished",
                EventMessageType::Warning,
            );
            return Ok(publish_result(PublishResultType::FailedUnpublish, &messages, node));
        }

        let mut unpublishing =
            UnpublishingNotification::<K>::new(vec![node.clone()], messages.clone());
        if scope.publish_cancelable(&mut unpublishing).await {
            *node = original.clone();
            warn!("Unpublish of {} {} cancelled by a handler", K::NAME, node.id);
            return Ok(publish_result(
                PublishResultType::FailedUnpublishCancelledByEvent,
                &messages,
                node,
            ));
        }

        let unpublished_cultures = if node.varies_by_culture() {
            original.published_cultures()
        } else {
            Vec::new()
        };

        node.published_state = PublishedState::Unpublishing;
        self.repository.save(node, user_id).await?;
        node.clear_pending_cultures();

        scope.notify(
            UnpublishedNotification::<K>::new(vec![node.clone()], messages.clone())
                .with_state_from(&unpublishing),
        );
        let kind = if K::HIERARCHICAL {
            TreeChangeKind::RefreshBranch
        } else {
            TreeChangeKind::RefreshNode
        };
        scope.tree_changed::<K>(vec![TreeChange::new(node.id, node.key, kind)
            .with_unpublished_cultures(unpublished_cultures)]);
        scope.audit(AuditEntry::new(
            AuditType::Unpublish,
            user_id,
            node.id,
            K::NAME,
        ));
        info!("Unpublished {} {}", K::NAME, node.id);

        Ok(publish_result(success, &messages, node))
    }

    //
    // DELETE
    //

    /// Delete a node (and, for hierarchical content, its descendants)
    pub async fn delete(
        &self,
        node: &ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let mut scope = self.create_scope();
        let outcome = async {
            let messages = scope.messages();

            let mut deleting = DeletingNotification::<K>::new(vec![node.clone()], messages.clone());
            if scope.publish_cancelable(&mut deleting).await {
                warn!("Delete of {} {} cancelled by a handler", K::NAME, node.id);
                return Ok(OperationResult::cancel(messages));
            }

            scope.write_lock(K::LOCK).await?;

            let current = self
                .repository
                .get(node.id)
                .await?
                .ok_or_else(|| ContentServiceError::not_found(K::NAME, node.id))?;

            if self.is_delete_blocked(current.id).await? {
                messages.add(
                    "delete",
                    "Content is referenced by other items and cannot be deleted",
                    EventMessageType::Warning,
                );
                return Ok(OperationResult::cannot(messages));
            }

            if !current.trashed && current.published {
                scope.notify(UnpublishedNotification::<K>::new(
                    vec![current.clone()],
                    messages.clone(),
                ));
            }

            self.delete_locked(&mut scope, &current).await?;

            scope.tree_changed::<K>(vec![TreeChange::new(
                current.id,
                current.key,
                TreeChangeKind::Remove,
            )]);
            scope.audit(AuditEntry::new(
                AuditType::Delete,
                user_id,
                current.id,
                K::NAME,
            ));
            scope.complete();
            info!("Deleted {} {}", K::NAME, current.id);
            Ok::<_, ContentServiceError>(OperationResult::succeed(messages))
        }
        .await;
        scope.finish(outcome).await
    }

    pub(crate) async fn is_delete_blocked(&self, id: i64) -> Result<bool, ContentServiceError> {
        Ok(self.context.config.disable_delete_when_referenced
            && self.context.relations.is_referenced(id).await?)
    }

    /// Delete descendants deepest first, then the node itself
    ///
    /// Every page is read at index 0: deleting a page shrinks the result set.
    pub(crate) async fn delete_locked(
        &self,
        scope: &mut Scope,
        node: &ContentNode,
    ) -> Result<Vec<ContentNode>, ContentServiceError> {
        let mut deleted = Vec::new();

        if K::HIERARCHICAL {
            let query = ContentQuery::default().descendants_of(&node.path);
            let page_size = self.context.config.delete_page_size;
            loop {
                let page = self
                    .repository
                    .get_page(&query, 0, page_size, None, Ordering::PathDescending)
                    .await?;
                for descendant in page.items {
                    self.delete_one(scope, &descendant).await?;
                    deleted.push(descendant);
                }
                if page.total <= page_size {
                    break;
                }
            }
        }

        self.delete_one(scope, node).await?;
        deleted.push(node.clone());
        Ok(deleted)
    }

    async fn delete_one(
        &self,
        scope: &mut Scope,
        node: &ContentNode,
    ) -> Result<(), ContentServiceError> {
        self.repository.delete(node.id).await?;
        self.context.relations.delete_for_entity(node.id).await?;
        debug!("Deleted {} {} at {}", K::NAME, node.id, node.path);
        let messages = scope.messages();
        scope.notify(DeletedNotification::<K>::new(vec![node.clone()], messages));
        Ok(())
    }

    //
    // READS
    //

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ContentNode>, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self.repository.get(id).await.map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    pub async fn get_by_key(&self, key: Uuid) -> Result<Option<ContentNode>, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .get_by_key(key)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<ContentNode>, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .get_many(ids)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    pub(crate) async fn get_paged(
        &self,
        query: &ContentQuery,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>, ContentServiceError> {
        if page_size == 0 {
            return Err(ContentServiceError::invalid_argument(
                "Page size must be greater than 0",
            ));
        }
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .get_page(query, page_index, page_size, filter, ordering)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    pub(crate) async fn count(&self, query: &ContentQuery) -> Result<usize, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .count(query)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    /// Versions of a node, newest first
    pub async fn get_versions(
        &self,
        id: i64,
    ) -> Result<Vec<ContentVersion>, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .get_versions(id)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    pub async fn get_version(
        &self,
        version_id: i64,
    ) -> Result<Option<ContentVersion>, ContentServiceError> {
        let mut scope = self.read_scope().await;
        let outcome = self
            .repository
            .get_version(version_id)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "publishing_core_test.rs"]
mod publishing_core_test;
