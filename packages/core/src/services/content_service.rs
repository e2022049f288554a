//! Content Service
//!
//! Operations on the document tree. Save, publish, unpublish, delete and the
//! branch cascade come from [`PublishingCore`]; this service adds what only
//! hierarchical content has: moves, the recycle bin, copies, sorting,
//! rollback, tree reads and permissions.
//!
//! # Descendant cascades
//!
//! Moves and deletes shrink the set they page over, so they always read page
//! 0 until the remaining total fits in one page. Copies page the original's
//! descendants by index instead, since the set they read only grows.

use crate::config::ContentServiceConfig;
use crate::db::{ContentRepository, DomainEvent, TreeChange, TreeChangeKind};
use crate::models::{
    AuditEntry, AuditType, ContentNode, ContentQuery, ContentVersion, EntityPermissionSet,
    EventMessages, OperationResult, Ordering, Page, PublishBranchFilter, PublishResult,
    PublishedState, RECYCLE_BIN_ID, RECYCLE_BIN_PATH, ROOT_ID,
};
use crate::notifications::{
    CopiedNotification, CopyingNotification, DeletingNotification,
    EmptiedRecycleBinNotification, EmptyingRecycleBinNotification, MoveEventInfo,
    MovedNotification, MovedToRecycleBinNotification, MovingNotification,
    MovingToRecycleBinNotification, PublishedNotification, RolledBackNotification,
    RollingBackNotification, SavedNotification, SavingNotification, SortedNotification,
    SortingNotification,
};
use crate::scoping::Scope;
use crate::services::context::ContentServiceContext;
use crate::services::error::ContentServiceError;
use crate::services::kinds::{ContentKind, Document};
use crate::services::publishing_core::PublishingCore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Service for the document tree
///
/// # Example
///
/// ```
/// use contenttree_core::db::{ContentTypeRepository, MemoryContentRepository};
/// use contenttree_core::{
///     ContentService, ContentServiceConfig, ContentServiceContext, ContentType,
///     ContentVariation, ROOT_ID, SUPER_USER_ID,
/// };
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let context = ContentServiceContext::in_memory(ContentServiceConfig::default()).unwrap();
/// let mut page = ContentType::new("page", "Page", ContentVariation::Nothing);
/// context.content_types.save(&mut page).await.unwrap();
///
/// let service = ContentService::new(Arc::new(MemoryContentRepository::new()), context);
/// let mut home = service
///     .create_and_save("Home", ROOT_ID, "page", SUPER_USER_ID)
///     .await
///     .unwrap();
/// let result = service.publish(&mut home, &["*"], SUPER_USER_ID).await.unwrap();
///
/// assert!(result.success());
/// assert!(home.published);
/// # });
/// ```
#[derive(Clone)]
pub struct ContentService {
    core: PublishingCore<Document>,
}

impl ContentService {
    pub fn new(repository: Arc<dyn ContentRepository>, context: ContentServiceContext) -> Self {
        Self {
            core: PublishingCore::new(repository, context),
        }
    }

    fn repository(&self) -> &Arc<dyn ContentRepository> {
        self.core.repository()
    }

    /// Shared repositories, bus and configuration
    pub fn context(&self) -> &ContentServiceContext {
        self.core.context()
    }

    fn config(&self) -> &ContentServiceConfig {
        &self.core.context().config
    }

    /// Subscribe to committed tree changes
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.core.context().scopes.subscribe_to_events()
    }

    /// Committed tree changes as a stream
    pub fn event_stream(&self) -> impl Stream<Item = DomainEvent> + Send + 'static {
        self.core.context().scopes.event_stream()
    }

    //
    // CREATE / SAVE / PUBLISH
    //

    /// Build a document without saving it
    pub async fn create(
        &self,
        name: &str,
        parent_id: i64,
        content_type_alias: &str,
        user_id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        self.core
            .create(name, parent_id, content_type_alias, user_id)
            .await
    }

    /// Build and save a document
    ///
    /// The node comes back without identity when a handler cancelled the save.
    pub async fn create_and_save(
        &self,
        name: &str,
        parent_id: i64,
        content_type_alias: &str,
        user_id: i64,
    ) -> Result<ContentNode, ContentServiceError> {
        let mut node = self
            .core
            .create(name, parent_id, content_type_alias, user_id)
            .await?;
        self.core.save(&mut node, user_id).await?;
        Ok(node)
    }

    pub async fn save(
        &self,
        node: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        self.core.save(node, user_id).await
    }

    pub async fn publish(
        &self,
        node: &mut ContentNode,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        self.core.publish(node, cultures, user_id).await
    }

    pub async fn unpublish(
        &self,
        node: &mut ContentNode,
        culture: Option<&str>,
        user_id: i64,
    ) -> Result<PublishResult, ContentServiceError> {
        self.core.unpublish(node, culture, user_id).await
    }

    pub async fn publish_branch(
        &self,
        root: &mut ContentNode,
        filter: PublishBranchFilter,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<Vec<PublishResult>, ContentServiceError> {
        self.core
            .publish_branch(root, filter, cultures, user_id)
            .await
    }

    //
    // MOVE
    //

    /// Move a node (and its subtree) under another parent
    ///
    /// Moving to `-20` is a move to the recycle bin. A trashed node that still
    /// has a published version comes back unpublished.
    pub async fn move_node(
        &self,
        node: &mut ContentNode,
        parent_id: i64,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        if node.parent_id == parent_id {
            return Ok(OperationResult::succeed(EventMessages::new()));
        }
        if parent_id == RECYCLE_BIN_ID {
            return self.move_to_recycle_bin(node, user_id).await;
        }

        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let messages = scope.messages();

            let parent = if parent_id == ROOT_ID {
                None
            } else {
                match self.repository().get(parent_id).await? {
                    Some(parent) if !parent.trashed => Some(parent),
                    _ => return Err(ContentServiceError::invalid_parent(parent_id)),
                }
            };
            if let Some(parent) = &parent {
                if node.is_ancestor_or_self_of_path(&parent.path) {
                    return Err(ContentServiceError::invalid_operation(format!(
                        "Cannot move {} below itself",
                        node.id
                    )));
                }
            }

            let mut moving = MovingNotification::<Document>::new(
                vec![MoveEventInfo {
                    entity: node.clone(),
                    original_path: node.path.clone(),
                    new_parent_id: parent_id,
                }],
                messages.clone(),
            );
            if scope.publish_cancelable(&mut moving).await {
                warn!("Move of document {} cancelled by a handler", node.id);
                return Ok(OperationResult::cancel(messages));
            }

            let trash = if node.trashed { Some(false) } else { None };
            if node.trashed && node.published {
                // restored content is never live until republished
                node.published_state = PublishedState::Unpublishing;
            }

            let moves = self
                .perform_move_locked(node, parent_id, parent.as_ref(), user_id, trash)
                .await?;

            scope.tree_changed::<Document>(vec![TreeChange::new(
                node.id,
                node.key,
                TreeChangeKind::RefreshBranch,
            )]);
            scope.notify(
                MovedNotification::<Document>::new(moves, messages.clone())
                    .with_state_from(&moving),
            );
            scope.audit(AuditEntry::new(
                AuditType::Move,
                user_id,
                node.id,
                Document::NAME,
            ));
            scope.complete();
            info!("Moved document {} under {}", node.id, parent_id);
            Ok::<_, ContentServiceError>(OperationResult::succeed(messages))
        }
        .await;
        scope.finish(outcome).await
    }

    /// Move a node and its subtree to the recycle bin
    ///
    /// The published flag is kept: trashed content is hidden, not unpublished.
    pub async fn move_to_recycle_bin(
        &self,
        node: &mut ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let messages = scope.messages();

            if node.parent_id == RECYCLE_BIN_ID {
                return Ok(OperationResult::no_operation(messages));
            }

            let mut moving = MovingToRecycleBinNotification::<Document>::new(
                vec![MoveEventInfo {
                    entity: node.clone(),
                    original_path: node.path.clone(),
                    new_parent_id: RECYCLE_BIN_ID,
                }],
                messages.clone(),
            );
            if scope.publish_cancelable(&mut moving).await {
                warn!("Trashing of document {} cancelled by a handler", node.id);
                return Ok(OperationResult::cancel(messages));
            }

            let moves = self
                .perform_move_locked(node, RECYCLE_BIN_ID, None, user_id, Some(true))
                .await?;

            scope.tree_changed::<Document>(vec![TreeChange::new(
                node.id,
                node.key,
                TreeChangeKind::RefreshBranch,
            )]);
            scope.notify(
                MovedToRecycleBinNotification::<Document>::new(moves, messages.clone())
                    .with_state_from(&moving),
            );
            scope.audit(
                AuditEntry::new(AuditType::Move, user_id, node.id, Document::NAME)
                    .with_comment("Moved to recycle bin"),
            );
            scope.complete();
            info!("Moved document {} to the recycle bin", node.id);
            Ok::<_, ContentServiceError>(OperationResult::succeed(messages))
        }
        .await;
        scope.finish(outcome).await
    }

    /// Re-parent `node` and rewrite the path and level of every descendant
    async fn perform_move_locked(
        &self,
        node: &mut ContentNode,
        parent_id: i64,
        parent: Option<&ContentNode>,
        user_id: i64,
        trash: Option<bool>,
    ) -> Result<Vec<MoveEventInfo>, ContentServiceError> {
        let (parent_path, parent_level) = match parent {
            Some(parent) => (parent.path.clone(), parent.level),
            None if parent_id == RECYCLE_BIN_ID => (RECYCLE_BIN_PATH.to_string(), 0),
            None => (ROOT_ID.to_string(), 0),
        };
        let level_delta = 1 - node.level + parent_level;
        let original_path = node.path.clone();

        node.sort_order = self.repository().next_child_sort_order(parent_id).await?;
        node.parent_id = parent_id;
        node.path = format!("{},{}", parent_path, node.id);
        node.level += level_delta;
        if let Some(trashed) = trash {
            node.trashed = trashed;
        }
        self.repository().save(node, user_id).await?;

        let mut moves = vec![MoveEventInfo {
            entity: node.clone(),
            original_path: original_path.clone(),
            new_parent_id: parent_id,
        }];
        let mut paths: HashMap<i64, String> = HashMap::new();
        paths.insert(node.id, node.path.clone());

        let query = ContentQuery::default().descendants_of(&original_path);
        let page_size = self.config().move_page_size;
        loop {
            // moved nodes drop out of the query, so page 0 is always the next batch
            let page = self
                .repository()
                .get_page(&query, 0, page_size, None, Ordering::PathAscending)
                .await?;

            for mut descendant in page.items {
                let parent_path = paths.get(&descendant.parent_id).cloned().ok_or_else(|| {
                    ContentServiceError::invalid_operation(format!(
                        "Parent {} of {} was not moved first",
                        descendant.parent_id, descendant.id
                    ))
                })?;
                let original_path = descendant.path.clone();

                descendant.path = format!("{},{}", parent_path, descendant.id);
                descendant.level += level_delta;
                if let Some(trashed) = trash {
                    descendant.trashed = trashed;
                }
                self.repository().save(&mut descendant, user_id).await?;
                debug!("Moved {} from {} to {}", descendant.id, original_path, descendant.path);

                paths.insert(descendant.id, descendant.path.clone());
                let new_parent_id = descendant.parent_id;
                moves.push(MoveEventInfo {
                    entity: descendant,
                    original_path,
                    new_parent_id,
                });
            }

            if page.total <= page_size {
                break;
            }
        }

        Ok(moves)
    }

    //
    // COPY
    //

    /// Copy a node (and optionally its subtree) under `parent_id`
    ///
    /// Returns `None` when a handler cancelled copying the node itself;
    /// nothing is written then. Cancelling a descendant skips that descendant
    /// and its subtree only. Copies are never published.
    pub async fn copy(
        &self,
        original: &ContentNode,
        parent_id: i64,
        relate_to_original: bool,
        recursive: bool,
        user_id: i64,
    ) -> Result<Option<ContentNode>, ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            let messages = scope.messages();

            let mut copy = original.deep_clone_with_reset_identity();
            copy.parent_id = parent_id;
            let mut copying =
                CopyingNotification::<Document>::new(original.clone(), copy, parent_id, messages.clone());
            if scope.publish_cancelable(&mut copying).await {
                warn!("Copy of document {} cancelled by a handler", original.id);
                return Ok(None);
            }
            let mut copy = copying.copy;

            scope.write_lock(Document::LOCK).await?;

            let trashed = if parent_id == ROOT_ID {
                false
            } else {
                match self.repository().get(parent_id).await? {
                    Some(parent) => parent.trashed,
                    None => return Err(ContentServiceError::invalid_parent(parent_id)),
                }
            };

            prepare_copy(&mut copy, user_id, trashed);
            let permissions = self.repository().get_permissions(original.id).await?;
            self.repository().save(&mut copy, user_id).await?;
            if !permissions.is_empty() {
                self.repository()
                    .replace_permissions(permissions.retarget(copy.id))
                    .await?;
            }

            let mut copies = vec![(original.clone(), copy.clone())];
            if recursive {
                self.copy_descendants_locked(
                    &mut scope,
                    original,
                    &copy,
                    user_id,
                    &messages,
                    &mut copies,
                )
                .await?;
            }

            scope.tree_changed::<Document>(vec![TreeChange::new(
                copy.id,
                copy.key,
                TreeChangeKind::RefreshBranch,
            )]);
            let copied = copies.len();
            for (source, target) in copies {
                let target_parent = target.parent_id;
                scope.notify(CopiedNotification::<Document>::new(
                    source,
                    target,
                    target_parent,
                    relate_to_original,
                    messages.clone(),
                ));
            }
            scope.audit(AuditEntry::new(
                AuditType::Copy,
                user_id,
                original.id,
                Document::NAME,
            ));
            scope.complete();
            info!(
                "Copied document {} to {} ({} nodes)",
                original.id, copy.id, copied
            );
            Ok::<_, ContentServiceError>(Some(copy))
        }
        .await;
        scope.finish(outcome).await
    }

    async fn copy_descendants_locked(
        &self,
        scope: &mut Scope,
        original: &ContentNode,
        copy: &ContentNode,
        user_id: i64,
        messages: &EventMessages,
        copies: &mut Vec<(ContentNode, ContentNode)>,
    ) -> Result<(), ContentServiceError> {
        let mut id_map: HashMap<i64, i64> = HashMap::new();
        id_map.insert(original.id, copy.id);
        let mut copy_ids: HashSet<i64> = HashSet::new();
        copy_ids.insert(copy.id);

        let query = ContentQuery::default().descendants_of(&original.path);
        let page_size = self.config().copy_page_size;
        let mut page_index = 0;

        loop {
            let page = self
                .repository()
                .get_page(&query, page_index, page_size, None, Ordering::PathAscending)
                .await?;
            let total = page.total;

            for descendant in page.items {
                // copies made into the original's own subtree show up here too
                if copy_ids.contains(&descendant.id) || id_map.contains_key(&descendant.id) {
                    continue;
                }
                let new_parent_id = match id_map.get(&descendant.parent_id) {
                    Some(id) => *id,
                    None => {
                        debug!("Skipping {}: its parent was not copied", descendant.id);
                        continue;
                    }
                };

                let mut descendant_copy = descendant.deep_clone_with_reset_identity();
                descendant_copy.parent_id = new_parent_id;
                let mut copying = CopyingNotification::<Document>::new(
                    descendant.clone(),
                    descendant_copy,
                    new_parent_id,
                    messages.clone(),
                );
                if scope.publish_cancelable(&mut copying).await {
                    debug!("Copy of descendant {} cancelled by a handler", descendant.id);
                    continue;
                }
                let mut descendant_copy = copying.copy;

                prepare_copy(&mut descendant_copy, user_id, copy.trashed);
                self.repository().save(&mut descendant_copy, user_id).await?;

                id_map.insert(descendant.id, descendant_copy.id);
                copy_ids.insert(descendant_copy.id);
                copies.push((descendant, descendant_copy));
            }

            page_index += 1;
            if page_index * page_size >= total {
                break;
            }
        }

        Ok(())
    }

    //
    // DELETE
    //

    pub async fn delete(
        &self,
        node: &ContentNode,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        self.core.delete(node, user_id).await
    }

    /// Permanently delete everything in the recycle bin
    pub async fn empty_recycle_bin(
        &self,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let messages = scope.messages();

            let contents = self
                .repository()
                .query(&ContentQuery::default().children_of(RECYCLE_BIN_ID))
                .await?;

            let mut emptying =
                EmptyingRecycleBinNotification::<Document>::new(contents.clone(), messages.clone());
            let mut deleting =
                DeletingNotification::<Document>::new(contents.clone(), messages.clone());
            if scope.publish_cancelable(&mut emptying).await
                || scope.publish_cancelable(&mut deleting).await
            {
                warn!("Emptying the recycle bin was cancelled by a handler");
                return Ok(OperationResult::cancel(messages));
            }

            let mut deleted = Vec::new();
            for content in contents {
                if self.core.is_delete_blocked(content.id).await? {
                    debug!("Keeping referenced document {} in the recycle bin", content.id);
                    continue;
                }
                self.core.delete_locked(&mut scope, &content).await?;
                deleted.push(content);
            }

            scope.tree_changed::<Document>(
                deleted
                    .iter()
                    .map(|d| TreeChange::new(d.id, d.key, TreeChangeKind::Remove))
                    .collect(),
            );
            scope.notify(
                EmptiedRecycleBinNotification::<Document>::new(deleted, messages.clone())
                    .with_state_from(&emptying),
            );
            scope.audit(
                AuditEntry::new(AuditType::Delete, user_id, RECYCLE_BIN_ID, Document::NAME)
                    .with_comment("Recycle bin emptied"),
            );
            scope.complete();
            info!("Emptied the recycle bin");
            Ok::<_, ContentServiceError>(OperationResult::succeed(messages))
        }
        .await;
        scope.finish(outcome).await
    }

    //
    // SORT
    //

    /// Give `nodes` the sort orders 0, 1, 2... in the order given
    ///
    /// Only nodes whose sort order actually changes are saved.
    pub async fn sort(
        &self,
        nodes: Vec<ContentNode>,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        if nodes.is_empty() {
            return Ok(OperationResult::no_operation(EventMessages::new()));
        }

        let mut nodes = nodes;
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let result = self.sort_locked(&mut scope, &mut nodes, user_id).await?;
            if result.success() {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    /// Sort the nodes with these ids, in this order
    pub async fn sort_by_ids(
        &self,
        ids: &[i64],
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        if ids.is_empty() {
            return Ok(OperationResult::no_operation(EventMessages::new()));
        }

        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let mut nodes = self.repository().get_many(ids).await?;
            let result = self.sort_locked(&mut scope, &mut nodes, user_id).await?;
            if result.success() {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    async fn sort_locked(
        &self,
        scope: &mut Scope,
        nodes: &mut [ContentNode],
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let messages = scope.messages();

        let mut sorting = SortingNotification::<Document>::new(nodes.to_vec(), messages.clone());
        if scope.publish_cancelable(&mut sorting).await {
            return Ok(OperationResult::cancel(messages));
        }
        let mut saving = SavingNotification::<Document>::new(nodes.to_vec(), messages.clone());
        if scope.publish_cancelable(&mut saving).await {
            return Ok(OperationResult::cancel(messages));
        }

        let mut saved = Vec::new();
        let mut published = Vec::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            let sort_order = index as i32;
            if node.sort_order == sort_order {
                continue;
            }

            node.sort_order = sort_order;
            self.repository().save(node, user_id).await?;
            scope.audit(
                AuditEntry::new(AuditType::Sort, user_id, node.id, Document::NAME)
                    .with_comment("Sorting content performed by user"),
            );
            if node.published {
                published.push(node.clone());
            }
            saved.push(node.clone());
        }
        debug!("Sort saved {} of {} nodes", saved.len(), nodes.len());

        scope.notify(
            SavedNotification::<Document>::new(nodes.to_vec(), messages.clone())
                .with_state_from(&saving),
        );
        scope.notify(
            SortedNotification::<Document>::new(nodes.to_vec(), messages.clone())
                .with_state_from(&sorting),
        );
        scope.tree_changed::<Document>(
            saved
                .iter()
                .map(|n| TreeChange::new(n.id, n.key, TreeChangeKind::RefreshNode))
                .collect(),
        );
        if !published.is_empty() {
            scope.notify(PublishedNotification::<Document>::new(
                published,
                messages.clone(),
            ));
        }

        Ok(OperationResult::succeed(messages))
    }

    //
    // ROLLBACK
    //

    /// Restore the values of an earlier version as a new draft
    ///
    /// `culture` limits the rollback to one culture; `None` restores all.
    pub async fn rollback(
        &self,
        id: i64,
        version_id: i64,
        culture: Option<&str>,
        user_id: i64,
    ) -> Result<OperationResult, ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            let messages = scope.messages();

            let content = self.repository().get(id).await?;
            let version = self.repository().get_version(version_id).await?;
            let (mut content, version): (ContentNode, ContentVersion) = match (content, version) {
                (Some(content), Some(version))
                    if !content.trashed && version.content_id == content.id =>
                {
                    (content, version)
                }
                _ => return Ok(OperationResult::cannot(messages)),
            };

            let mut rolling_back =
                RollingBackNotification::<Document>::new(content.clone(), messages.clone());
            if scope.publish_cancelable(&mut rolling_back).await {
                return Ok(OperationResult::cancel(messages));
            }

            content.copy_values_from(&version.content, culture);
            let result = self
                .core
                .save_locked(&mut scope, &mut content, user_id)
                .await?;
            if !result.success() {
                error!(
                    "User {} was unable to roll back document {} to version {}",
                    user_id, id, version_id
                );
                return Ok(result);
            }

            scope.audit(
                AuditEntry::new(AuditType::RollBack, user_id, id, Document::NAME).with_comment(
                    format!(
                        "Content '{}' was rolled back to version '{}'",
                        content.name().unwrap_or_default(),
                        version_id
                    ),
                ),
            );
            scope.notify(
                RolledBackNotification::<Document>::new(content, messages.clone())
                    .with_state_from(&rolling_back),
            );
            scope.complete();
            info!(
                "User {} rolled back document {} to version {}",
                user_id, id, version_id
            );
            Ok::<_, ContentServiceError>(result)
        }
        .await;
        scope.finish(outcome).await
    }

    //
    // READS
    //

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ContentNode>, ContentServiceError> {
        self.core.get_by_id(id).await
    }

    pub async fn get_by_key(&self, key: Uuid) -> Result<Option<ContentNode>, ContentServiceError> {
        self.core.get_by_key(key).await
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<ContentNode>, ContentServiceError> {
        self.core.get_by_ids(ids).await
    }

    pub async fn get_paged_children(
        &self,
        id: i64,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>, ContentServiceError> {
        self.core
            .get_paged(
                &ContentQuery::default().children_of(id),
                page_index,
                page_size,
                filter,
                ordering,
            )
            .await
    }

    /// Descendants of `id`; `-1` pages over the whole tree
    pub async fn get_paged_descendants(
        &self,
        id: i64,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>, ContentServiceError> {
        let path = if id == ROOT_ID {
            ROOT_ID.to_string()
        } else {
            match self.core.get_by_id(id).await? {
                Some(node) => node.path,
                None => return Ok(Page::empty()),
            }
        };
        self.core
            .get_paged(
                &ContentQuery::default().descendants_of(&path),
                page_index,
                page_size,
                filter,
                ordering,
            )
            .await
    }

    /// Ancestors of a node, root-most first
    pub async fn get_ancestors(
        &self,
        node: &ContentNode,
    ) -> Result<Vec<ContentNode>, ContentServiceError> {
        let ids: Vec<i64> = node
            .ancestor_ids()
            .into_iter()
            .filter(|id| *id != RECYCLE_BIN_ID)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.core.get_by_ids(&ids).await
    }

    pub async fn get_paged_recycle_bin(
        &self,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>, ContentServiceError> {
        self.core
            .get_paged(
                &ContentQuery::default().descendants_of(RECYCLE_BIN_PATH),
                page_index,
                page_size,
                filter,
                ordering,
            )
            .await
    }

    pub async fn has_children(&self, id: i64) -> Result<bool, ContentServiceError> {
        Ok(self.count_children(id, None).await? > 0)
    }

    pub async fn count_children(
        &self,
        id: i64,
        content_type_alias: Option<&str>,
    ) -> Result<usize, ContentServiceError> {
        let mut query = ContentQuery::default().children_of(id);
        if let Some(alias) = content_type_alias {
            query = query.of_type(alias);
        }
        self.core.count(&query).await
    }

    pub async fn count_descendants(
        &self,
        id: i64,
        content_type_alias: Option<&str>,
    ) -> Result<usize, ContentServiceError> {
        let node = self
            .core
            .get_by_id(id)
            .await?
            .ok_or_else(|| ContentServiceError::not_found(Document::NAME, id))?;
        let mut query = ContentQuery::default().descendants_of(&node.path);
        if let Some(alias) = content_type_alias {
            query = query.of_type(alias);
        }
        self.core.count(&query).await
    }

    /// Whether every ancestor is published, so the node could go live
    pub async fn is_path_publishable(
        &self,
        node: &ContentNode,
    ) -> Result<bool, ContentServiceError> {
        if node.parent_id == ROOT_ID {
            return Ok(true);
        }
        if node.trashed {
            return Ok(false);
        }
        let mut scope = self.core.read_scope().await;
        let outcome = self
            .repository()
            .is_path_published(node)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    /// Whether the node and every ancestor are published
    pub async fn is_path_published(&self, node: &ContentNode) -> Result<bool, ContentServiceError> {
        if !node.published {
            return Ok(false);
        }
        let mut scope = self.core.read_scope().await;
        let outcome = self
            .repository()
            .is_path_published(node)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
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

    //
    // PERMISSIONS
    //

    pub async fn get_permissions(
        &self,
        node: &ContentNode,
    ) -> Result<EntityPermissionSet, ContentServiceError> {
        let mut scope = self.core.read_scope().await;
        let outcome = self
            .repository()
            .get_permissions(node.id)
            .await
            .map_err(ContentServiceError::from);
        scope.complete();
        scope.finish(outcome).await
    }

    /// Replace every explicit permission of the set's entity
    pub async fn set_permissions(
        &self,
        permissions: EntityPermissionSet,
    ) -> Result<(), ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            self.repository().replace_permissions(permissions).await?;
            scope.complete();
            Ok::<_, ContentServiceError>(())
        }
        .await;
        scope.finish(outcome).await
    }

    /// Grant one permission verb on a node to some user groups
    pub async fn set_permission(
        &self,
        node: &ContentNode,
        verb: &str,
        group_ids: &[i64],
        user_id: i64,
    ) -> Result<(), ContentServiceError> {
        let mut scope = self.core.create_scope();
        let outcome = async {
            scope.write_lock(Document::LOCK).await?;
            self.repository()
                .assign_permission(verb, group_ids, node.id)
                .await?;
            scope.audit(
                AuditEntry::new(AuditType::AssignPermission, user_id, node.id, Document::NAME)
                    .with_parameters(verb),
            );
            scope.complete();
            Ok::<_, ContentServiceError>(())
        }
        .await;
        scope.finish(outcome).await
    }
}

/// Reset a fresh copy for its new owner and position
fn prepare_copy(copy: &mut ContentNode, user_id: i64, trashed: bool) {
    copy.strip_published_state();
    copy.creator_id = user_id;
    copy.writer_id = user_id;
    copy.trashed = trashed;
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "content_service_test.rs"]
mod content_service_test;
