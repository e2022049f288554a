//! In-Memory Content Repository
//!
//! Keeps nodes, versions and permissions in ordered maps behind one lock.
//! Transactions snapshot the whole state when they begin and put the
//! snapshot back on rollback (or when dropped without commit), so a scope
//! that fails half-way leaves nothing behind.

use crate::db::content_repository::{ContentRepository, RepositoryTransaction};
use crate::db::error::RepositoryError;
use crate::models::{
    ContentNode, ContentQuery, ContentVersion, EntityPermission, EntityPermissionSet, Ordering,
    Page, RECYCLE_BIN_ID, RECYCLE_BIN_LEVEL, RECYCLE_BIN_PATH, ROOT_ID,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

/// First id handed out to new nodes
const FIRST_NODE_ID: i64 = 1000;

#[derive(Debug, Clone)]
struct ContentState {
    nodes: BTreeMap<i64, ContentNode>,
    keys: HashMap<Uuid, i64>,
    versions: BTreeMap<i64, ContentVersion>,
    permissions: HashMap<i64, EntityPermissionSet>,
    next_id: i64,
    next_version_id: i64,
}

impl Default for ContentState {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            keys: HashMap::new(),
            versions: BTreeMap::new(),
            permissions: HashMap::new(),
            next_id: FIRST_NODE_ID,
            next_version_id: 1,
        }
    }
}

impl ContentState {
    /// Path and level of a (possibly virtual) parent
    fn parent_position(&self, parent_id: i64) -> Option<(String, i32)> {
        match parent_id {
            ROOT_ID => Some((ROOT_ID.to_string(), 0)),
            RECYCLE_BIN_ID => Some((RECYCLE_BIN_PATH.to_string(), RECYCLE_BIN_LEVEL)),
            id => self.nodes.get(&id).map(|p| (p.path.clone(), p.level)),
        }
    }

    fn next_child_sort_order(&self, parent_id: i64) -> i32 {
        self.nodes
            .values()
            .filter(|n| n.parent_id == parent_id)
            .map(|n| n.sort_order + 1)
            .max()
            .unwrap_or(0)
    }

    fn matching<'a>(
        &'a self,
        query: &'a ContentQuery,
        filter: Option<&'a ContentQuery>,
    ) -> impl Iterator<Item = &'a ContentNode> + 'a {
        self.nodes
            .values()
            .filter(move |n| query.matches(n) && filter.map(|f| f.matches(n)).unwrap_or(true))
    }
}

/// Content repository backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryContentRepository {
    state: Arc<RwLock<ContentState>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes (trashed included)
    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, ContentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Snapshot-based transaction over a [`MemoryContentRepository`]
struct MemoryTransaction {
    state: Arc<RwLock<ContentState>>,
    snapshot: Option<ContentState>,
}

impl MemoryTransaction {
    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = snapshot;
            debug!("Restored content snapshot");
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.restore();
    }
}

#[async_trait]
impl RepositoryTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.restore();
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn RepositoryTransaction>> {
        let snapshot = self.read().clone();
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            snapshot: Some(snapshot),
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<ContentNode>> {
        Ok(self.read().nodes.get(&id).cloned())
    }

    async fn get_by_key(&self, key: Uuid) -> Result<Option<ContentNode>> {
        let state = self.read();
        Ok(state
            .keys
            .get(&key)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<ContentNode>> {
        let state = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .cloned()
            .collect())
    }

    async fn query(&self, query: &ContentQuery) -> Result<Vec<ContentNode>> {
        let state = self.read();
        let mut nodes: Vec<ContentNode> = state.matching(query, None).cloned().collect();
        nodes.sort_by(|a, b| Ordering::PathAscending.compare(a, b));
        Ok(nodes)
    }

    async fn get_page(
        &self,
        query: &ContentQuery,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>> {
        let state = self.read();
        let mut nodes: Vec<&ContentNode> = state.matching(query, filter).collect();
        nodes.sort_by(|a, b| ordering.compare(a, b));

        let total = nodes.len();
        let items = nodes
            .into_iter()
            .skip(page_index.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Ok(Page { items, total })
    }

    async fn count(&self, query: &ContentQuery) -> Result<usize> {
        Ok(self.read().matching(query, None).count())
    }

    async fn next_child_sort_order(&self, parent_id: i64) -> Result<i32> {
        Ok(self.read().next_child_sort_order(parent_id))
    }

    async fn is_path_published(&self, node: &ContentNode) -> Result<bool> {
        if node.trashed || node.path.starts_with(RECYCLE_BIN_PATH) {
            return Ok(false);
        }
        if node.parent_id == ROOT_ID {
            return Ok(true);
        }

        let state = self.read();
        let ancestors = if node.path.is_empty() {
            // not saved yet: walk up from the parent
            match state.nodes.get(&node.parent_id) {
                Some(parent) => {
                    let mut ids = parent.ancestor_ids();
                    ids.push(parent.id);
                    ids
                }
                None => return Ok(false),
            }
        } else {
            node.ancestor_ids()
        };

        Ok(ancestors.iter().all(|id| {
            state
                .nodes
                .get(id)
                .map(|ancestor| ancestor.published)
                .unwrap_or(false)
        }))
    }

    async fn save(&self, node: &mut ContentNode, user_id: i64) -> Result<()> {
        let mut state = self.write();
        let now = Utc::now();

        if !node.has_identity() {
            let (parent_path, parent_level) = state
                .parent_position(node.parent_id)
                .ok_or_else(|| RepositoryError::missing_parent("content", node.parent_id))?;
            if state.keys.contains_key(&node.key) {
                return Err(RepositoryError::duplicate_key("content", node.key).into());
            }

            let id = state.next_id;
            state.next_id += 1;

            node.id = id;
            node.path = format!("{},{}", parent_path, id);
            node.level = parent_level + 1;
            node.sort_order = state.next_child_sort_order(node.parent_id);
            node.create_date = now;
            debug!("Assigned id {} at path {}", id, node.path);
        }

        let version_id = state.next_version_id;
        state.next_version_id += 1;

        node.version_id = version_id;
        node.writer_id = user_id;
        node.update_date = now;
        node.apply_pending_published_state(now);
        node.refresh_edited_state();
        node.reset_dirty();

        let mut stored = node.clone();
        stored.clear_pending_cultures();

        state.versions.insert(
            version_id,
            ContentVersion {
                version_id,
                content_id: node.id,
                version_date: now,
                user_id,
                published: node.published_version_id == Some(version_id),
                content: stored.clone(),
            },
        );
        state.keys.insert(stored.key, stored.id);
        state.nodes.insert(stored.id, stored);

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.write();
        let node = state
            .nodes
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("content", id))?;
        state.keys.remove(&node.key);
        state.versions.retain(|_, v| v.content_id != id);
        state.permissions.remove(&id);
        debug!("Deleted content {}", id);
        Ok(())
    }

    async fn get_versions(&self, content_id: i64) -> Result<Vec<ContentVersion>> {
        Ok(self
            .read()
            .versions
            .values()
            .rev()
            .filter(|v| v.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn get_version(&self, version_id: i64) -> Result<Option<ContentVersion>> {
        Ok(self.read().versions.get(&version_id).cloned())
    }

    async fn get_permissions(&self, entity_id: i64) -> Result<EntityPermissionSet> {
        Ok(self
            .read()
            .permissions
            .get(&entity_id)
            .cloned()
            .unwrap_or_else(|| EntityPermissionSet::new(entity_id, Vec::new())))
    }

    async fn replace_permissions(&self, permissions: EntityPermissionSet) -> Result<()> {
        let mut state = self.write();
        if permissions.is_empty() {
            state.permissions.remove(&permissions.entity_id);
        } else {
            state.permissions.insert(permissions.entity_id, permissions);
        }
        Ok(())
    }

    async fn assign_permission(
        &self,
        verb: &str,
        group_ids: &[i64],
        entity_id: i64,
    ) -> Result<()> {
        let mut state = self.write();
        let set = state
            .permissions
            .entry(entity_id)
            .or_insert_with(|| EntityPermissionSet::new(entity_id, Vec::new()));

        for group_id in group_ids {
            match set
                .permissions
                .iter_mut()
                .find(|p| p.user_group_id == *group_id)
            {
                Some(permission) => {
                    permission.verbs.insert(verb.to_string());
                }
                None => set
                    .permissions
                    .push(EntityPermission::new(*group_id, entity_id, [verb])),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, ContentVariation, SUPER_USER_ID};

    fn page_type() -> ContentType {
        ContentType::new("page", "Page", ContentVariation::Nothing)
    }

    async fn save_new(repo: &MemoryContentRepository, name: &str, parent_id: i64) -> ContentNode {
        let mut node = ContentNode::new(name, parent_id, &page_type(), SUPER_USER_ID);
        repo.save(&mut node, SUPER_USER_ID).await.unwrap();
        node
    }

    #[tokio::test]
    async fn test_save_assigns_tree_position() {
        let repo = MemoryContentRepository::new();
        let home = save_new(&repo, "Home", ROOT_ID).await;
        let about = save_new(&repo, "About", home.id).await;
        let contact = save_new(&repo, "Contact", home.id).await;

        assert_eq!(about.path, format!("{},{}", home.path, about.id));
        assert_eq!(about.level, 2);
        assert_eq!(about.sort_order, 0);
        assert_eq!(contact.sort_order, 1);
        assert!(!about.is_dirty());
    }

    #[tokio::test]
    async fn test_save_rejects_missing_parent() {
        let repo = MemoryContentRepository::new();
        let mut orphan = ContentNode::new("Orphan", 4242, &page_type(), SUPER_USER_ID);
        assert!(repo.save(&mut orphan, SUPER_USER_ID).await.is_err());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_paging_reports_total() {
        let repo = MemoryContentRepository::new();
        let home = save_new(&repo, "Home", ROOT_ID).await;
        for i in 0..5 {
            save_new(&repo, &format!("Child {}", i), home.id).await;
        }

        let query = ContentQuery::default().descendants_of(&home.path);
        let page = repo
            .get_page(&query, 1, 2, None, Ordering::PathAscending)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let repo = MemoryContentRepository::new();
        save_new(&repo, "Home", ROOT_ID).await;

        let tx = repo.begin_transaction().await.unwrap();
        save_new(&repo, "Scratch", ROOT_ID).await;
        assert_eq!(repo.len(), 2);
        tx.rollback().await.unwrap();
        assert_eq!(repo.len(), 1);

        let tx = repo.begin_transaction().await.unwrap();
        save_new(&repo, "Kept", ROOT_ID).await;
        tx.commit().await.unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let repo = MemoryContentRepository::new();
        {
            let _tx = repo.begin_transaction().await.unwrap();
            save_new(&repo, "Scratch", ROOT_ID).await;
        }
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_path_published_requires_published_ancestors() {
        let repo = MemoryContentRepository::new();
        let home = save_new(&repo, "Home", ROOT_ID).await;
        let child = save_new(&repo, "Child", home.id).await;

        assert!(repo.is_path_published(&home).await.unwrap());
        assert!(!repo.is_path_published(&child).await.unwrap());
    }

    #[tokio::test]
    async fn test_assign_permission_merges_verbs() {
        let repo = MemoryContentRepository::new();
        let home = save_new(&repo, "Home", ROOT_ID).await;

        repo.assign_permission("F", &[1, 2], home.id).await.unwrap();
        repo.assign_permission("U", &[1], home.id).await.unwrap();

        let set = repo.get_permissions(home.id).await.unwrap();
        assert_eq!(set.permissions.len(), 2);
        let group1 = set.permissions.iter().find(|p| p.user_group_id == 1).unwrap();
        assert!(group1.verbs.contains("F") && group1.verbs.contains("U"));
    }
}
