//! ContentRepository Trait - Storage Abstraction for the Content Tree
//!
//! The services depend only on this trait, never on a storage engine. One
//! repository instance stores one kind of content (documents or elements).
//!
//! # Design Decisions
//!
//! 1. **Async-First**: all methods are async so network-backed stores fit
//! 2. **Error Handling**: uses `anyhow::Result` for flexible error context
//! 3. **Tree Maintenance**: `save` assigns identity, path, level and sort order
//!    to nodes without identity; for existing nodes the caller owns the tree
//!    fields (moves rewrite them explicitly)
//! 4. **Publication**: `save` resolves a transient `Publishing`/`Unpublishing`
//!    state into the persisted one and records a version
//! 5. **Transactions**: callers holding a write lock open a transaction;
//!    dropping or rolling it back restores the state it started from
//!
//! # Examples
//!
//! ```rust
//! use contenttree_core::db::{ContentRepository, MemoryContentRepository};
//! use contenttree_core::models::{ContentNode, ContentType, ContentVariation, ROOT_ID};
//!
//! # tokio_test::block_on(async {
//! let repository = MemoryContentRepository::new();
//! let page = ContentType::new("page", "Page", ContentVariation::Nothing);
//!
//! let mut home = ContentNode::new("Home", ROOT_ID, &page, -1);
//! repository.save(&mut home, -1).await?;
//!
//! assert!(home.has_identity());
//! assert_eq!(home.path, format!("-1,{}", home.id));
//! assert_eq!(home.level, 1);
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```

use crate::models::{
    ContentNode, ContentQuery, ContentVersion, EntityPermissionSet, Ordering, Page,
};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// An open repository transaction
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait RepositoryTransaction: Send + Sync {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    //
    // TRANSACTIONS
    //

    async fn begin_transaction(&self) -> Result<Box<dyn RepositoryTransaction>>;

    //
    // READS
    //

    async fn get(&self, id: i64) -> Result<Option<ContentNode>>;

    async fn get_by_key(&self, key: Uuid) -> Result<Option<ContentNode>>;

    /// Nodes for the given ids, in the order the ids were given (missing ids skipped)
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<ContentNode>>;

    /// Every node matching the query, ordered by path
    async fn query(&self, query: &ContentQuery) -> Result<Vec<ContentNode>>;

    /// One page of the nodes matching `query` (and `filter`, when given)
    ///
    /// # Arguments
    ///
    /// * `page_index` - zero-based page number
    /// * `page_size` - maximum number of nodes per page
    ///
    /// # Returns
    ///
    /// The page items plus the total number of matching nodes
    async fn get_page(
        &self,
        query: &ContentQuery,
        page_index: usize,
        page_size: usize,
        filter: Option<&ContentQuery>,
        ordering: Ordering,
    ) -> Result<Page<ContentNode>>;

    async fn count(&self, query: &ContentQuery) -> Result<usize>;

    /// Sort order for a node appended under `parent_id`
    async fn next_child_sort_order(&self, parent_id: i64) -> Result<i32>;

    /// Whether every ancestor of `node` is published
    ///
    /// Nodes directly under the root have a published path; trashed nodes
    /// never do.
    async fn is_path_published(&self, node: &ContentNode) -> Result<bool>;

    //
    // WRITES
    //

    /// Persist a node and record a new version
    ///
    /// # Errors
    ///
    /// Returns error if a new node's parent does not exist
    async fn save(&self, node: &mut ContentNode, user_id: i64) -> Result<()>;

    /// Remove one node with its versions and permissions (no cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    //
    // VERSIONS
    //

    /// Versions of a node, newest first
    async fn get_versions(&self, content_id: i64) -> Result<Vec<ContentVersion>>;

    async fn get_version(&self, version_id: i64) -> Result<Option<ContentVersion>>;

    //
    // PERMISSIONS
    //

    async fn get_permissions(&self, entity_id: i64) -> Result<EntityPermissionSet>;

    /// Replace every explicit permission on the entity
    async fn replace_permissions(&self, permissions: EntityPermissionSet) -> Result<()>;

    /// Grant one verb on an entity to each of the given groups
    async fn assign_permission(&self, verb: &str, group_ids: &[i64], entity_id: i64)
        -> Result<()>;
}
