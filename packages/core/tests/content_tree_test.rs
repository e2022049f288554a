//! Content Tree Tests
//!
//! Moves, the recycle bin and copies exercised through the public services,
//! checking that every stored path and level still agrees with the tree and
//! that nothing leaks out of a scope that did not commit. Handlers of
//! "before" notifications may read through the services while the operation
//! holds the tree lock.

#[cfg(test)]
mod content_tree_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use contenttree_core::db::{
        AuditRepository, ContentRepository, ContentTypeRepository, MemoryContentRepository,
        TreeChange, TreeChangeKind,
    };
    use contenttree_core::notifications::{
        ContentCopyingNotification, ContentDeletedNotification, ContentMovingNotification,
        ContentPublishingNotification, ContentSavedNotification, ContentSavingNotification,
        ContentSortingNotification, NotificationHandler,
    };
    use contenttree_core::{
        ContentKind, ContentNode, ContentService, ContentServiceConfig, ContentServiceContext,
        ContentType, ContentVariation, Document, EventMessages, OperationResultType, Ordering,
        PublishBranchFilter, RECYCLE_BIN_ID, RECYCLE_BIN_PATH, ROOT_ID, SUPER_USER_ID,
    };
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::{Arc, Mutex};
    use tokio::time::{timeout, Duration};
    use tokio_stream::StreamExt;

    struct TestTree {
        service: ContentService,
        context: ContentServiceContext,
        repository: MemoryContentRepository,
    }

    /// Helper to create a service over an empty in-memory tree
    async fn create_test_tree() -> Result<TestTree> {
        let context = ContentServiceContext::in_memory(ContentServiceConfig::default())?;
        let mut page = ContentType::new("page", "Page", ContentVariation::Nothing);
        context.content_types.save(&mut page).await?;

        let repository = MemoryContentRepository::new();
        let service = ContentService::new(Arc::new(repository.clone()), context.clone());
        Ok(TestTree {
            service,
            context,
            repository,
        })
    }

    async fn page(tree: &TestTree, name: &str, parent_id: i64) -> Result<ContentNode> {
        Ok(tree
            .service
            .create_and_save(name, parent_id, "page", SUPER_USER_ID)
            .await?)
    }

    async fn reload(tree: &TestTree, id: i64) -> Result<ContentNode> {
        Ok(tree
            .service
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("node {} is gone", id))?)
    }

    /// Every node's path is its parent's path plus its id, one level deeper
    async fn assert_tree_consistent(tree: &TestTree, ids: &[i64]) -> Result<()> {
        for id in ids {
            let node = reload(tree, *id).await?;
            let (parent_path, parent_level) = match node.parent_id {
                ROOT_ID => ("-1".to_string(), 0),
                RECYCLE_BIN_ID => (RECYCLE_BIN_PATH.to_string(), 0),
                parent_id => {
                    let parent = reload(tree, parent_id).await?;
                    (parent.path, parent.level)
                }
            };
            assert_eq!(node.path, format!("{},{}", parent_path, node.id));
            assert_eq!(node.level, parent_level + 1, "level of {}", node.path);
            assert_eq!(
                node.trashed,
                node.path.starts_with(&format!("{},", RECYCLE_BIN_PATH)),
                "trashed flag of {}",
                node.path
            );
        }
        Ok(())
    }

    /// Looks every notified node up again through the service
    struct ReadingHandler {
        service: ContentService,
        reads: Arc<AtomicUsize>,
    }

    impl ReadingHandler {
        async fn read(&self, id: i64) {
            if let Ok(Some(node)) = self.service.get_by_id(id).await {
                if self.service.count_children(node.id, None).await.is_ok() {
                    self.reads.fetch_add(1, AtomicOrdering::SeqCst);
                }
            }
        }
    }

    #[async_trait]
    impl NotificationHandler<ContentSavingNotification> for ReadingHandler {
        async fn handle(&self, notification: &mut ContentSavingNotification) {
            for entity in &notification.entities {
                self.read(entity.id).await;
            }
        }
    }

    #[async_trait]
    impl NotificationHandler<ContentPublishingNotification> for ReadingHandler {
        async fn handle(&self, notification: &mut ContentPublishingNotification) {
            for entity in &notification.entities {
                self.read(entity.id).await;
            }
        }
    }

    #[async_trait]
    impl NotificationHandler<ContentMovingNotification> for ReadingHandler {
        async fn handle(&self, notification: &mut ContentMovingNotification) {
            for info in &notification.move_infos {
                self.read(info.entity.id).await;
            }
        }
    }

    #[async_trait]
    impl NotificationHandler<ContentSortingNotification> for ReadingHandler {
        async fn handle(&self, notification: &mut ContentSortingNotification) {
            for entity in &notification.entities {
                self.read(entity.id).await;
            }
        }
    }

    #[tokio::test]
    async fn test_handlers_can_read_while_tree_is_locked() -> Result<()> {
        let tree = create_test_tree().await?;
        let mut home = page(&tree, "Home", ROOT_ID).await?;
        let a = page(&tree, "A", home.id).await?;
        let b = page(&tree, "B", home.id).await?;

        let reads = Arc::new(AtomicUsize::new(0));
        let handler = || ReadingHandler {
            service: tree.service.clone(),
            reads: Arc::clone(&reads),
        };
        let bus = tree.context.bus();
        bus.subscribe::<ContentSavingNotification, _>(handler());
        bus.subscribe::<ContentPublishingNotification, _>(handler());
        bus.subscribe::<ContentMovingNotification, _>(handler());
        bus.subscribe::<ContentSortingNotification, _>(handler());
        let limit = Duration::from_secs(2);

        let result = timeout(limit, tree.service.publish(&mut home, &["*"], SUPER_USER_ID))
            .await??;
        assert!(result.success());
        let after_publish = reads.load(AtomicOrdering::SeqCst);
        assert!(after_publish >= 2, "saving and publishing handlers read");

        let results = timeout(
            limit,
            tree.service.publish_branch(
                &mut home,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            ),
        )
        .await??;
        assert_eq!(results.len(), 3);
        let after_branch = reads.load(AtomicOrdering::SeqCst);
        assert!(after_branch > after_publish);

        let mut moving = reload(&tree, b.id).await?;
        let result = timeout(limit, tree.service.move_node(&mut moving, a.id, SUPER_USER_ID))
            .await??;
        assert!(result.success());
        let after_move = reads.load(AtomicOrdering::SeqCst);
        assert!(after_move > after_branch);

        let other = page(&tree, "C", home.id).await?;
        let result = timeout(
            limit,
            tree.service.sort_by_ids(&[other.id, a.id], SUPER_USER_ID),
        )
        .await??;
        assert!(result.success());
        assert!(reads.load(AtomicOrdering::SeqCst) > after_move);
        Ok(())
    }

    #[tokio::test]
    async fn test_paths_stay_consistent_across_moves() -> Result<()> {
        let tree = create_test_tree().await?;
        let a = page(&tree, "A", ROOT_ID).await?;
        let b = page(&tree, "B", a.id).await?;
        let c = page(&tree, "C", b.id).await?;
        let d = page(&tree, "D", ROOT_ID).await?;
        let e = page(&tree, "E", d.id).await?;
        let ids = [a.id, b.id, c.id, d.id, e.id];

        let mut events = Box::pin(tree.service.event_stream());

        let mut moving = reload(&tree, b.id).await?;
        tree.service
            .move_node(&mut moving, d.id, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &ids).await?;
        let event = timeout(Duration::from_secs(1), events.next())
            .await?
            .expect("stream should stay open");
        assert_eq!(
            event.changes(),
            &[TreeChange::new(b.id, b.key, TreeChangeKind::RefreshBranch)]
        );

        let mut moving = reload(&tree, d.id).await?;
        tree.service
            .move_node(&mut moving, a.id, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &ids).await?;
        assert_eq!(reload(&tree, c.id).await?.level, 4);

        let mut moving = reload(&tree, a.id).await?;
        tree.service
            .move_to_recycle_bin(&mut moving, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &ids).await?;
        assert_eq!(
            tree.service
                .get_paged_recycle_bin(0, 10, None, Ordering::PathAscending)
                .await?
                .total,
            5
        );

        let mut moving = reload(&tree, a.id).await?;
        tree.service
            .move_node(&mut moving, ROOT_ID, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &ids).await?;
        assert!(!reload(&tree, e.id).await?.trashed);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_copy_writes_nothing() -> Result<()> {
        let tree = create_test_tree().await?;
        let a = page(&tree, "A", ROOT_ID).await?;
        page(&tree, "B", a.id).await?;
        tree.context
            .bus()
            .subscribe_fn(|n: &mut ContentCopyingNotification| {
                n.cancel_operation("copy", "Copies are frozen");
            });
        let before = tree.repository.len();
        let audit_before = tree.context.audit().get_all().await?.len();

        let copy = tree
            .service
            .copy(&a, ROOT_ID, true, true, SUPER_USER_ID)
            .await?;

        assert!(copy.is_none());
        assert_eq!(tree.repository.len(), before);
        assert_eq!(tree.context.audit().get_all().await?.len(), audit_before);
        assert!(tree.context.relations.get_by_parent(a.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_emptying_recycle_bin_removes_everything() -> Result<()> {
        let tree = create_test_tree().await?;
        let a = page(&tree, "A", ROOT_ID).await?;
        let b = page(&tree, "B", a.id).await?;
        let c = page(&tree, "C", b.id).await?;
        let keep = page(&tree, "Keep", ROOT_ID).await?;

        let mut trashed = reload(&tree, a.id).await?;
        tree.service
            .move_to_recycle_bin(&mut trashed, SUPER_USER_ID)
            .await?;

        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deleted);
        tree.context
            .bus()
            .subscribe_fn(move |n: &mut ContentDeletedNotification| {
                sink.lock()
                    .unwrap()
                    .extend(n.entities.iter().map(|e| e.id));
            });
        let mut rx = tree.service.subscribe_to_events();

        let result = tree.service.empty_recycle_bin(SUPER_USER_ID).await?;

        assert_eq!(result.result_type, OperationResultType::Success);
        assert_eq!(*deleted.lock().unwrap(), vec![c.id, b.id, a.id]);
        assert_eq!(tree.repository.len(), 1);
        assert!(tree.service.get_by_id(keep.id).await?.is_some());

        let event = timeout(Duration::from_secs(1), rx.recv()).await??;
        assert!(event
            .changes()
            .iter()
            .all(|change| change.kind == TreeChangeKind::Remove));
        assert!(event.changes().iter().any(|change| change.id == a.id));

        // nothing left to empty
        let result = tree.service.empty_recycle_bin(SUPER_USER_ID).await?;
        assert!(result.success());
        Ok(())
    }

    #[tokio::test]
    async fn test_uncommitted_scope_delivers_nothing() -> Result<()> {
        let tree = create_test_tree().await?;
        let saved = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&saved);
        tree.context
            .bus()
            .subscribe_fn(move |_: &mut ContentSavedNotification| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            });
        let mut rx = tree.service.subscribe_to_events();

        let repository: Arc<dyn ContentRepository> = Arc::new(tree.repository.clone());
        let mut node = tree
            .service
            .create("Draft", ROOT_ID, "page", SUPER_USER_ID)
            .await?;

        let mut scope = tree.context.scopes.create_scope(Arc::clone(&repository));
        scope.write_lock(Document::LOCK).await?;
        repository.save(&mut node, SUPER_USER_ID).await?;
        scope.notify(ContentSavedNotification::new(
            vec![node.clone()],
            EventMessages::new(),
        ));
        scope.tree_changed::<Document>(vec![TreeChange::new(
            node.id,
            node.key,
            TreeChangeKind::RefreshNode,
        )]);
        // never completed
        scope.finish(Ok(())).await?;

        assert_eq!(tree.repository.len(), 0);
        assert_eq!(saved.load(AtomicOrdering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
        assert!(tree.context.audit().get_all().await?.is_empty());
        Ok(())
    }
}
