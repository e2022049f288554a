//! Paged Cascade Tests
//!
//! Branch publish, move, copy and delete walk descendants page by page. These
//! tests shrink every page size to two so that each cascade crosses several
//! page boundaries on a small tree:
//!
//! ```text
//! Home
//! ├── A
//! │   ├── A1
//! │   │   └── A1x
//! │   └── A2
//! ├── B
//! │   └── B1
//! └── C
//! ```

#[cfg(test)]
mod paged_cascade_tests {
    use anyhow::Result;
    use contenttree_core::db::{ContentTypeRepository, MemoryContentRepository};
    use contenttree_core::notifications::{ContentDeletedNotification, ContentMovedNotification};
    use contenttree_core::{
        ContentNode, ContentService, ContentServiceConfig, ContentServiceContext, ContentType,
        ContentVariation, Ordering, PublishBranchFilter, PublishResultType, RECYCLE_BIN_ID,
        RECYCLE_BIN_PATH, ROOT_ID, SUPER_USER_ID,
    };
    use std::sync::{Arc, Mutex};

    struct TestTree {
        service: ContentService,
        context: ContentServiceContext,
        repository: MemoryContentRepository,
        home: ContentNode,
        a: ContentNode,
        a1: ContentNode,
        a1x: ContentNode,
        a2: ContentNode,
        b: ContentNode,
        b1: ContentNode,
        c: ContentNode,
    }

    impl TestTree {
        fn ids(&self) -> Vec<i64> {
            vec![
                self.home.id,
                self.a.id,
                self.a1.id,
                self.a1x.id,
                self.a2.id,
                self.b.id,
                self.b1.id,
                self.c.id,
            ]
        }
    }

    /// Helper to build the tree with every cascade page holding two nodes
    async fn create_test_tree() -> Result<TestTree> {
        let config = ContentServiceConfig {
            publish_branch_page_size: 2,
            move_page_size: 2,
            copy_page_size: 2,
            delete_page_size: 2,
            ..ContentServiceConfig::default()
        };
        let context = ContentServiceContext::in_memory(config)?;
        let mut page = ContentType::new("page", "Page", ContentVariation::Nothing);
        context.content_types.save(&mut page).await?;

        let repository = MemoryContentRepository::new();
        let service = ContentService::new(Arc::new(repository.clone()), context.clone());

        let save = |name: &'static str, parent_id: i64| {
            let service = service.clone();
            async move {
                service
                    .create_and_save(name, parent_id, "page", SUPER_USER_ID)
                    .await
            }
        };
        let home = save("Home", ROOT_ID).await?;
        let a = save("A", home.id).await?;
        let b = save("B", home.id).await?;
        let c = save("C", home.id).await?;
        let a1 = save("A1", a.id).await?;
        let a2 = save("A2", a.id).await?;
        let b1 = save("B1", b.id).await?;
        let a1x = save("A1x", a1.id).await?;

        Ok(TestTree {
            service,
            context,
            repository,
            home,
            a,
            a1,
            a1x,
            a2,
            b,
            b1,
            c,
        })
    }

    async fn reload(tree: &TestTree, id: i64) -> Result<ContentNode> {
        tree.service
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("node {} is gone", id))
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

    fn sorted(mut ids: Vec<i64>) -> Vec<i64> {
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn test_branch_publish_visits_every_node_once() -> Result<()> {
        let tree = create_test_tree().await?;
        let mut home = reload(&tree, tree.home.id).await?;

        let results = tree
            .service
            .publish_branch(
                &mut home,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        assert!(results
            .iter()
            .all(|r| r.result_type == PublishResultType::SuccessPublish));
        let visited: Vec<i64> = results.iter().map(|r| r.content_id).collect();
        assert_eq!(sorted(visited), sorted(tree.ids()));
        for id in tree.ids() {
            assert!(reload(&tree, id).await?.published);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_exclusion_cuts_subtree_across_pages() -> Result<()> {
        let tree = create_test_tree().await?;
        let mut home = reload(&tree, tree.home.id).await?;
        tree.service
            .publish_branch(
                &mut home,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        let mut a = reload(&tree, tree.a.id).await?;
        tree.service.unpublish(&mut a, None, SUPER_USER_ID).await?;
        for id in [tree.a1x.id, tree.c.id] {
            let mut node = reload(&tree, id).await?;
            node.set_name(format!("{} (edited)", node.name().unwrap_or_default()));
            tree.service.save(&mut node, SUPER_USER_ID).await?;
        }

        // pages: [A, A1] [A1x, A2] [B, B1] [C]; A1x is cut from the page before
        let mut home = reload(&tree, tree.home.id).await?;
        let results = tree
            .service
            .publish_branch(&mut home, PublishBranchFilter::DEFAULT, &["*"], SUPER_USER_ID)
            .await?;

        let visited: Vec<(i64, PublishResultType)> = results
            .iter()
            .map(|r| (r.content_id, r.result_type))
            .collect();
        assert_eq!(
            visited,
            vec![
                (tree.home.id, PublishResultType::SuccessPublishAlready),
                (tree.b.id, PublishResultType::SuccessPublishAlready),
                (tree.b1.id, PublishResultType::SuccessPublishAlready),
                (tree.c.id, PublishResultType::SuccessPublish),
            ]
        );
        assert!(reload(&tree, tree.a1x.id).await?.edited);
        assert!(!reload(&tree, tree.c.id).await?.edited);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_rewrites_every_page_of_descendants() -> Result<()> {
        let tree = create_test_tree().await?;
        let moved: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moved);
        tree.context
            .bus()
            .subscribe_fn(move |n: &mut ContentMovedNotification| {
                sink.lock()
                    .unwrap()
                    .extend(n.move_infos.iter().map(|info| info.entity.id));
            });

        let mut a = reload(&tree, tree.a.id).await?;
        tree.service
            .move_node(&mut a, tree.c.id, SUPER_USER_ID)
            .await?;

        assert_tree_consistent(&tree, &tree.ids()).await?;
        assert_eq!(reload(&tree, tree.a1x.id).await?.level, 5);
        assert_eq!(
            sorted(moved.lock().unwrap().clone()),
            sorted(vec![tree.a.id, tree.a1.id, tree.a1x.id, tree.a2.id])
        );

        let mut home = reload(&tree, tree.home.id).await?;
        tree.service
            .move_to_recycle_bin(&mut home, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &tree.ids()).await?;
        for id in tree.ids() {
            assert!(reload(&tree, id).await?.trashed);
        }

        let mut home = reload(&tree, tree.home.id).await?;
        tree.service
            .move_node(&mut home, ROOT_ID, SUPER_USER_ID)
            .await?;
        assert_tree_consistent(&tree, &tree.ids()).await?;
        for id in tree.ids() {
            assert!(!reload(&tree, id).await?.trashed);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_and_delete_page_through_subtrees() -> Result<()> {
        let tree = create_test_tree().await?;

        let copy = tree
            .service
            .copy(&tree.home, ROOT_ID, false, true, SUPER_USER_ID)
            .await?
            .ok_or_else(|| anyhow::anyhow!("copy was cancelled"))?;
        assert_eq!(tree.repository.len(), 16);

        let descendants = tree
            .service
            .get_paged_descendants(copy.id, 0, 100, None, Ordering::PathAscending)
            .await?;
        assert_eq!(descendants.total, 7);
        let mut names: Vec<String> = descendants
            .items
            .iter()
            .filter_map(|n| n.name().map(str::to_string))
            .collect();
        names.sort();
        assert_eq!(names, vec!["A", "A1", "A1x", "A2", "B", "B1", "C"]);
        let mut copy_ids: Vec<i64> = descendants.items.iter().map(|n| n.id).collect();
        copy_ids.push(copy.id);
        assert_tree_consistent(&tree, &copy_ids).await?;

        // into its own subtree: each original is copied once
        let a = reload(&tree, tree.a.id).await?;
        tree.service
            .copy(&a, tree.a2.id, false, true, SUPER_USER_ID)
            .await?;
        assert_eq!(tree.repository.len(), 20);
        assert_eq!(tree.service.count_descendants(tree.a2.id, None).await?, 4);

        let deleted: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deleted);
        tree.context
            .bus()
            .subscribe_fn(move |n: &mut ContentDeletedNotification| {
                sink.lock()
                    .unwrap()
                    .extend(n.entities.iter().map(|e| e.id));
            });

        let mut copy = reload(&tree, copy.id).await?;
        tree.service
            .move_to_recycle_bin(&mut copy, SUPER_USER_ID)
            .await?;
        tree.service.empty_recycle_bin(SUPER_USER_ID).await?;

        assert_eq!(sorted(deleted.lock().unwrap().clone()), sorted(copy_ids));
        assert_eq!(tree.repository.len(), 12);
        assert_tree_consistent(&tree, &tree.ids()).await?;
        Ok(())
    }
}
