//! Publish Branch Tests
//!
//! End-to-end tests of the branch cascade through the public services:
//! which nodes are published, which are left alone, and what subscribers
//! hear about it once the scope commits.

#[cfg(test)]
mod publish_branch_tests {
    use anyhow::Result;
    use contenttree_core::db::{
        ContentTypeRepository, DomainEvent, LanguageRepository, MemoryContentRepository,
        TreeChangeKind,
    };
    use contenttree_core::notifications::{
        ContentPublishedNotification, ContentPublishingNotification, ContentSavingNotification,
    };
    use contenttree_core::{
        ContentNode, ContentService, ContentServiceConfig, ContentServiceContext, ContentType,
        ContentVariation, Language, PublishBranchFilter, PublishResultType, ROOT_ID,
        SUPER_USER_ID,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::broadcast;
    use tokio::time::{timeout, Duration};

    /// Helper to create a service with three languages and both content kinds
    async fn create_test_service() -> Result<ContentService> {
        let context = ContentServiceContext::in_memory(ContentServiceConfig::default())?;
        context
            .languages
            .save(Language::new("en-US").default_language())
            .await?;
        context.languages.save(Language::new("da-DK")).await?;
        context.languages.save(Language::new("de-DE")).await?;

        let mut page = ContentType::new("page", "Page", ContentVariation::Nothing);
        context.content_types.save(&mut page).await?;
        let mut article = ContentType::new("article", "Article", ContentVariation::Culture);
        context.content_types.save(&mut article).await?;

        Ok(ContentService::new(
            Arc::new(MemoryContentRepository::new()),
            context,
        ))
    }

    async fn page(service: &ContentService, name: &str, parent_id: i64) -> Result<ContentNode> {
        Ok(service
            .create_and_save(name, parent_id, "page", SUPER_USER_ID)
            .await?)
    }

    async fn published_page(
        service: &ContentService,
        name: &str,
        parent_id: i64,
    ) -> Result<ContentNode> {
        let mut node = page(service, name, parent_id).await?;
        let result = service.publish(&mut node, &["*"], SUPER_USER_ID).await?;
        assert!(result.success(), "publishing {} failed: {:?}", name, result.result_type);
        Ok(node)
    }

    async fn next_event(rx: &mut broadcast::Receiver<DomainEvent>) -> DomainEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event")
    }

    fn result_types(results: &[contenttree_core::PublishResult]) -> Vec<PublishResultType> {
        results.iter().map(|r| r.result_type).collect()
    }

    #[tokio::test]
    async fn test_only_edited_descendants_are_republished() -> Result<()> {
        let service = create_test_service().await?;
        let mut root = published_page(&service, "Home", ROOT_ID).await?;
        let mut about = published_page(&service, "About", root.id).await?;
        let contact = published_page(&service, "Contact", root.id).await?;

        about.set_name("About us");
        service.save(&mut about, SUPER_USER_ID).await?;
        assert!(about.edited);

        let published: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        service
            .context()
            .bus()
            .subscribe_fn(move |n: &mut ContentPublishedNotification| {
                sink.lock()
                    .unwrap()
                    .extend(n.entities.iter().map(|e| e.id));
            });
        let mut rx = service.subscribe_to_events();

        let results = service
            .publish_branch(&mut root, PublishBranchFilter::DEFAULT, &["*"], SUPER_USER_ID)
            .await?;

        assert_eq!(
            result_types(&results),
            vec![
                PublishResultType::SuccessPublishAlready,
                PublishResultType::SuccessPublish,
                PublishResultType::SuccessPublishAlready,
            ]
        );
        assert_eq!(results[1].content_id, about.id);
        assert_eq!(results[2].content_id, contact.id);
        assert_eq!(*published.lock().unwrap(), vec![about.id]);

        let event = next_event(&mut rx).await;
        assert_eq!(event.event_type(), "tree:changed");
        let changes = event.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, root.id);
        assert_eq!(changes[0].kind, TreeChangeKind::RefreshBranch);
        assert_eq!(changes[0].published_cultures, Some(vec!["*".to_string()]));

        let stored = service.get_by_id(about.id).await?.unwrap();
        assert!(stored.published);
        assert!(!stored.edited);
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_change_carries_only_published_cultures() -> Result<()> {
        let service = create_test_service().await?;

        let mut root = service
            .create_and_save("Home", ROOT_ID, "article", SUPER_USER_ID)
            .await?;
        service.publish(&mut root, &["en-US"], SUPER_USER_ID).await?;
        root.set_culture_name("da-DK", "Hjem");
        service.save(&mut root, SUPER_USER_ID).await?;

        let news = service
            .create_and_save("News", root.id, "article", SUPER_USER_ID)
            .await?;

        let mut blog = service
            .create_and_save("Blog", root.id, "article", SUPER_USER_ID)
            .await?;
        blog.set_culture_name("de-DE", "Blog DE");
        service.save(&mut blog, SUPER_USER_ID).await?;
        let result = service
            .publish(&mut blog, &["en-US", "de-DE"], SUPER_USER_ID)
            .await?;
        assert!(result.success());

        let mut rx = service.subscribe_to_events();
        let results = service
            .publish_branch(
                &mut root,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        assert_eq!(
            result_types(&results),
            vec![
                PublishResultType::SuccessPublishCulture,
                PublishResultType::SuccessPublishCulture,
                PublishResultType::SuccessPublishAlready,
            ]
        );
        assert!(root.is_culture_published("da-DK"));
        let news = service.get_by_id(news.id).await?.unwrap();
        assert!(news.is_culture_published("en-US"));

        let event = next_event(&mut rx).await;
        assert_eq!(
            event.changes()[0].published_cultures,
            Some(vec!["da-DK".to_string(), "en-US".to_string()])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_excluded_node_cuts_off_its_subtree() -> Result<()> {
        let service = create_test_service().await?;
        let mut root = published_page(&service, "Home", ROOT_ID).await?;
        let mut section = published_page(&service, "Section", root.id).await?;
        let mut leaf = published_page(&service, "Leaf", section.id).await?;

        service.unpublish(&mut section, None, SUPER_USER_ID).await?;
        leaf.set_name("Leaf (edited)");
        service.save(&mut leaf, SUPER_USER_ID).await?;

        let results = service
            .publish_branch(&mut root, PublishBranchFilter::DEFAULT, &["*"], SUPER_USER_ID)
            .await?;
        assert_eq!(
            result_types(&results),
            vec![PublishResultType::SuccessPublishAlready]
        );
        let stored = service.get_by_id(leaf.id).await?.unwrap();
        assert!(stored.edited);

        let results = service
            .publish_branch(&mut root, PublishBranchFilter::ALL, &["*"], SUPER_USER_ID)
            .await?;
        assert_eq!(
            result_types(&results),
            vec![PublishResultType::SuccessPublish; 3]
        );
        let stored = service.get_by_id(leaf.id).await?.unwrap();
        assert!(!stored.edited);
        assert!(service.is_path_published(&stored).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_root_aborts_branch() -> Result<()> {
        let service = create_test_service().await?;
        let parent = page(&service, "Unpublished parent", ROOT_ID).await?;
        let mut root = page(&service, "Root", parent.id).await?;
        let child = page(&service, "Child", root.id).await?;
        let mut rx = service.subscribe_to_events();

        let results = service
            .publish_branch(
                &mut root,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        assert_eq!(
            result_types(&results),
            vec![PublishResultType::FailedPublishPathNotPublished]
        );
        assert!(!root.published);
        assert!(!service.get_by_id(child.id).await?.unwrap().published);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_root_with_unsaved_changes_is_rejected_untouched() -> Result<()> {
        let service = create_test_service().await?;
        let mut root = page(&service, "Home", ROOT_ID).await?;
        let child = page(&service, "Child", root.id).await?;

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        service
            .context()
            .bus()
            .subscribe_fn(move |_: &mut ContentSavingNotification| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let mut rx = service.subscribe_to_events();

        root.set_name("Home (draft)");
        let results = service
            .publish_branch(
                &mut root,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        assert_eq!(
            result_types(&results),
            vec![PublishResultType::FailedPublishUnsavedChanges]
        );
        assert_eq!(results[0].content_id, root.id);
        assert!(root.is_dirty());
        assert!(!root.published);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);

        let stored = service.get_by_id(root.id).await?.unwrap();
        assert_eq!(stored.name(), Some("Home"));
        assert!(!stored.published);
        assert!(!service.get_by_id(child.id).await?.unwrap().published);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_descendant_keeps_siblings() -> Result<()> {
        let service = create_test_service().await?;
        service
            .context()
            .bus()
            .subscribe_fn(|n: &mut ContentPublishingNotification| {
                if n.entities.iter().any(|e| e.name() == Some("Blocked")) {
                    n.cancel_operation("publish", "Blocked section");
                }
            });

        let mut root = page(&service, "Home", ROOT_ID).await?;
        let blocked = page(&service, "Blocked", root.id).await?;
        let below_blocked = page(&service, "Below", blocked.id).await?;
        let open = page(&service, "Open", root.id).await?;

        let results = service
            .publish_branch(
                &mut root,
                PublishBranchFilter::INCLUDE_UNPUBLISHED,
                &["*"],
                SUPER_USER_ID,
            )
            .await?;

        assert_eq!(
            result_types(&results),
            vec![
                PublishResultType::SuccessPublish,
                PublishResultType::FailedPublishCancelledByEvent,
                PublishResultType::SuccessPublish,
            ]
        );
        assert_eq!(results[1].content_id, blocked.id);
        assert!(!service.get_by_id(below_blocked.id).await?.unwrap().published);
        assert!(service.get_by_id(open.id).await?.unwrap().published);
        Ok(())
    }
}
