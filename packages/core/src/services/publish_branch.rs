//! Publish-Branch Cascade
//!
//! Publishes a node and walks its descendants in path order, deciding per
//! node (and per culture) whether anything needs publishing.
//!
//! # Decision
//!
//! [`should_publish`] returns:
//!
//! - `None`: leave the node alone (it is excluded, and so are its descendants)
//! - an empty set: the node is already published as requested
//! - a set of cultures: publish those cultures
//!
//! # Failure inheritance
//!
//! A failed root aborts the whole branch. A failed or excluded descendant
//! cuts off its own subtree; siblings carry on.

use crate::db::{TreeChange, TreeChangeKind};
use crate::models::{
    AuditEntry, AuditType, ContentNode, ContentQuery, Ordering, PublishBranchFilter,
    PublishResult, PublishResultType, INVARIANT_CULTURE,
};
use crate::notifications::{NotificationState, PublishedNotification};
use crate::scoping::Scope;
use crate::services::error::ContentServiceError;
use crate::services::kinds::ContentKind;
use crate::services::publishing_core::PublishingCore;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Cultures to publish for one node of a branch, or `None` to exclude it
///
/// For each culture considered: a published culture keeps the node in the
/// branch and is republished only when edited or when the filter forces it;
/// an unpublished culture is published only for the branch root or when the
/// filter includes unpublished content. Invariant nodes consider `*`;
/// variant nodes consider each requested culture they have, with `*`
/// meaning all of them.
pub fn should_publish(
    node: &ContentNode,
    cultures: &[String],
    filter: PublishBranchFilter,
    is_root: bool,
) -> Option<BTreeSet<String>> {
    if !node.varies_by_culture() {
        return decide(
            None,
            INVARIANT_CULTURE,
            node.published,
            node.edited,
            is_root,
            filter,
        );
    }

    let requested: Vec<String> = if cultures.iter().any(|c| c == INVARIANT_CULTURE) {
        node.available_cultures()
    } else {
        cultures
            .iter()
            .filter(|c| node.is_culture_available(c))
            .cloned()
            .collect()
    };

    requested.iter().fold(None, |selected, culture| {
        decide(
            selected,
            culture,
            node.is_culture_published(culture),
            node.is_culture_edited(culture),
            is_root,
            filter,
        )
    })
}

fn decide(
    mut selected: Option<BTreeSet<String>>,
    culture: &str,
    published: bool,
    edited: bool,
    is_root: bool,
    filter: PublishBranchFilter,
) -> Option<BTreeSet<String>> {
    if published {
        let cultures = selected.get_or_insert_with(BTreeSet::new);
        if edited || filter.force_republish {
            cultures.insert(culture.to_string());
        }
        return selected;
    }

    if !filter.include_unpublished && !is_root {
        return selected;
    }

    selected
        .get_or_insert_with(BTreeSet::new)
        .insert(culture.to_string());
    selected
}

/// Results of one cascade
pub(crate) struct BranchOutcome {
    pub results: Vec<PublishResult>,
    /// The root failed; nothing below it was attempted
    pub aborted: bool,
}

/// What the cascade keeps across nodes
#[derive(Default)]
struct BranchProgress {
    results: Vec<PublishResult>,
    published: Vec<ContentNode>,
    cultures: BTreeSet<String>,
}

impl BranchProgress {
    fn record(&mut self, node: &ContentNode, result: PublishResult, cultures: Vec<String>) {
        if result.result_type != PublishResultType::SuccessPublishAlready {
            self.published.push(node.clone());
            self.cultures.extend(cultures);
        }
        self.results.push(result);
    }
}

impl<K: ContentKind> PublishingCore<K> {
    /// Publish `root` and its descendants in one scope
    ///
    /// `cultures` is `["*"]` for invariant content; variant content may pass
    /// specific cultures or `*` for every culture each node has.
    pub async fn publish_branch(
        &self,
        root: &mut ContentNode,
        filter: PublishBranchFilter,
        cultures: &[&str],
        user_id: i64,
    ) -> Result<Vec<PublishResult>, ContentServiceError> {
        if !root.has_identity() {
            return Err(ContentServiceError::invalid_operation(
                "Cannot branch-publish a node that was never saved",
            ));
        }
        if cultures.is_empty() {
            return Err(ContentServiceError::invalid_argument(
                "At least one culture must be given",
            ));
        }
        if !root.varies_by_culture() && cultures.iter().any(|c| *c != INVARIANT_CULTURE) {
            return Err(ContentServiceError::invalid_argument(
                "Invariant content can only be published with culture '*'",
            ));
        }
        let cultures: Vec<String> = cultures.iter().map(|c| c.to_string()).collect();

        let mut scope = self.create_scope();
        let outcome = async {
            scope.write_lock(K::LOCK).await?;
            let branch = self
                .publish_branch_locked(&mut scope, root, filter, &cultures, user_id)
                .await?;
            if !branch.aborted {
                scope.complete();
            }
            Ok::<_, ContentServiceError>(branch.results)
        }
        .await;
        scope.finish(outcome).await
    }

    /// The cascade itself, inside a scope holding the write lock
    pub(crate) async fn publish_branch_locked(
        &self,
        scope: &mut Scope,
        root: &mut ContentNode,
        filter: PublishBranchFilter,
        cultures: &[String],
        user_id: i64,
    ) -> Result<BranchOutcome, ContentServiceError> {
        let messages = scope.messages();
        let mut progress = BranchProgress::default();
        let mut root_state = NotificationState::new();

        if let Some((result, state, published)) = self
            .publish_branch_item(scope, root, filter, cultures, true, user_id)
            .await?
        {
            if !result.success() {
                info!(
                    "Branch publish of {} {} aborted: {:?}",
                    K::NAME,
                    root.id,
                    result.result_type
                );
                return Ok(BranchOutcome {
                    results: vec![result],
                    aborted: true,
                });
            }
            progress.record(root, result, published);
            root_state = state;
        }

        let query = ContentQuery::default().descendants_of(&root.path);
        let page_size = self.context().config.publish_branch_page_size;
        let mut excluded: HashSet<i64> = HashSet::new();
        let mut page_index = 0;

        loop {
            let page = self
                .repository()
                .get_page(&query, page_index, page_size, None, Ordering::PathAscending)
                .await?;
            let count = page.items.len();

            for mut node in page.items {
                if excluded.contains(&node.parent_id) {
                    excluded.insert(node.id);
                    continue;
                }

                match self
                    .publish_branch_item(scope, &mut node, filter, cultures, false, user_id)
                    .await?
                {
                    Some((result, _, published)) if result.success() => {
                        progress.record(&node, result, published);
                        continue;
                    }
                    Some((result, _, _)) => {
                        debug!(
                            "Cutting branch at {} {}: {:?}",
                            K::NAME,
                            node.id,
                            result.result_type
                        );
                        progress.results.push(result);
                    }
                    None => {}
                }
                excluded.insert(node.id);
            }

            if count < page_size {
                break;
            }
            page_index += 1;
        }

        let change = TreeChange::new(root.id, root.key, TreeChangeKind::RefreshBranch)
            .with_published_cultures(progress.cultures.into_iter().collect());
        scope.tree_changed::<K>(vec![change]);

        let mut published = PublishedNotification::<K>::new(progress.published, messages);
        published.state = root_state;
        let published_count = published.entities.len();
        scope.notify(published);

        scope.audit(
            AuditEntry::new(AuditType::Publish, user_id, root.id, K::NAME)
                .with_comment("Branch published"),
        );
        info!(
            "Branch publish of {} {} done: {} results, {} published",
            K::NAME,
            root.id,
            progress.results.len(),
            published_count
        );

        Ok(BranchOutcome {
            results: progress.results,
            aborted: false,
        })
    }

    async fn publish_branch_item(
        &self,
        scope: &mut Scope,
        node: &mut ContentNode,
        filter: PublishBranchFilter,
        cultures: &[String],
        is_root: bool,
        user_id: i64,
    ) -> Result<Option<(PublishResult, NotificationState, Vec<String>)>, ContentServiceError>
    {
        let selected = match should_publish(node, cultures, filter, is_root) {
            Some(selected) => selected,
            None => {
                debug!("{} {} excluded from branch", K::NAME, node.id);
                return Ok(None);
            }
        };

        let selected: Vec<String> = selected.into_iter().collect();
        let (result, state) = self
            .publish_item(scope, node, &selected, user_id, true)
            .await?;
        Ok(Some((result, state, selected)))
    }
}
