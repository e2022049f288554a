//! Relate On Copy
//!
//! Listens for committed copies and, when the caller asked for it, records
//! a `relateDocumentOnCopy` relation from the original to its copy.

use crate::db::{AuditRepository, RelationRepository};
use crate::models::{AuditEntry, AuditType, Relation, RELATE_DOCUMENT_ON_COPY_ALIAS};
use crate::notifications::{ContentCopiedNotification, NotificationHandler};
use crate::services::kinds::{ContentKind, Document};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RelateOnCopyHandler {
    relations: Arc<dyn RelationRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl RelateOnCopyHandler {
    pub fn new(relations: Arc<dyn RelationRepository>, audit: Arc<dyn AuditRepository>) -> Self {
        Self { relations, audit }
    }
}

#[async_trait]
impl NotificationHandler<ContentCopiedNotification> for RelateOnCopyHandler {
    async fn handle(&self, notification: &mut ContentCopiedNotification) {
        if !notification.relate_to_original {
            return;
        }

        let original_id = notification.original.id;
        let copy_id = notification.copy.id;
        let relation = Relation::new(original_id, copy_id, RELATE_DOCUMENT_ON_COPY_ALIAS);

        // the copy already committed; a failed relation only loses the link
        if let Err(e) = self.relations.save(relation).await {
            warn!("Failed to relate copy {} to {}: {}", copy_id, original_id, e);
            return;
        }
        debug!("Related copy {} to original {}", copy_id, original_id);

        let entry = AuditEntry::new(
            AuditType::Copy,
            notification.copy.writer_id,
            copy_id,
            Document::NAME,
        )
        .with_comment(format!(
            "Copied content with Id: '{}' related to original content with Id: '{}'",
            copy_id, original_id
        ));
        if let Err(e) = self.audit.save(entry).await {
            warn!("Failed to audit relation for copy {}: {}", copy_id, e);
        }
    }
}
