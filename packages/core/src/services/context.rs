//! Service Context
//!
//! The repositories and infrastructure every content service shares. One
//! context is built per process and handed to each service constructor, so
//! documents and elements see the same bus, locks and audit trail.

use crate::config::ContentServiceConfig;
use crate::db::{
    AuditRepository, ContentTypeRepository, LanguageRepository, MemoryAuditRepository,
    MemoryContentTypeRepository, MemoryLanguageRepository, MemoryRelationRepository,
    RelationRepository,
};
use crate::notifications::{ContentCopiedNotification, NotificationBus};
use crate::scoping::ScopeProvider;
use crate::services::error::ContentServiceError;
use crate::services::relate_on_copy::RelateOnCopyHandler;
use std::sync::Arc;

#[derive(Clone)]
pub struct ContentServiceContext {
    pub content_types: Arc<dyn ContentTypeRepository>,
    pub languages: Arc<dyn LanguageRepository>,
    pub relations: Arc<dyn RelationRepository>,
    pub scopes: Arc<ScopeProvider>,
    pub config: ContentServiceConfig,
}

impl ContentServiceContext {
    /// Assemble a context from caller-supplied repositories
    ///
    /// Registers the relate-on-copy handler on `bus`.
    pub fn new(
        content_types: Arc<dyn ContentTypeRepository>,
        languages: Arc<dyn LanguageRepository>,
        relations: Arc<dyn RelationRepository>,
        audit: Arc<dyn AuditRepository>,
        bus: Arc<NotificationBus>,
        config: ContentServiceConfig,
    ) -> Result<Self, ContentServiceError> {
        config
            .validate()
            .map_err(ContentServiceError::configuration)?;

        bus.subscribe::<ContentCopiedNotification, _>(RelateOnCopyHandler::new(
            Arc::clone(&relations),
            Arc::clone(&audit),
        ));

        let scopes = Arc::new(ScopeProvider::new(
            bus,
            audit,
            config.event_channel_capacity,
        ));

        Ok(Self {
            content_types,
            languages,
            relations,
            scopes,
            config,
        })
    }

    /// Context backed entirely by in-memory repositories
    pub fn in_memory(config: ContentServiceConfig) -> Result<Self, ContentServiceError> {
        Self::new(
            Arc::new(MemoryContentTypeRepository::new()),
            Arc::new(MemoryLanguageRepository::new()),
            Arc::new(MemoryRelationRepository::new()),
            Arc::new(MemoryAuditRepository::new()),
            Arc::new(NotificationBus::new()),
            config,
        )
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        self.scopes.bus()
    }

    pub fn audit(&self) -> &Arc<dyn AuditRepository> {
        self.scopes.audit_repository()
    }
}
