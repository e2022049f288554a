//! Audit and Relation Repositories

use crate::models::{AuditEntry, Relation};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn save(&self, entry: AuditEntry) -> Result<()>;

    /// Entries for one entity, oldest first
    async fn get_for_entity(&self, entity_id: i64) -> Result<Vec<AuditEntry>>;

    async fn get_all(&self) -> Result<Vec<AuditEntry>>;
}

#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Store a relation and return it with its id
    async fn save(&self, relation: Relation) -> Result<Relation>;

    async fn get_by_parent(&self, parent_id: i64) -> Result<Vec<Relation>>;

    async fn get_by_child(&self, child_id: i64) -> Result<Vec<Relation>>;

    /// Whether another entity depends on this one
    async fn is_referenced(&self, entity_id: i64) -> Result<bool> {
        Ok(self
            .get_by_child(entity_id)
            .await?
            .iter()
            .any(|r| r.is_dependency))
    }

    /// Remove every relation the entity takes part in
    async fn delete_for_entity(&self, entity_id: i64) -> Result<()>;
}
