//! In-Memory Audit and Relation Repositories

use crate::db::audit_repository::{AuditRepository, RelationRepository};
use crate::models::{AuditEntry, Relation};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryAuditRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn save(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn get_for_entity(&self, entity_id: i64) -> Result<Vec<AuditEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRelationRepository {
    relations: RwLock<Vec<Relation>>,
}

impl MemoryRelationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationRepository for MemoryRelationRepository {
    async fn save(&self, mut relation: Relation) -> Result<Relation> {
        let mut relations = self.relations.write().await;
        relation.id = relations.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        relations.push(relation.clone());
        Ok(relation)
    }

    async fn get_by_parent(&self, parent_id: i64) -> Result<Vec<Relation>> {
        Ok(self
            .relations
            .read()
            .await
            .iter()
            .filter(|r| r.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn get_by_child(&self, child_id: i64) -> Result<Vec<Relation>> {
        Ok(self
            .relations
            .read()
            .await
            .iter()
            .filter(|r| r.child_id == child_id)
            .cloned()
            .collect())
    }

    async fn delete_for_entity(&self, entity_id: i64) -> Result<()> {
        self.relations
            .write()
            .await
            .retain(|r| r.parent_id != entity_id && r.child_id != entity_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RELATE_DOCUMENT_ON_COPY_ALIAS;

    #[tokio::test]
    async fn test_only_dependencies_count_as_references() {
        let repo = MemoryRelationRepository::new();
        repo.save(Relation::new(1, 2, RELATE_DOCUMENT_ON_COPY_ALIAS))
            .await
            .unwrap();
        assert!(!repo.is_referenced(2).await.unwrap());

        repo.save(Relation::dependency(3, 2, "documentReference"))
            .await
            .unwrap();
        assert!(repo.is_referenced(2).await.unwrap());

        repo.delete_for_entity(2).await.unwrap();
        assert!(repo.get_by_child(2).await.unwrap().is_empty());
    }
}
