//! In-Memory Content Type and Language Repositories

use crate::db::error::RepositoryError;
use crate::db::schema_repository::{ContentTypeRepository, LanguageRepository};
use crate::models::{ContentType, Language};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryContentTypeRepository {
    types: RwLock<BTreeMap<i64, ContentType>>,
}

impl MemoryContentTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentTypeRepository for MemoryContentTypeRepository {
    async fn get(&self, id: i64) -> Result<Option<ContentType>> {
        Ok(self.types.read().await.get(&id).cloned())
    }

    async fn get_by_alias(&self, alias: &str) -> Result<Option<ContentType>> {
        Ok(self
            .types
            .read()
            .await
            .values()
            .find(|t| t.alias == alias)
            .cloned())
    }

    async fn save(&self, content_type: &mut ContentType) -> Result<()> {
        let mut types = self.types.write().await;
        let alias_taken = types
            .values()
            .any(|t| t.alias == content_type.alias && t.id != content_type.id);
        if alias_taken {
            return Err(RepositoryError::duplicate_key("content type", &content_type.alias).into());
        }
        if content_type.id == 0 {
            content_type.id = types.keys().next_back().map(|id| id + 1).unwrap_or(1);
        }
        types.insert(content_type.id, content_type.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLanguageRepository {
    languages: RwLock<BTreeMap<String, Language>>,
}

impl MemoryLanguageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LanguageRepository for MemoryLanguageRepository {
    async fn get_all(&self) -> Result<Vec<Language>> {
        Ok(self.languages.read().await.values().cloned().collect())
    }

    async fn get_by_iso_code(&self, iso_code: &str) -> Result<Option<Language>> {
        Ok(self.languages.read().await.get(iso_code).cloned())
    }

    async fn save(&self, language: Language) -> Result<()> {
        let mut languages = self.languages.write().await;
        if language.is_default {
            // only one default language
            for other in languages.values_mut() {
                other.is_default = false;
            }
        }
        languages.insert(language.iso_code.clone(), language);
        Ok(())
    }
}
