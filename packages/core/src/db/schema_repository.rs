//! Content Type and Language Repositories

use crate::models::{ContentType, Language};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ContentTypeRepository: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<ContentType>>;

    async fn get_by_alias(&self, alias: &str) -> Result<Option<ContentType>>;

    /// Store a content type, assigning an id when it has none
    async fn save(&self, content_type: &mut ContentType) -> Result<()>;
}

#[async_trait]
pub trait LanguageRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Language>>;

    async fn get_by_iso_code(&self, iso_code: &str) -> Result<Option<Language>>;

    async fn save(&self, language: Language) -> Result<()>;

    async fn default_iso_code(&self) -> Result<Option<String>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|l| l.is_default)
            .map(|l| l.iso_code))
    }

    async fn mandatory_iso_codes(&self) -> Result<Vec<String>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|l| l.is_mandatory)
            .map(|l| l.iso_code)
            .collect())
    }
}
