//! Storage-backed company standard repository implementation

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::standard::{CompanyStandard, StandardId, StandardRepository};
use crate::domain::storage::Storage;
use crate::domain::DomainError;
use crate::infrastructure::storage::IdSequence;

/// Storage-backed implementation of StandardRepository
#[derive(Debug)]
pub struct StorageStandardRepository {
    storage: Arc<dyn Storage<CompanyStandard>>,
    ids: IdSequence,
}

impl StorageStandardRepository {
    pub fn new(storage: Arc<dyn Storage<CompanyStandard>>) -> Self {
        Self {
            storage,
            ids: IdSequence::new(),
        }
    }
}

#[async_trait]
impl StandardRepository for StorageStandardRepository {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<CompanyStandard>, DomainError> {
        let all = self.storage.list().await?;
        Ok(all.into_iter().filter(|s| s.user_id() == user_id).collect())
    }

    async fn create(&self, standard: CompanyStandard) -> Result<CompanyStandard, DomainError> {
        let id = self.ids.next(&self.storage).await?;
        self.storage.create(standard.with_id(StandardId::new(id))).await
    }
}
