//! Company standard repository trait

use async_trait::async_trait;

use super::entity::CompanyStandard;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for company standards
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StandardRepository: Send + Sync {
    /// Lists the standards owned by a user
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<CompanyStandard>, DomainError>;

    /// Stores a new standard, allocating its id
    async fn create(&self, standard: CompanyStandard) -> Result<CompanyStandard, DomainError>;
}
