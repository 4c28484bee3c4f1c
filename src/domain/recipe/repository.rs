//! Recipe repository trait

use async_trait::async_trait;

use super::entity::{Recipe, RecipeId};
use crate::domain::DomainError;

/// Repository trait for recipe persistence
#[async_trait]
pub trait RecipeRepository: Send + Sync + std::fmt::Debug {
    /// Get a recipe by ID
    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, DomainError>;

    /// List every recipe owned by a user
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Recipe>, DomainError>;

    /// List a user's recipes flagged as templates
    async fn list_templates(&self, user_id: i64) -> Result<Vec<Recipe>, DomainError>;

    /// Store a new recipe, allocating ids for it and any step without one
    async fn create(&self, recipe: Recipe) -> Result<Recipe, DomainError>;
}
