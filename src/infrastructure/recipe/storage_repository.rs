//! Storage-backed recipe repository implementation

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::recipe::{Recipe, RecipeId, RecipeRepository, StepId};
use crate::domain::storage::{Storage, StorageKey};
use crate::domain::DomainError;
use crate::infrastructure::storage::IdSequence;

/// Storage-backed implementation of RecipeRepository
#[derive(Debug)]
pub struct StorageRecipeRepository {
    storage: Arc<dyn Storage<Recipe>>,
    recipe_ids: IdSequence,
    step_ids: IdSequence,
}

impl StorageRecipeRepository {
    /// Create a new storage-backed repository
    pub fn new(storage: Arc<dyn Storage<Recipe>>) -> Self {
        Self {
            storage,
            recipe_ids: IdSequence::new(),
            step_ids: IdSequence::new(),
        }
    }

    async fn highest_step_id(&self) -> Result<i64, DomainError> {
        let recipes = self.storage.list().await?;
        Ok(recipes
            .iter()
            .flat_map(|r| r.steps().iter().map(|s| s.id().value()))
            .max()
            .unwrap_or(0))
    }
}

#[async_trait]
impl RecipeRepository for StorageRecipeRepository {
    async fn get(&self, id: RecipeId) -> Result<Option<Recipe>, DomainError> {
        self.storage.get(&id).await
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Recipe>, DomainError> {
        let all = self.storage.list().await?;
        Ok(all.into_iter().filter(|r| r.user_id() == user_id).collect())
    }

    async fn list_templates(&self, user_id: i64) -> Result<Vec<Recipe>, DomainError> {
        let all = self.list_by_user(user_id).await?;
        Ok(all.into_iter().filter(|r| r.is_template()).collect())
    }

    async fn create(&self, recipe: Recipe) -> Result<Recipe, DomainError> {
        recipe.validate_step_orders()?;

        let id = self.recipe_ids.next(&self.storage).await?;
        let mut recipe = recipe.with_id(RecipeId::new(id));

        let unassigned = recipe
            .steps()
            .iter()
            .filter(|s| s.id() == StepId::default())
            .count();
        if unassigned > 0 {
            let first = self
                .step_ids
                .allocate(unassigned, || self.highest_step_id())
                .await?;
            let mut next = first;
            recipe.assign_step_ids(|| {
                let id = StepId::new(next);
                next += 1;
                id
            });
        }

        self.storage.create(recipe).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recipe::Step;
    use crate::infrastructure::storage::InMemoryStorage;

    fn create_repo() -> StorageRecipeRepository {
        let storage = Arc::new(InMemoryStorage::<Recipe>::new());
        StorageRecipeRepository::new(storage)
    }

    fn recipe(user_id: i64, name: &str) -> Recipe {
        Recipe::new(user_id, name).with_steps(vec![
            Step::ai(1, "Summarize", "Summarize {{topic}}"),
            Step::ai(2, "Expand", "Expand: {{step_1_output}}"),
        ])
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let repo = create_repo();

        let first = repo.create(recipe(1, "One")).await.unwrap();
        let second = repo.create(recipe(1, "Two")).await.unwrap();

        assert_eq!(first.id(), RecipeId::new(1));
        assert_eq!(second.id(), RecipeId::new(2));
        let step_ids: Vec<i64> = first
            .steps()
            .iter()
            .chain(second.steps())
            .map(|s| s.id().value())
            .collect();
        assert_eq!(step_ids, vec![1, 2, 3, 4]);

        let fetched = repo.get(first.id()).await.unwrap().unwrap();
        assert_eq!(fetched.steps()[1].name(), "Expand");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_orders() {
        let repo = create_repo();
        let broken = Recipe::new(1, "Broken").with_steps(vec![Step::ai(2, "Only", "x")]);

        let err = repo.create(broken).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_templates_by_user() {
        let repo = create_repo();
        repo.create(recipe(1, "Mine").as_template(true)).await.unwrap();
        repo.create(recipe(1, "Draft")).await.unwrap();
        repo.create(recipe(2, "Theirs").as_template(true)).await.unwrap();

        let templates = repo.list_templates(1).await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name(), "Mine");
        assert_eq!(repo.list_by_user(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ids_continue_after_existing_rows() {
        let mut existing = recipe(1, "Seeded").with_id(RecipeId::new(5));
        existing.assign_step_ids({
            let mut next = 40;
            move || {
                next += 1;
                StepId::new(next)
            }
        });
        let storage = Arc::new(InMemoryStorage::with_entities(vec![existing]));
        let repo = StorageRecipeRepository::new(storage);

        let created = repo.create(recipe(1, "New")).await.unwrap();
        assert_eq!(created.id(), RecipeId::new(6));
        assert_eq!(created.steps()[0].id(), StepId::new(43));
    }
}
