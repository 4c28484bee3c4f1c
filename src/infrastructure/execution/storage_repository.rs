//! Storage-backed execution repositories

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::execution::{
    ExecutionId, ExecutionInputRecord, ExecutionInputRepository, ExecutionRepository,
    InputRecordId, StepExecution, StepExecutionId, StepExecutionRepository, WorkflowExecution,
};
use crate::domain::storage::Storage;
use crate::domain::DomainError;
use crate::infrastructure::storage::IdSequence;

/// Storage-backed implementation of ExecutionRepository
#[derive(Debug)]
pub struct StorageExecutionRepository {
    storage: Arc<dyn Storage<WorkflowExecution>>,
    ids: IdSequence,
}

impl StorageExecutionRepository {
    pub fn new(storage: Arc<dyn Storage<WorkflowExecution>>) -> Self {
        Self {
            storage,
            ids: IdSequence::new(),
        }
    }
}

#[async_trait]
impl ExecutionRepository for StorageExecutionRepository {
    async fn get(&self, id: ExecutionId) -> Result<Option<WorkflowExecution>, DomainError> {
        self.storage.get(&id).await
    }

    async fn create(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, DomainError> {
        let id = self.ids.next(&self.storage).await?;
        self.storage.create(execution.with_id(ExecutionId::new(id))).await
    }

    async fn update(
        &self,
        execution: &WorkflowExecution,
    ) -> Result<WorkflowExecution, DomainError> {
        self.storage.update(execution.clone()).await
    }
}

/// Storage-backed implementation of StepExecutionRepository
#[derive(Debug)]
pub struct StorageStepExecutionRepository {
    storage: Arc<dyn Storage<StepExecution>>,
    ids: IdSequence,
}

impl StorageStepExecutionRepository {
    pub fn new(storage: Arc<dyn Storage<StepExecution>>) -> Self {
        Self {
            storage,
            ids: IdSequence::new(),
        }
    }
}

#[async_trait]
impl StepExecutionRepository for StorageStepExecutionRepository {
    async fn get(&self, id: StepExecutionId) -> Result<Option<StepExecution>, DomainError> {
        self.storage.get(&id).await
    }

    async fn list_by_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<StepExecution>, DomainError> {
        let all = self.storage.list().await?;
        let mut steps: Vec<StepExecution> = all
            .into_iter()
            .filter(|s| s.execution_id() == execution_id)
            .collect();
        steps.sort_by_key(|s| (s.step_order(), s.id()));
        Ok(steps)
    }

    async fn create(&self, step: StepExecution) -> Result<StepExecution, DomainError> {
        let id = self.ids.next(&self.storage).await?;
        self.storage.create(step.with_id(StepExecutionId::new(id))).await
    }

    async fn update(&self, step: &StepExecution) -> Result<StepExecution, DomainError> {
        self.storage.update(step.clone()).await
    }
}

/// Storage-backed implementation of ExecutionInputRepository
#[derive(Debug)]
pub struct StorageExecutionInputRepository {
    storage: Arc<dyn Storage<ExecutionInputRecord>>,
    ids: IdSequence,
}

impl StorageExecutionInputRepository {
    pub fn new(storage: Arc<dyn Storage<ExecutionInputRecord>>) -> Self {
        Self {
            storage,
            ids: IdSequence::new(),
        }
    }
}

#[async_trait]
impl ExecutionInputRepository for StorageExecutionInputRepository {
    async fn append(
        &self,
        record: ExecutionInputRecord,
    ) -> Result<ExecutionInputRecord, DomainError> {
        let id = self.ids.next(&self.storage).await?;
        self.storage.create(record.with_id(InputRecordId::new(id))).await
    }

    async fn list_by_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<ExecutionInputRecord>, DomainError> {
        let all = self.storage.list().await?;
        Ok(all
            .into_iter()
            .filter(|r| r.execution_id() == execution_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{ExecutionInput, ExecutionStatus, StepRef};
    use crate::domain::recipe::{RecipeId, StepId};
    use crate::infrastructure::storage::InMemoryStorage;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_execution_create_and_update() {
        let repo = StorageExecutionRepository::new(Arc::new(InMemoryStorage::<WorkflowExecution>::new()));

        let mut execution = repo
            .create(WorkflowExecution::new(RecipeId::new(1), 1, ExecutionInput::default()))
            .await
            .unwrap();
        assert_eq!(execution.id(), ExecutionId::new(1));

        execution.pause();
        repo.update(&execution).await.unwrap();

        let fetched = repo.get(execution.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status(), ExecutionStatus::Paused);
    }

    #[tokio::test]
    async fn test_update_unknown_execution_fails() {
        let repo = StorageExecutionRepository::new(Arc::new(InMemoryStorage::<WorkflowExecution>::new()));
        let ghost = WorkflowExecution::new(RecipeId::new(1), 1, ExecutionInput::default())
            .with_id(ExecutionId::new(99));

        assert!(repo.update(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn test_step_executions_listed_in_order() {
        let repo = StorageStepExecutionRepository::new(Arc::new(InMemoryStorage::<StepExecution>::new()));
        let execution_id = ExecutionId::new(1);

        for order in [2, 1, 3] {
            repo.create(StepExecution::new(
                execution_id,
                StepRef::Persisted(StepId::new(order as i64)),
                order,
            ))
            .await
            .unwrap();
        }
        repo.create(StepExecution::new(ExecutionId::new(2), StepRef::Adhoc(0), 1))
            .await
            .unwrap();

        let orders: Vec<u32> = repo
            .list_by_execution(execution_id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.step_order())
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_input_records_append() {
        let repo = StorageExecutionInputRepository::new(Arc::new(InMemoryStorage::<ExecutionInputRecord>::new()));
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), json!("dogs"));

        let first = repo
            .append(ExecutionInputRecord::new(ExecutionId::new(3), inputs.clone()))
            .await
            .unwrap();
        repo.append(ExecutionInputRecord::new(ExecutionId::new(3), inputs))
            .await
            .unwrap();

        assert_eq!(first.id(), InputRecordId::new(1));
        assert_eq!(repo.list_by_execution(ExecutionId::new(3)).await.unwrap().len(), 2);
        assert!(repo.list_by_execution(ExecutionId::new(4)).await.unwrap().is_empty());
    }
}
