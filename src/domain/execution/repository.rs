//! Execution repository traits

use async_trait::async_trait;

use super::entity::{
    ExecutionId, ExecutionInputRecord, StepExecution, StepExecutionId, WorkflowExecution,
};
use crate::domain::DomainError;

/// Repository trait for workflow executions
#[async_trait]
pub trait ExecutionRepository: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: ExecutionId) -> Result<Option<WorkflowExecution>, DomainError>;

    /// Store a new execution, allocating its id
    async fn create(&self, execution: WorkflowExecution)
    -> Result<WorkflowExecution, DomainError>;

    async fn update(&self, execution: &WorkflowExecution)
    -> Result<WorkflowExecution, DomainError>;
}

/// Repository trait for step executions
#[async_trait]
pub trait StepExecutionRepository: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: StepExecutionId) -> Result<Option<StepExecution>, DomainError>;

    /// Step executions of one execution, ordered by step order
    async fn list_by_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<StepExecution>, DomainError>;

    /// Store a new step execution, allocating its id
    async fn create(&self, step: StepExecution) -> Result<StepExecution, DomainError>;

    async fn update(&self, step: &StepExecution) -> Result<StepExecution, DomainError>;
}

/// Append-only log of input revisions per execution
#[async_trait]
pub trait ExecutionInputRepository: Send + Sync + std::fmt::Debug {
    async fn append(
        &self,
        record: ExecutionInputRecord,
    ) -> Result<ExecutionInputRecord, DomainError>;

    async fn list_by_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<ExecutionInputRecord>, DomainError>;
}
