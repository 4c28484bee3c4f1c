//! Execution domain - workflow runs, step outcomes and result projections

mod entity;
mod repository;
mod result;

pub use entity::{
    ExecutionId, ExecutionInput, ExecutionInputRecord, ExecutionStatus, InputRecordId,
    StepExecution, StepExecutionId, StepExecutionStatus, StepRef, WorkflowExecution,
};
pub use repository::{ExecutionInputRepository, ExecutionRepository, StepExecutionRepository};
pub use result::{ExecutionResult, StepSummary, UNKNOWN_STEP_NAME};
