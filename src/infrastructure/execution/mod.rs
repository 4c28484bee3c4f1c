//! Execution persistence

mod storage_repository;

pub use storage_repository::{
    StorageExecutionInputRepository, StorageExecutionRepository, StorageStepExecutionRepository,
};
