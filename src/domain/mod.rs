//! Domain layer - Core business logic and entities

pub mod ai;
pub mod assistant;
pub mod error;
pub mod execution;
pub mod executor;
pub mod prompt;
pub mod recipe;
pub mod scraping;
pub mod standard;
pub mod storage;
pub mod workflow;

pub use ai::{AiCallConfig, AiCallResult, AiClient, Message, MessageRole, PromptImage, Usage};
pub use error::DomainError;
pub use execution::{
    ExecutionId, ExecutionInput, ExecutionResult, ExecutionStatus, StepExecution,
    StepExecutionId, StepExecutionStatus, StepRef, WorkflowExecution,
};
pub use executor::{
    ExecutionContext, ExecutorOutcome, ExecutorRegistry, StepExecutor, ValidationReport,
};
pub use prompt::{CompileContext, CompiledPrompt, PromptCompiler};
pub use recipe::{Recipe, RecipeId, Step, StepId, StepType};
pub use scraping::{ScrapeRequest, ScrapeResult, ScrapingClient};
pub use standard::{CompanyStandard, StandardKind, StandardResolver};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use workflow::{UnresolvedVariablePolicy, WorkflowError};
