//! Workflow infrastructure implementations

mod engine;

pub use engine::{EngineConfig, EngineRepositories, WorkflowEngine};
