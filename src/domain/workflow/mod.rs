//! Workflow domain - engine error taxonomy and failure policy

mod error;
mod policy;

pub use error::WorkflowError;
pub use policy::UnresolvedVariablePolicy;
