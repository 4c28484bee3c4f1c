//! Workflow error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while driving a workflow execution
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unresolved variables: {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    #[error("{step_type} executor failed: {message}")]
    Executor { step_type: String, message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Execution was cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unresolved(names: Vec<String>) -> Self {
        Self::UnresolvedVariables(names)
    }

    pub fn executor(step_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Executor {
            step_type: step_type.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Unresolved variable names carried by this error, if any
    pub fn unresolved_names(&self) -> Option<&[String]> {
        match self {
            Self::UnresolvedVariables(names) => Some(names),
            _ => None,
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { message } => Self::NotFound(message),
            DomainError::Validation { message } => Self::Validation(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::unresolved(vec!["topic".to_string(), "tone".to_string()]);
        assert_eq!(err.to_string(), "Unresolved variables: topic, tone");

        let err = WorkflowError::executor("script", "exit status 2");
        assert_eq!(err.to_string(), "script executor failed: exit status 2");

        let err = WorkflowError::timeout("http request", 30);
        assert_eq!(err.to_string(), "http request timed out after 30s");
    }

    #[test]
    fn test_from_domain_error() {
        let err: WorkflowError = DomainError::not_found("Recipe 3 not found").into();
        assert_eq!(err, WorkflowError::not_found("Recipe 3 not found"));

        let err: WorkflowError = DomainError::storage("pool closed").into();
        assert!(matches!(err, WorkflowError::Storage(_)));
    }

    #[test]
    fn test_unresolved_names() {
        let err = WorkflowError::unresolved(vec!["topic".to_string()]);
        assert_eq!(err.unresolved_names(), Some(&["topic".to_string()][..]));
        assert_eq!(WorkflowError::Cancelled.unresolved_names(), None);
    }
}
