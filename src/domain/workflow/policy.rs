//! How the engine treats a step whose prompt still has unresolved variables

use serde::{Deserialize, Serialize};

/// Execution outcome when a step cannot resolve all of its variables
///
/// The step execution itself is always marked failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedVariablePolicy {
    /// The whole execution fails and accepts no further actions
    #[default]
    FailExecution,
    /// The execution pauses so the step can be retried with new inputs
    PauseExecution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config_string() {
        let policy: UnresolvedVariablePolicy =
            serde_json::from_str("\"pause_execution\"").unwrap();
        assert_eq!(policy, UnresolvedVariablePolicy::PauseExecution);
        assert_eq!(
            UnresolvedVariablePolicy::default(),
            UnresolvedVariablePolicy::FailExecution
        );
    }
}
