//! Script step executor

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::executor::{
    ConfigField, ExecutionContext, ExecutorOutcome, StepExecutor, ValidationReport,
};
use crate::domain::recipe::Step;
use crate::domain::workflow::WorkflowError;

/// Supported script languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    #[serde(alias = "python3")]
    Python,
    #[serde(alias = "javascript", alias = "js")]
    Node,
    #[serde(alias = "sh", alias = "shell")]
    Bash,
}

impl ScriptLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Node => "node",
            Self::Bash => "bash",
        }
    }

    /// Flag that makes the interpreter run inline code
    fn inline_flag(&self) -> &'static str {
        match self {
            Self::Python | Self::Bash => "-c",
            Self::Node => "-e",
        }
    }
}

/// Interpreter paths and timeout limits for script steps
#[derive(Debug, Clone)]
pub struct ScriptRuntime {
    pub python: String,
    pub node: String,
    pub bash: String,
    pub default_timeout_seconds: u64,
    pub max_timeout_seconds: u64,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            node: "node".to_string(),
            bash: "bash".to_string(),
            default_timeout_seconds: 30,
            max_timeout_seconds: 300,
        }
    }
}

impl ScriptRuntime {
    fn interpreter(&self, language: ScriptLanguage) -> &str {
        match language {
            ScriptLanguage::Python => &self.python,
            ScriptLanguage::Node => &self.node,
            ScriptLanguage::Bash => &self.bash,
        }
    }
}

/// `executor_config` of a script step
#[derive(Debug, Clone, Deserialize)]
struct ScriptConfig {
    language: ScriptLanguage,
    code: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl ScriptConfig {
    fn parse(step: &Step) -> Result<Self, WorkflowError> {
        let raw = step
            .executor_config()
            .ok_or_else(|| WorkflowError::validation("executor_config is required"))?;

        serde_json::from_value(raw.clone())
            .map_err(|e| WorkflowError::validation(format!("Invalid executor_config: {}", e)))
    }
}

/// Process output of a finished script
#[derive(Debug)]
struct ScriptOutput {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Runs inline python, node or bash code with the execution state on stdin
#[derive(Debug, Default)]
pub struct ScriptExecutor {
    runtime: ScriptRuntime,
}

impl ScriptExecutor {
    pub fn new(runtime: ScriptRuntime) -> Self {
        Self { runtime }
    }

    fn timeout_for(&self, config: &ScriptConfig) -> Duration {
        let seconds = config
            .timeout_seconds
            .unwrap_or(self.runtime.default_timeout_seconds)
            .clamp(1, self.runtime.max_timeout_seconds.max(1));
        Duration::from_secs(seconds)
    }

    /// JSON document written to the script's stdin
    fn stdin_payload(context: &ExecutionContext) -> Value {
        let previous_outputs: Map<String, Value> = context
            .completed_outputs()
            .into_iter()
            .map(|(order, content)| (format!("step_{}_output", order), Value::String(content)))
            .collect();

        json!({
            "inputs": context.user_inputs,
            "previous_outputs": previous_outputs,
        })
    }

    async fn run(
        &self,
        config: &ScriptConfig,
        stdin: String,
        limit: Duration,
    ) -> Result<ScriptOutput, WorkflowError> {
        let interpreter = self.runtime.interpreter(config.language);

        let mut cmd = Command::new(interpreter);
        cmd.arg(config.language.inline_flag())
            .arg(&config.code)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            WorkflowError::executor("script", format!("Failed to start {}: {}", interpreter, e))
        })?;

        if let Some(mut input) = child.stdin.take() {
            tokio::spawn(async move {
                // Scripts that never read stdin close the pipe early
                let _ = input.write_all(stdin.as_bytes()).await;
            });
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_handle = tokio::spawn(async move {
            let mut output = String::new();
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    output.push_str(&line);
                    output.push('\n');
                }
            }
            output
        });

        let stderr_handle = tokio::spawn(async move {
            let mut output = String::new();
            if let Some(stderr) = stderr {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    output.push_str(&line);
                    output.push('\n');
                }
            }
            output
        });

        let status = match timeout(limit, child.wait()).await {
            Ok(status) => status.map_err(|e| {
                WorkflowError::executor("script", format!("Failed to wait for script: {}", e))
            })?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(WorkflowError::timeout("Script", limit.as_secs()));
            }
        };

        Ok(ScriptOutput {
            exit_code: status.code(),
            stdout: stdout_handle.await.unwrap_or_default(),
            stderr: stderr_handle.await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl StepExecutor for ScriptExecutor {
    fn step_type(&self) -> &'static str {
        "script"
    }

    fn description(&self) -> &'static str {
        "Runs inline python, node or bash code; stdout becomes the step output"
    }

    fn validate_config(&self, step: &Step) -> ValidationReport {
        match ScriptConfig::parse(step) {
            Ok(config) if config.code.trim().is_empty() => {
                ValidationReport::from_errors(vec!["executor_config.code is required".to_string()])
            }
            Ok(config) if config.timeout_seconds == Some(0) => ValidationReport::from_errors(
                vec!["executor_config.timeout_seconds must be positive".to_string()],
            ),
            Ok(_) => ValidationReport::ok(),
            Err(e) => ValidationReport::from_errors(vec![e.to_string()]),
        }
    }

    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutorOutcome {
        let config = match ScriptConfig::parse(step) {
            Ok(config) => config,
            Err(e) => return ExecutorOutcome::from_error(e),
        };
        let tool = format!("script:{}", config.language.as_str());
        let limit = self.timeout_for(&config);
        let stdin = Self::stdin_payload(context).to_string();

        debug!(
            step = %step.name(),
            language = config.language.as_str(),
            timeout_secs = limit.as_secs(),
            "Running script"
        );

        let output = match self.run(&config, stdin, limit).await {
            Ok(output) => output,
            Err(e) => {
                warn!(step = %step.name(), error = %e, "Script did not finish");
                return ExecutorOutcome::from_error(e).with_model(tool);
            }
        };

        if output.exit_code != Some(0) {
            let code = output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let detail = output.stderr.trim();
            let message = if detail.is_empty() {
                format!("Script exited with status {}", code)
            } else {
                format!("Script exited with status {}: {}", code, detail)
            };
            warn!(step = %step.name(), exit_code = %code, "Script failed");
            return ExecutorOutcome::from_error(WorkflowError::executor("script", message))
                .with_model(tool);
        }

        let mut outcome = ExecutorOutcome::ok(output.stdout.trim_end())
            .with_metadata("language", json!(config.language.as_str()))
            .with_metadata("exit_code", json!(0))
            .with_model(tool);
        if !output.stderr.trim().is_empty() {
            outcome = outcome.with_metadata("stderr", json!(output.stderr.trim_end()));
        }

        outcome
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::required("executor_config.language", "string", "python, node or bash"),
            ConfigField::required(
                "executor_config.code",
                "string",
                "Inline code; reads {inputs, previous_outputs} JSON from stdin",
            ),
            ConfigField::optional("executor_config.timeout_seconds", "integer", "Kill the script after this many seconds"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::template::test_support::context;
    use super::*;

    fn bash_step(code: &str) -> Step {
        Step::new(1, "Script", "script")
            .with_executor_config(json!({"language": "bash", "code": code}))
    }

    #[test]
    fn test_validate_config() {
        let executor = ScriptExecutor::default();

        assert!(executor.validate_config(&bash_step("echo hi")).valid);
        assert!(!executor.validate_config(&bash_step("  ")).valid);
        assert!(!executor.validate_config(&Step::new(1, "None", "script")).valid);

        let ruby = Step::new(1, "Ruby", "script")
            .with_executor_config(json!({"language": "ruby", "code": "puts 1"}));
        let report = executor.validate_config(&ruby);
        assert!(!report.valid);
        assert!(report.errors[0].contains("Invalid executor_config"));
    }

    #[test]
    fn test_timeout_is_clamped() {
        let executor = ScriptExecutor::default();
        let config = ScriptConfig {
            language: ScriptLanguage::Bash,
            code: "true".to_string(),
            timeout_seconds: Some(10_000),
        };

        assert_eq!(executor.timeout_for(&config), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_stdout_becomes_content() {
        let executor = ScriptExecutor::default();

        let outcome = executor
            .execute(&bash_step("echo hello; echo world"), &context(&[], &[]))
            .await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.content, "hello\nworld");
        assert_eq!(outcome.model_used.as_deref(), Some("script:bash"));
    }

    #[tokio::test]
    async fn test_stdin_carries_inputs_and_previous_outputs() {
        let executor = ScriptExecutor::default();
        let ctx = context(&[("topic", json!("cats"))], &[(1, "summary")]);

        let outcome = executor.execute(&bash_step("cat"), &ctx).await;

        assert!(outcome.success, "{:?}", outcome.error);
        let payload: Value = serde_json::from_str(&outcome.content).unwrap();
        assert_eq!(payload["inputs"]["topic"], "cats");
        assert_eq!(payload["previous_outputs"]["step_1_output"], "summary");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let executor = ScriptExecutor::default();

        let outcome = executor
            .execute(&bash_step("echo broken >&2; exit 3"), &context(&[], &[]))
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("script executor failed: Script exited with status 3: broken")
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_script() {
        let executor = ScriptExecutor::default();
        let step = Step::new(1, "Slow", "script").with_executor_config(json!({
            "language": "bash",
            "code": "sleep 5",
            "timeout_seconds": 1
        }));

        let outcome = executor.execute(&step, &context(&[], &[])).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Script timed out after 1s"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails() {
        let executor = ScriptExecutor::new(ScriptRuntime {
            bash: "/nonexistent/bash".to_string(),
            ..Default::default()
        });

        let outcome = executor
            .execute(&bash_step("echo hi"), &context(&[], &[]))
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Failed to start /nonexistent/bash"));
    }
}
