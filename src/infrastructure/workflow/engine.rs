//! Workflow execution engine
//!
//! Drives a recipe through its steps one at a time, pausing after every step
//! until a human approves, rejects or retries it. Every mutation of one
//! execution is serialized through a per-execution async mutex.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::execution::{
    ExecutionId, ExecutionInput, ExecutionInputRecord, ExecutionInputRepository,
    ExecutionRepository, ExecutionResult, ExecutionStatus, StepExecution, StepExecutionId,
    StepExecutionRepository, StepExecutionStatus, StepRef, StepSummary, WorkflowExecution,
};
use crate::domain::executor::{
    cancellation_pair, CancellationHandle, CancellationSignal, ExecutionContext,
    ExecutorOutcome, ExecutorRegistry,
};
use crate::domain::prompt::{is_blank, PromptCompiler};
use crate::domain::recipe::{Recipe, RecipeId, RecipeRepository, Step};
use crate::domain::workflow::{UnresolvedVariablePolicy, WorkflowError};
use crate::domain::DomainError;

/// Engine behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub unresolved_variable_policy: UnresolvedVariablePolicy,
}

/// Repositories the engine reads and writes
#[derive(Debug, Clone)]
pub struct EngineRepositories {
    pub recipes: Arc<dyn RecipeRepository>,
    pub executions: Arc<dyn ExecutionRepository>,
    pub step_executions: Arc<dyn StepExecutionRepository>,
    pub input_records: Arc<dyn ExecutionInputRepository>,
}

/// Step definitions an execution runs, either the recipe's or custom ones
#[derive(Debug)]
struct StepPlan {
    steps: Vec<Step>,
    adhoc: bool,
}

impl StepPlan {
    fn find(&self, step_ref: StepRef, order: u32) -> Option<&Step> {
        let by_ref = match step_ref {
            StepRef::Persisted(id) if !self.adhoc => self.steps.iter().find(|s| s.id() == id),
            StepRef::Adhoc(index) if self.adhoc => self.steps.get(index),
            _ => None,
        };

        by_ref.or_else(|| self.steps.iter().find(|s| s.order() == order))
    }
}

/// How a step run ended, for the caller's result
#[derive(Debug, Default)]
struct RunReport {
    error: Option<String>,
    unresolved: Vec<String>,
}

/// The workflow execution engine
#[derive(Debug)]
pub struct WorkflowEngine {
    repos: EngineRepositories,
    registry: Arc<ExecutorRegistry>,
    compiler: PromptCompiler,
    config: EngineConfig,
    locks: Mutex<HashMap<ExecutionId, Arc<Mutex<()>>>>,
    cancellations: Mutex<HashMap<ExecutionId, CancellationHandle>>,
}

impl WorkflowEngine {
    pub fn new(
        repos: EngineRepositories,
        registry: Arc<ExecutorRegistry>,
        compiler: PromptCompiler,
        config: EngineConfig,
    ) -> Self {
        Self {
            repos,
            registry,
            compiler,
            config,
            locks: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Validates inputs, creates the execution and runs its first step
    pub async fn start_execution(
        &self,
        recipe_id: RecipeId,
        user_id: i64,
        inputs: HashMap<String, Value>,
        custom_steps: Option<Vec<Step>>,
    ) -> ExecutionResult {
        match self
            .try_start(recipe_id, user_id, inputs, custom_steps)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(recipe_id = %recipe_id, user_id, error = %e, "Failed to start execution");
                failure_result(ExecutionId::default(), e)
            }
        }
    }

    /// Accepts a step awaiting review and moves on to the next one
    pub async fn approve_step(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
        user_id: i64,
    ) -> ExecutionResult {
        let lock = self.execution_lock(execution_id).await;
        let guard = lock.lock().await;

        let result = match self
            .try_approve(execution_id, step_execution_id, user_id)
            .await
        {
            Ok(result) => result,
            Err(e) => self.error_result(execution_id, e).await,
        };

        drop(guard);
        self.unlock(execution_id, lock).await;
        result
    }

    /// Sends a step back to pending without running anything
    pub async fn reject_step(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
    ) -> ExecutionResult {
        let lock = self.execution_lock(execution_id).await;
        let guard = lock.lock().await;

        let result = match self.try_reject(execution_id, step_execution_id).await {
            Ok(result) => result,
            Err(e) => self.error_result(execution_id, e).await,
        };

        drop(guard);
        self.unlock(execution_id, lock).await;
        result
    }

    /// Re-runs one step, optionally with an edited prompt or new inputs
    pub async fn retry_step(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
        user_id: i64,
        modified_prompt: Option<String>,
        modified_inputs: Option<HashMap<String, Value>>,
    ) -> ExecutionResult {
        let lock = self.execution_lock(execution_id).await;
        let guard = lock.lock().await;

        let result = match self
            .try_retry(
                execution_id,
                step_execution_id,
                user_id,
                modified_prompt,
                modified_inputs,
            )
            .await
        {
            Ok(result) => result,
            Err(e) => self.error_result(execution_id, e).await,
        };

        drop(guard);
        self.unlock(execution_id, lock).await;
        result
    }

    /// Current state of an execution
    pub async fn get_execution_status(&self, execution_id: ExecutionId) -> ExecutionResult {
        let outcome = async {
            let execution = self.load_execution(execution_id).await?;
            self.project(&execution).await
        }
        .await;

        outcome.unwrap_or_else(|e| failure_result(execution_id, e))
    }

    /// Signals any in-flight step of the execution and marks it cancelled
    pub async fn cancel_execution(&self, execution_id: ExecutionId) -> ExecutionResult {
        if let Some(handle) = self.cancellations.lock().await.get(&execution_id) {
            handle.cancel();
        }

        let lock = self.execution_lock(execution_id).await;
        let guard = lock.lock().await;

        let outcome = async {
            let mut execution = self.load_execution(execution_id).await?;
            ensure_active(&execution)?;

            execution.cancel();
            self.save_execution(&execution).await?;
            info!(execution_id = %execution_id, "Execution cancelled");
            self.project(&execution).await
        }
        .await;

        drop(guard);
        self.unlock(execution_id, lock).await;

        match outcome {
            Ok(result) => result,
            Err(e) => self.error_result(execution_id, e).await,
        }
    }

    async fn try_start(
        &self,
        recipe_id: RecipeId,
        user_id: i64,
        inputs: HashMap<String, Value>,
        custom_steps: Option<Vec<Step>>,
    ) -> Result<ExecutionResult, WorkflowError> {
        let recipe = self.load_recipe(recipe_id).await?;

        let custom_steps = match custom_steps {
            Some(steps) => {
                let ordered = Recipe::new(user_id, recipe.name()).with_steps(steps);
                ordered.validate_step_orders()?;
                Some(ordered.steps().to_vec())
            }
            None => None,
        };

        let plan = StepPlan {
            adhoc: custom_steps.is_some(),
            steps: custom_steps
                .clone()
                .unwrap_or_else(|| recipe.steps().to_vec()),
        };
        if plan.steps.is_empty() {
            return Err(WorkflowError::validation(format!(
                "Recipe {} has no steps",
                recipe_id
            )));
        }

        let missing = self.missing_inputs(&plan.steps, &inputs);
        if !missing.is_empty() {
            return Err(WorkflowError::unresolved(missing));
        }

        let mut input = ExecutionInput::new(inputs);
        if let Some(steps) = custom_steps {
            input = input.with_step_overrides(steps);
        }

        let execution = self
            .repos
            .executions
            .create(WorkflowExecution::new(recipe_id, user_id, input))
            .await
            .map_err(|e| storage_error("create execution", e))?;
        let execution_id = execution.id();

        for (index, step) in plan.steps.iter().enumerate() {
            let step_ref = if plan.adhoc {
                StepRef::Adhoc(index)
            } else {
                StepRef::Persisted(step.id())
            };
            self.repos
                .step_executions
                .create(StepExecution::new(execution_id, step_ref, step.order()))
                .await
                .map_err(|e| storage_error("create step execution", e))?;
        }

        info!(
            execution_id = %execution_id,
            recipe_id = %recipe_id,
            steps = plan.steps.len(),
            adhoc = plan.adhoc,
            "Execution started"
        );

        let lock = self.execution_lock(execution_id).await;
        let guard = lock.lock().await;
        let mut execution = execution;

        let result = match self.advance(&mut execution, user_id).await {
            Ok(result) => result,
            Err(e) => self.error_result(execution_id, e).await,
        };

        drop(guard);
        self.unlock(execution_id, lock).await;
        Ok(result)
    }

    async fn try_approve(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
        user_id: i64,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut execution = self.load_execution(execution_id).await?;
        ensure_active(&execution)?;

        let mut step_execution = self
            .load_step_execution(execution_id, step_execution_id)
            .await?;
        if step_execution.status() != StepExecutionStatus::AwaitingReview {
            return Err(WorkflowError::validation(format!(
                "Step execution {} is {}, not awaiting review",
                step_execution_id,
                step_execution.status().as_str()
            )));
        }

        step_execution.approve();
        self.save_step_execution(&step_execution).await?;
        info!(
            execution_id = %execution_id,
            step_execution_id = %step_execution_id,
            order = step_execution.step_order(),
            "Step approved"
        );

        self.advance(&mut execution, user_id).await
    }

    async fn try_reject(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut execution = self.load_execution(execution_id).await?;
        ensure_active(&execution)?;

        let mut step_execution = self
            .load_step_execution(execution_id, step_execution_id)
            .await?;
        if !matches!(
            step_execution.status(),
            StepExecutionStatus::AwaitingReview | StepExecutionStatus::Failed
        ) {
            return Err(WorkflowError::validation(format!(
                "Step execution {} is {} and cannot be rejected",
                step_execution_id,
                step_execution.status().as_str()
            )));
        }

        step_execution.reject();
        execution.step_back();
        self.save_step_execution(&step_execution).await?;
        self.save_execution(&execution).await?;
        info!(
            execution_id = %execution_id,
            step_execution_id = %step_execution_id,
            current_step = execution.current_step(),
            "Step rejected"
        );

        self.project(&execution).await
    }

    async fn try_retry(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
        user_id: i64,
        modified_prompt: Option<String>,
        modified_inputs: Option<HashMap<String, Value>>,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut execution = self.load_execution(execution_id).await?;
        if matches!(
            execution.status(),
            ExecutionStatus::Completed | ExecutionStatus::Cancelled
        ) {
            return Err(inactive_error(&execution));
        }

        let mut step_execution = self
            .load_step_execution(execution_id, step_execution_id)
            .await?;
        if matches!(
            step_execution.status(),
            StepExecutionStatus::Running | StepExecutionStatus::Completed
        ) {
            return Err(WorkflowError::validation(format!(
                "Step execution {} is {} and cannot be retried",
                step_execution_id,
                step_execution.status().as_str()
            )));
        }

        let step_executions = self.list_step_executions(execution_id).await?;
        if let Some(open) = step_executions.iter().find(|s| {
            s.step_order() < step_execution.step_order()
                && s.status() != StepExecutionStatus::Completed
        }) {
            return Err(WorkflowError::validation(format!(
                "Step {} cannot run before step {} is approved",
                step_execution.step_order(),
                open.step_order()
            )));
        }

        if let Some(overrides) = modified_inputs.filter(|m| !m.is_empty()) {
            execution.merge_inputs(&overrides);
            self.save_execution(&execution).await?;
            self.repos
                .input_records
                .append(ExecutionInputRecord::new(execution_id, overrides))
                .await
                .map_err(|e| storage_error("append input record", e))?;
            debug!(execution_id = %execution_id, "Recorded retry input overrides");
        }

        let plan = self.plan_for(&execution).await?;
        let Some(step) = plan
            .find(step_execution.step_ref(), step_execution.step_order())
            .cloned()
        else {
            return self
                .fail_missing_step(&mut execution, &mut step_execution)
                .await;
        };

        info!(
            execution_id = %execution_id,
            step_execution_id = %step_execution_id,
            prompt_override = modified_prompt.is_some(),
            "Retrying step"
        );
        let report = self
            .run_step(
                &mut execution,
                &mut step_execution,
                &step,
                user_id,
                modified_prompt,
            )
            .await?;

        self.finish(&execution, report).await
    }

    /// Runs the next pending step, or completes the execution
    async fn advance(
        &self,
        execution: &mut WorkflowExecution,
        user_id: i64,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut step_executions = self.list_step_executions(execution.id()).await?;
        step_executions.sort_by_key(StepExecution::step_order);

        let Some(next) = step_executions
            .iter()
            .find(|s| s.status() != StepExecutionStatus::Completed)
        else {
            execution.complete();
            self.save_execution(execution).await?;
            info!(execution_id = %execution.id(), "Execution completed");
            return self.project(execution).await;
        };

        if next.status() != StepExecutionStatus::Pending {
            debug!(
                execution_id = %execution.id(),
                order = next.step_order(),
                status = next.status().as_str(),
                "Earlier step still open, not advancing"
            );
            return self.project(execution).await;
        }
        let mut step_execution = next.clone();

        let plan = self.plan_for(execution).await?;
        let Some(step) = plan
            .find(step_execution.step_ref(), step_execution.step_order())
            .cloned()
        else {
            return self.fail_missing_step(execution, &mut step_execution).await;
        };

        let report = self
            .run_step(execution, &mut step_execution, &step, user_id, None)
            .await?;

        self.finish(execution, report).await
    }

    /// Dispatches one step to its executor and records the outcome
    async fn run_step(
        &self,
        execution: &mut WorkflowExecution,
        step_execution: &mut StepExecution,
        step: &Step,
        user_id: i64,
        prompt_override: Option<String>,
    ) -> Result<RunReport, WorkflowError> {
        let execution_id = execution.id();
        let order = step_execution.step_order();

        let Some(executor) = self.registry.resolve(step.step_type()).await else {
            let message = format!("No executor registered for step type '{}'", step.step_type());
            step_execution.fail(message.clone(), None);
            execution.fail(message.clone());
            self.save_step_execution(step_execution).await?;
            self.save_execution(execution).await?;
            error!(execution_id = %execution_id, order, "{}", message);
            return Ok(RunReport {
                error: Some(message),
                ..Default::default()
            });
        };

        let report = executor.validate_config(step);
        if !report.valid {
            let message = format!(
                "Step {} ({}) has invalid configuration: {}",
                order,
                step.name(),
                report.errors.join("; ")
            );
            step_execution.fail(message.clone(), None);
            execution.fail(message.clone());
            self.save_step_execution(step_execution).await?;
            self.save_execution(execution).await?;
            warn!(execution_id = %execution_id, order, "Step configuration invalid");
            return Ok(RunReport {
                error: Some(message),
                ..Default::default()
            });
        }

        let cancellation = self.cancellation_signal(execution_id).await;
        step_execution.start();
        execution.start_step(order);
        self.save_step_execution(step_execution).await?;
        self.save_execution(execution).await?;
        info!(
            execution_id = %execution_id,
            order,
            step_type = executor.step_type(),
            "Running step"
        );

        let context = ExecutionContext {
            user_id,
            execution_id,
            step_execution: step_execution.clone(),
            user_inputs: execution.input().user_inputs.clone(),
            step_executions: self.list_step_executions(execution_id).await?,
            prompt_override,
            cancellation,
        };

        let outcome = tokio::select! {
            biased;
            _ = context.cancellation.cancelled() => {
                ExecutorOutcome::from_error(WorkflowError::Cancelled)
            }
            outcome = executor.execute(step, &context) => outcome,
        };
        self.cancellations.lock().await.remove(&execution_id);

        let run = if outcome.success {
            step_execution.await_review(
                outcome.payload(),
                outcome.model_used.clone(),
                outcome.prompt_used.clone(),
            );
            execution.pause();
            info!(execution_id = %execution_id, order, "Step awaiting review");
            RunReport::default()
        } else {
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| format!("{} executor failed", executor.step_type()));
            step_execution.fail(message.clone(), outcome.prompt_used.clone());

            if !outcome.unresolved_variables.is_empty()
                && self.config.unresolved_variable_policy
                    == UnresolvedVariablePolicy::FailExecution
            {
                execution.fail(message.clone());
            } else {
                execution.pause();
            }
            warn!(execution_id = %execution_id, order, error = %message, "Step failed");

            RunReport {
                error: Some(message),
                unresolved: outcome.unresolved_variables,
            }
        };

        self.save_step_execution(step_execution).await?;
        self.save_execution(execution).await?;

        Ok(run)
    }

    async fn fail_missing_step(
        &self,
        execution: &mut WorkflowExecution,
        step_execution: &mut StepExecution,
    ) -> Result<ExecutionResult, WorkflowError> {
        let message = format!(
            "Step definition for step {} not found",
            step_execution.step_order()
        );
        step_execution.fail(message.clone(), None);
        execution.fail(message.clone());
        self.save_step_execution(step_execution).await?;
        self.save_execution(execution).await?;
        error!(execution_id = %execution.id(), "{}", message);

        self.finish(
            execution,
            RunReport {
                error: Some(message),
                ..Default::default()
            },
        )
        .await
    }

    async fn finish(
        &self,
        execution: &WorkflowExecution,
        report: RunReport,
    ) -> Result<ExecutionResult, WorkflowError> {
        let mut result = self.project(execution).await?;
        if let Some(error) = report.error {
            result = result.with_error(error);
        }
        Ok(result.with_unresolved(report.unresolved))
    }

    /// Required inputs that are absent or blank, in step order
    fn missing_inputs(&self, steps: &[Step], inputs: &HashMap<String, Value>) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();

        for step in steps {
            let declared = step.required_inputs().map(str::to_string);
            let referenced = step
                .prompt_template()
                .map(|template| self.compiler.user_input_variables(template))
                .unwrap_or_default();

            for name in declared.chain(referenced) {
                let present = inputs.get(&name).is_some_and(|value| !is_blank(value));
                if !present && !missing.contains(&name) {
                    missing.push(name);
                }
            }
        }

        missing
    }

    async fn project(&self, execution: &WorkflowExecution) -> Result<ExecutionResult, WorkflowError> {
        let step_executions = self.list_step_executions(execution.id()).await?;
        let plan = match self.plan_for(execution).await {
            Ok(plan) => plan,
            Err(WorkflowError::NotFound(_)) => StepPlan {
                steps: Vec::new(),
                adhoc: false,
            },
            Err(e) => return Err(e),
        };

        let steps = step_executions
            .iter()
            .map(|s| {
                let name = plan.find(s.step_ref(), s.step_order()).map(Step::name);
                StepSummary::from_step_execution(s, name)
            })
            .collect();

        Ok(ExecutionResult::from_execution(execution, steps))
    }

    async fn plan_for(&self, execution: &WorkflowExecution) -> Result<StepPlan, WorkflowError> {
        if let Some(steps) = execution.input().step_overrides.clone() {
            return Ok(StepPlan { steps, adhoc: true });
        }

        let recipe = self.load_recipe(execution.recipe_id()).await?;
        Ok(StepPlan {
            steps: recipe.steps().to_vec(),
            adhoc: false,
        })
    }

    /// Failure result that still carries the execution state when it exists
    async fn error_result(&self, execution_id: ExecutionId, e: WorkflowError) -> ExecutionResult {
        let unresolved = e.unresolved_names().map(<[String]>::to_vec).unwrap_or_default();

        match self.repos.executions.get(execution_id).await {
            Ok(Some(execution)) => match self.project(&execution).await {
                Ok(result) => result.with_error(e.to_string()).with_unresolved(unresolved),
                Err(_) => failure_result(execution_id, e),
            },
            _ => failure_result(execution_id, e),
        }
    }

    async fn load_recipe(&self, recipe_id: RecipeId) -> Result<Recipe, WorkflowError> {
        self.repos
            .recipes
            .get(recipe_id)
            .await
            .map_err(|e| storage_error("load recipe", e))?
            .ok_or_else(|| WorkflowError::not_found(format!("Recipe {} not found", recipe_id)))
    }

    async fn load_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<WorkflowExecution, WorkflowError> {
        self.repos
            .executions
            .get(execution_id)
            .await
            .map_err(|e| storage_error("load execution", e))?
            .ok_or_else(|| {
                WorkflowError::not_found(format!("Execution {} not found", execution_id))
            })
    }

    async fn load_step_execution(
        &self,
        execution_id: ExecutionId,
        step_execution_id: StepExecutionId,
    ) -> Result<StepExecution, WorkflowError> {
        let step_execution = self
            .repos
            .step_executions
            .get(step_execution_id)
            .await
            .map_err(|e| storage_error("load step execution", e))?
            .ok_or_else(|| {
                WorkflowError::not_found(format!(
                    "Step execution {} not found",
                    step_execution_id
                ))
            })?;

        if step_execution.execution_id() != execution_id {
            return Err(WorkflowError::validation(format!(
                "Step execution {} does not belong to execution {}",
                step_execution_id, execution_id
            )));
        }

        Ok(step_execution)
    }

    async fn list_step_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<StepExecution>, WorkflowError> {
        self.repos
            .step_executions
            .list_by_execution(execution_id)
            .await
            .map_err(|e| storage_error("list step executions", e))
    }

    async fn save_execution(&self, execution: &WorkflowExecution) -> Result<(), WorkflowError> {
        self.repos
            .executions
            .update(execution)
            .await
            .map(|_| ())
            .map_err(|e| storage_error("update execution", e))
    }

    async fn save_step_execution(&self, step: &StepExecution) -> Result<(), WorkflowError> {
        self.repos
            .step_executions
            .update(step)
            .await
            .map(|_| ())
            .map_err(|e| storage_error("update step execution", e))
    }

    async fn execution_lock(&self, execution_id: ExecutionId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(execution_id)
            .or_default()
            .clone()
    }

    async fn cancellation_signal(&self, execution_id: ExecutionId) -> CancellationSignal {
        let mut cancellations = self.cancellations.lock().await;
        if let Some(handle) = cancellations.get(&execution_id) {
            return handle.signal();
        }

        let (handle, signal) = cancellation_pair();
        cancellations.insert(execution_id, handle);
        signal
    }

    /// Forgets the execution's mutex once no other caller holds or awaits it
    async fn unlock(&self, execution_id: ExecutionId, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().await;
        if locks
            .get(&execution_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&execution_id);
        }
    }
}

fn ensure_active(execution: &WorkflowExecution) -> Result<(), WorkflowError> {
    if execution.status().is_terminal() {
        return Err(inactive_error(execution));
    }
    Ok(())
}

fn inactive_error(execution: &WorkflowExecution) -> WorkflowError {
    WorkflowError::validation(format!(
        "Execution {} is {} and accepts no further actions",
        execution.id(),
        execution.status()
    ))
}

fn storage_error(operation: &str, e: DomainError) -> WorkflowError {
    error!(operation, error = %e, "Persistence failure");
    WorkflowError::from(e)
}

fn failure_result(execution_id: ExecutionId, e: WorkflowError) -> ExecutionResult {
    let unresolved = e.unresolved_names().map(<[String]>::to_vec).unwrap_or_default();
    let message = match &e {
        WorkflowError::UnresolvedVariables(names) => {
            format!("Missing required inputs: {}", names.join(", "))
        }
        other => other.to_string(),
    };

    ExecutionResult::failure(execution_id, message).with_unresolved(unresolved)
}
