//! Template rendering shared by executors

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::executor::ExecutionContext;
use crate::domain::prompt::{CompileContext, CompiledPrompt, PromptCompiler, VariableKind};
use crate::domain::standard::{CompanyStandard, StandardRepository};
use crate::domain::workflow::WorkflowError;

/// Compiles templates against an execution context, loading the acting
/// user's company standards only when a template references one
pub struct TemplateRenderer {
    compiler: PromptCompiler,
    standards: Arc<dyn StandardRepository>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    pub fn new(compiler: PromptCompiler, standards: Arc<dyn StandardRepository>) -> Self {
        Self {
            compiler,
            standards,
        }
    }

    pub fn compiler(&self) -> &PromptCompiler {
        &self.compiler
    }

    fn references_standard(&self, templates: &[&str]) -> bool {
        templates.iter().any(|template| {
            PromptCompiler::extract_variables(template)
                .iter()
                .any(|name| matches!(self.compiler.classify(name), VariableKind::Standard(_)))
        })
    }

    async fn load_standards(
        &self,
        templates: &[&str],
        context: &ExecutionContext,
    ) -> Result<Vec<CompanyStandard>, WorkflowError> {
        if !self.references_standard(templates) {
            return Ok(Vec::new());
        }

        self.standards
            .list_by_user(context.user_id)
            .await
            .map_err(|e| {
                warn!(user_id = context.user_id, error = %e, "Failed to load company standards");
                WorkflowError::from(e)
            })
    }

    /// Compiles one template
    pub async fn render(
        &self,
        template: &str,
        context: &ExecutionContext,
    ) -> Result<CompiledPrompt, WorkflowError> {
        let standards = self.load_standards(&[template], context).await?;
        Ok(self.compile_with(template, context, &standards))
    }

    /// Compiles several templates, loading standards at most once
    pub async fn render_all(
        &self,
        templates: &[&str],
        context: &ExecutionContext,
    ) -> Result<Vec<CompiledPrompt>, WorkflowError> {
        let standards = self.load_standards(templates, context).await?;
        Ok(templates
            .iter()
            .map(|template| self.compile_with(template, context, &standards))
            .collect())
    }

    /// Compiles every string leaf of a JSON value in place, returning the
    /// unresolved names across all leaves
    pub async fn render_value(
        &self,
        value: &mut Value,
        context: &ExecutionContext,
    ) -> Result<Vec<String>, WorkflowError> {
        let mut leaves: Vec<String> = Vec::new();
        collect_strings(value, &mut leaves);
        let refs: Vec<&str> = leaves.iter().map(String::as_str).collect();
        let standards = self.load_standards(&refs, context).await?;

        let mut unresolved: Vec<String> = Vec::new();
        self.render_leaves(value, context, &standards, &mut unresolved);
        Ok(unresolved)
    }

    fn render_leaves(
        &self,
        value: &mut Value,
        context: &ExecutionContext,
        standards: &[CompanyStandard],
        unresolved: &mut Vec<String>,
    ) {
        match value {
            Value::String(text) => {
                let compiled = self.compile_with(text, context, standards);
                for name in compiled.unresolved {
                    if !unresolved.contains(&name) {
                        unresolved.push(name);
                    }
                }
                *text = compiled.text;
            }
            Value::Array(items) => {
                for item in items {
                    self.render_leaves(item, context, standards, unresolved);
                }
            }
            Value::Object(map) => {
                for (_, item) in map.iter_mut() {
                    self.render_leaves(item, context, standards, unresolved);
                }
            }
            _ => {}
        }
    }

    fn compile_with(
        &self,
        template: &str,
        context: &ExecutionContext,
        standards: &[CompanyStandard],
    ) -> CompiledPrompt {
        let compile_context = CompileContext {
            user_id: context.user_id,
            inputs: &context.user_inputs,
            step_executions: &context.step_executions,
            standards,
        };
        self.compiler.compile(template, &compile_context)
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use serde_json::Value;

    use super::*;
    use crate::domain::executor::CancellationSignal;
    use crate::domain::execution::{ExecutionId, StepExecution, StepRef};
    use crate::domain::recipe::StepId;
    use crate::domain::standard::MockStandardRepository;

    /// Renderer whose standard repository returns the given standards
    pub fn renderer_with(standards: Vec<CompanyStandard>) -> Arc<TemplateRenderer> {
        let mut repo = MockStandardRepository::new();
        repo.expect_list_by_user()
            .returning(move |_| Ok(standards.clone()));
        Arc::new(TemplateRenderer::new(PromptCompiler::default(), Arc::new(repo)))
    }

    /// Context for a step with the given inputs and completed step outputs
    pub fn context(inputs: &[(&str, Value)], completed: &[(u32, &str)]) -> ExecutionContext {
        let execution_id = ExecutionId::new(1);
        let mut step_executions = Vec::new();
        for (order, content) in completed {
            let mut step = StepExecution::new(
                execution_id,
                StepRef::Persisted(StepId::new(*order as i64)),
                *order,
            );
            step.await_review(
                serde_json::json!({ "content": content }).to_string(),
                None,
                None,
            );
            step.approve();
            step_executions.push(step);
        }

        let next_order = completed.len() as u32 + 1;
        let current = StepExecution::new(
            execution_id,
            StepRef::Persisted(StepId::new(next_order as i64)),
            next_order,
        );
        step_executions.push(current.clone());

        ExecutionContext {
            user_id: 1,
            execution_id,
            step_execution: current,
            user_inputs: inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
            step_executions,
            prompt_override: None,
            cancellation: CancellationSignal::never(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{context, renderer_with};
    use super::*;
    use crate::domain::standard::{MockStandardRepository, StandardKind};
    use serde_json::json;

    #[tokio::test]
    async fn test_standards_not_loaded_without_reference() {
        let mut repo = MockStandardRepository::new();
        repo.expect_list_by_user().never();
        let renderer = TemplateRenderer::new(PromptCompiler::default(), Arc::new(repo));

        let ctx = context(&[("topic", json!("cats"))], &[]);
        let compiled = renderer.render("About {{topic}}", &ctx).await.unwrap();

        assert_eq!(compiled.text, "About cats");
    }

    #[tokio::test]
    async fn test_standards_loaded_for_reference() {
        let renderer = renderer_with(vec![CompanyStandard::new(
            1,
            "House",
            StandardKind::Voice,
            json!({"tone": "dry"}),
        )]);

        let ctx = context(&[], &[]);
        let compiled = renderer.render("{{brand_voice}}", &ctx).await.unwrap();

        assert!(compiled.text.contains("- Tone: dry"));
    }

    #[tokio::test]
    async fn test_render_value_walks_leaves() {
        let renderer = renderer_with(vec![]);
        let ctx = context(&[("sku", json!("A-1"))], &[(1, "summary")]);
        let mut value = json!({
            "item": {"sku": "{{sku}}", "notes": ["{{step_1_output}}", 3]},
            "missing": "{{region}}"
        });

        let unresolved = renderer.render_value(&mut value, &ctx).await.unwrap();

        assert_eq!(value["item"]["sku"], "A-1");
        assert_eq!(value["item"]["notes"][0], "summary");
        assert_eq!(value["item"]["notes"][1], 3);
        assert_eq!(unresolved, vec!["region"]);
    }
}
