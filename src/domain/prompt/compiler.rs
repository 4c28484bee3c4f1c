//! `{{variable}}` resolution across user inputs, step outputs and standards
//!
//! Variables are classified by name:
//! - `step_<N>_output` - content of the step execution with order N
//! - a company standard name known to the catalogue (e.g. `brand_voice`)
//! - anything else - a user input

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::image::{detect_image, image_placeholder};
use super::value::{is_blank, value_to_text};
use crate::domain::ai::PromptImage;
use crate::domain::execution::StepExecution;
use crate::domain::standard::{
    format_standard, missing_standard_placeholder, CatalogueEntry, CompanyStandard,
    KeywordStandardResolver, StandardCatalogue, StandardResolver,
};

/// Regex for a template variable: {{name}}
static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_.-]+)\s*\}\}").unwrap());

/// Regex for a previous step reference: step_<N>_output
static STEP_OUTPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^step_(\d+)_output$").unwrap());

/// What a template variable refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    StepOutput(u32),
    Standard(&'static CatalogueEntry),
    UserInput,
}

/// Everything a template may draw values from
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    pub user_id: i64,
    pub inputs: &'a HashMap<String, Value>,
    pub step_executions: &'a [StepExecution],
    pub standards: &'a [CompanyStandard],
}

/// Result of compiling a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPrompt {
    pub text: String,
    /// Variables with no value, in first-match order
    pub unresolved: Vec<String>,
    pub images: Vec<PromptImage>,
}

impl CompiledPrompt {
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolves template variables
#[derive(Debug, Clone)]
pub struct PromptCompiler {
    catalogue: StandardCatalogue,
    resolver: Arc<dyn StandardResolver>,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self::new(Arc::new(KeywordStandardResolver))
    }
}

impl PromptCompiler {
    pub fn new(resolver: Arc<dyn StandardResolver>) -> Self {
        Self {
            catalogue: StandardCatalogue,
            resolver,
        }
    }

    /// Classifies a variable name
    pub fn classify(&self, name: &str) -> VariableKind {
        if let Some(caps) = STEP_OUTPUT_PATTERN.captures(name) {
            if let Ok(order) = caps[1].parse::<u32>() {
                return VariableKind::StepOutput(order);
            }
        }

        match self.catalogue.lookup(name) {
            Some(entry) => VariableKind::Standard(entry),
            None => VariableKind::UserInput,
        }
    }

    /// Distinct variable names in a template, in first-match order
    pub fn extract_variables(template: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in VARIABLE_PATTERN.captures_iter(template) {
            let name = &caps[1];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Variables in a template that must come from the user
    pub fn user_input_variables(&self, template: &str) -> Vec<String> {
        Self::extract_variables(template)
            .into_iter()
            .filter(|name| self.classify(name) == VariableKind::UserInput)
            .collect()
    }

    /// Check if a string contains any variable references
    pub fn has_variables(template: &str) -> bool {
        VARIABLE_PATTERN.is_match(template)
    }

    /// Resolves every variable occurrence in a template
    pub fn compile(&self, template: &str, context: &CompileContext<'_>) -> CompiledPrompt {
        let mut unresolved: Vec<String> = Vec::new();
        let mut images: Vec<PromptImage> = Vec::new();

        let text = VARIABLE_PATTERN.replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.classify(name) {
                VariableKind::StepOutput(order) => {
                    resolve_step_output(name, order, context, &mut unresolved)
                }
                VariableKind::Standard(entry) => self.resolve_standard(name, entry, context),
                VariableKind::UserInput => {
                    resolve_user_input(name, context, &mut unresolved, &mut images)
                }
            }
        });

        CompiledPrompt {
            text: text.into_owned(),
            unresolved,
            images,
        }
    }

    fn resolve_standard(
        &self,
        name: &str,
        entry: &CatalogueEntry,
        context: &CompileContext<'_>,
    ) -> String {
        match self.resolver.resolve(entry, context.standards) {
            Some(standard) => format_standard(standard),
            None => missing_standard_placeholder(entry.kind, name),
        }
    }
}

/// Placeholder substituted for a user input with no value
pub fn required_placeholder(name: &str) -> String {
    format!("[{} required]", name)
}

fn resolve_step_output(
    name: &str,
    order: u32,
    context: &CompileContext<'_>,
    unresolved: &mut Vec<String>,
) -> String {
    match context
        .step_executions
        .iter()
        .find(|s| s.step_order() == order)
    {
        None => {
            push_unique(unresolved, name);
            format!("[Step {} output not available]", order)
        }
        Some(step) if !step.is_completed() => format!("[Step {} not completed yet]", order),
        Some(step) => step.content().unwrap_or_default(),
    }
}

fn resolve_user_input(
    name: &str,
    context: &CompileContext<'_>,
    unresolved: &mut Vec<String>,
    images: &mut Vec<PromptImage>,
) -> String {
    let value = match context.inputs.get(name) {
        Some(value) if !is_blank(value) => value,
        _ => {
            push_unique(unresolved, name);
            return required_placeholder(name);
        }
    };

    if let Value::String(raw) = value {
        if let Some(image) = detect_image(name, raw) {
            if !images.iter().any(|i| i.name == image.name) {
                images.push(image);
            }
            return image_placeholder(name);
        }
    }

    value_to_text(value)
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{ExecutionId, StepRef};
    use crate::domain::recipe::StepId;
    use crate::domain::standard::{StandardId, StandardKind};
    use serde_json::json;

    fn inputs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn step(order: u32) -> StepExecution {
        StepExecution::new(
            ExecutionId::new(1),
            StepRef::Persisted(StepId::new(order as i64)),
            order,
        )
    }

    fn compile(template: &str, ctx: &CompileContext<'_>) -> CompiledPrompt {
        PromptCompiler::default().compile(template, ctx)
    }

    #[test]
    fn test_user_input_substitution() {
        let inputs = inputs(&[("topic", json!("cats"))]);
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &[],
        };

        let compiled = compile("Summarize {{topic}} and {{ topic }}", &ctx);
        assert_eq!(compiled.text, "Summarize cats and cats");
        assert!(compiled.is_fully_resolved());
    }

    #[test]
    fn test_missing_and_empty_inputs_are_unresolved() {
        let inputs = inputs(&[("tone", json!(""))]);
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &[],
        };

        let compiled = compile("{{topic}} in a {{tone}} tone about {{topic}}", &ctx);
        assert_eq!(
            compiled.text,
            "[topic required] in a [tone required] tone about [topic required]"
        );
        assert_eq!(compiled.unresolved, vec!["topic", "tone"]);
    }

    #[test]
    fn test_step_output_before_and_after_completion() {
        let inputs = HashMap::new();
        let mut first = step(1);
        first.await_review(
            json!({"content": "A summary of cats"}).to_string(),
            None,
            None,
        );

        let pending = vec![first.clone()];
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &pending,
            standards: &[],
        };
        let compiled = compile("Expand: {{step_1_output}}", &ctx);
        assert_eq!(compiled.text, "Expand: [Step 1 not completed yet]");
        assert!(compiled.is_fully_resolved());

        first.approve();
        let done = vec![first];
        let ctx = CompileContext {
            step_executions: &done,
            ..ctx
        };
        let compiled = compile("Expand: {{step_1_output}}", &ctx);
        assert_eq!(compiled.text, "Expand: A summary of cats");
    }

    #[test]
    fn test_missing_step_is_unresolved() {
        let inputs = HashMap::new();
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &[],
        };

        let compiled = compile("{{step_3_output}}", &ctx);
        assert_eq!(compiled.unresolved, vec!["step_3_output"]);
    }

    #[test]
    fn test_standard_reference_is_formatted() {
        let inputs = HashMap::new();
        let standards = vec![
            CompanyStandard::new(1, "House Voice", StandardKind::Voice, json!({"tone": "warm"}))
                .with_id(StandardId::new(1)),
        ];
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &standards,
        };

        let compiled = compile("Write in {{Brand_Voice}}", &ctx);
        assert_eq!(compiled.text, "Write in Brand Voice (House Voice):\n- Tone: warm");
        assert!(compiled.is_fully_resolved());
    }

    #[test]
    fn test_missing_standard_is_placeholder_not_unresolved() {
        let inputs = HashMap::new();
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &[],
        };

        let compiled = compile("{{amazon_requirements}}", &ctx);
        assert!(compiled.text.starts_with("[No Platform Requirements standard"));
        assert!(compiled.is_fully_resolved());
    }

    #[test]
    fn test_image_input_is_extracted() {
        let inputs = inputs(&[("photo", json!("data:image/png;base64,iVBORw0KGgo="))]);
        let ctx = CompileContext {
            user_id: 1,
            inputs: &inputs,
            step_executions: &[],
            standards: &[],
        };

        let compiled = compile("Describe {{photo}}. Again: {{photo}}", &ctx);
        assert_eq!(compiled.text, "Describe [Image: photo]. Again: [Image: photo]");
        assert_eq!(compiled.images.len(), 1);
        assert_eq!(compiled.images[0].media_type, "image/png");
    }

    #[test]
    fn test_classification_and_extraction() {
        let compiler = PromptCompiler::default();
        assert_eq!(compiler.classify("step_2_output"), VariableKind::StepOutput(2));
        assert!(matches!(compiler.classify("brand_voice"), VariableKind::Standard(_)));
        assert_eq!(compiler.classify("topic"), VariableKind::UserInput);

        let template = "{{topic}} {{step_1_output}} {{brand_voice}} {{audience}} {{topic}}";
        assert_eq!(
            PromptCompiler::extract_variables(template),
            vec!["topic", "step_1_output", "brand_voice", "audience"]
        );
        assert_eq!(
            compiler.user_input_variables(template),
            vec!["topic", "audience"]
        );
    }
}
