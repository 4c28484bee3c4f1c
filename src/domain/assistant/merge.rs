//! Hybrid merge of assistant proposals with template steps

use serde_json::Value;

use super::workflow::{GeneratedStep, RequiredInput};
use crate::domain::prompt::PromptCompiler;
use crate::domain::recipe::{
    InputVariable, Step, StepId, StepType, DEFAULT_STEP_TYPE, URL_LIST_INPUT_TYPE,
};

/// Step fields a proposal may override on a template step
pub const MERGEABLE_FIELDS: [&str; 9] = [
    "name",
    "step_type",
    "ai_model",
    "prompt_template",
    "output_format",
    "model_config",
    "api_config",
    "executor_config",
    "input_config",
];

/// Builds a step from a template step, taking only overridden fields from the
/// proposal
///
/// The result has no id; it is assigned when the recipe is stored.
pub fn merge_template_step(template: &Step, proposal: &GeneratedStep, order: u32) -> Step {
    let mut step = template
        .clone()
        .with_id(StepId::default())
        .with_order(order);

    for field in &proposal.override_fields {
        step = apply_override(step, proposal, field);
    }

    step
}

fn apply_override(step: Step, proposal: &GeneratedStep, field: &str) -> Step {
    match field {
        "name" if !proposal.name.is_empty() => step.with_name(proposal.name.clone()),
        "step_type" => match &proposal.step_type {
            Some(step_type) => step.with_step_type(step_type.clone()),
            None => step,
        },
        "ai_model" => match &proposal.ai_model {
            Some(model) => step.with_ai_model(model.clone()),
            None => step,
        },
        "prompt_template" => match &proposal.prompt_template {
            Some(prompt) => step.with_prompt_template(prompt.clone()),
            None => step,
        },
        "output_format" => match &proposal.output_format {
            Some(format) => step.with_output_format(format.clone()),
            None => step,
        },
        "model_config" => match &proposal.model_config {
            Some(config) => step.with_model_config(config.clone()),
            None => step,
        },
        "api_config" => match &proposal.api_config {
            Some(config) => step.with_api_config(config.clone()),
            None => step,
        },
        "executor_config" => match &proposal.executor_config {
            Some(config) => step.with_executor_config(config.clone()),
            None => step,
        },
        "input_config" => match &proposal.input_config {
            Some(inputs) => step.with_input_config(inputs.clone()),
            None => step,
        },
        _ => step,
    }
}

/// Builds a step straight from a proposal
pub fn proposal_to_step(proposal: &GeneratedStep, order: u32) -> Step {
    let name = if proposal.name.is_empty() {
        format!("Step {}", order)
    } else {
        proposal.name.clone()
    };
    let step_type = proposal
        .step_type
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_STEP_TYPE.to_string());

    let mut step = Step::new(order, name, step_type);
    if let Some(model) = &proposal.ai_model {
        step = step.with_ai_model(model.clone());
    }
    if let Some(prompt) = &proposal.prompt_template {
        step = step.with_prompt_template(prompt.clone());
    }
    if let Some(format) = &proposal.output_format {
        step = step.with_output_format(format.clone());
    }
    if let Some(config) = &proposal.model_config {
        step = step.with_model_config(config.clone());
    }
    if let Some(config) = &proposal.api_config {
        step = step.with_api_config(config.clone());
    }
    if let Some(config) = &proposal.executor_config {
        step = step.with_executor_config(config.clone());
    }
    if let Some(inputs) = &proposal.input_config {
        step = step.with_input_config(inputs.clone());
    }
    step
}

/// Input variables a from-scratch step needs, drawn from the workflow's
/// required inputs
///
/// An input is attached when the step's prompt or configs reference it as
/// `{{name}}`; scraping steps also take every URL-list input.
pub fn synthesize_input_config(step: &Step, required_inputs: &[RequiredInput]) -> Vec<InputVariable> {
    let mut referenced: Vec<String> = Vec::new();
    if let Some(prompt) = step.prompt_template() {
        referenced.extend(PromptCompiler::extract_variables(prompt));
    }
    for config in [step.api_config(), step.executor_config()].into_iter().flatten() {
        referenced.extend(PromptCompiler::extract_variables(&config_text(config)));
    }

    let is_scraping = step.step_type() == StepType::Scraping.as_str();
    let url_input = step
        .api_config()
        .and_then(|c| c.get("url_input"))
        .and_then(Value::as_str);

    required_inputs
        .iter()
        .filter(|input| {
            referenced.iter().any(|name| *name == input.name)
                || (is_scraping && input.input_type == URL_LIST_INPUT_TYPE)
                || url_input == Some(input.name.as_str())
        })
        .map(|input| {
            InputVariable::new(input.name.clone(), input.input_type.clone())
                .with_description(input.description.clone())
                .required()
        })
        .collect()
}

fn config_text(config: &Value) -> String {
    match config {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
