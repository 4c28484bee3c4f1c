//! Pulls structured blocks out of free-form assistant replies
//!
//! Workflows are located by an ordered list of strategies; the first that
//! yields a parseable workflow wins.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::workflow::GeneratedWorkflow;
use crate::domain::recipe::RecipeId;

static WORKFLOW_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```workflow\s*([\s\S]*?)\s*```").unwrap());

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").unwrap());

static TEMPLATE_REQUEST_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```template_request\s*([\s\S]*?)\s*```").unwrap());

static SUGGESTIONS_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```suggestions\s*([\s\S]*?)\s*```").unwrap());

/// Any of the fences above, removed from the user-facing message
static STRUCTURED_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:workflow|json|template_request|suggestions)\s*[\s\S]*?```").unwrap()
});

/// An object mentioning both keys, widest match first
static WORKFLOW_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{[\s\S]*"name"[\s\S]*"steps"[\s\S]*\}"#).unwrap());

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Where in a reply a workflow was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    WorkflowFence,
    JsonFence,
    BareObject,
}

impl ExtractionStrategy {
    pub const ORDERED: [ExtractionStrategy; 3] = [
        ExtractionStrategy::WorkflowFence,
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::BareObject,
    ];

    fn candidates(&self, text: &str) -> Vec<String> {
        match self {
            Self::WorkflowFence => fenced(&WORKFLOW_FENCE, text),
            Self::JsonFence => fenced(&JSON_FENCE, text),
            Self::BareObject => {
                let mut candidates: Vec<String> = WORKFLOW_OBJECT
                    .find(text)
                    .map(|m| m.as_str().to_string())
                    .into_iter()
                    .collect();
                candidates.extend(balanced_objects(text));
                candidates
            }
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WorkflowFence => "workflow_fence",
            Self::JsonFence => "json_fence",
            Self::BareObject => "bare_object",
        };
        f.write_str(name)
    }
}

fn fenced(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Every top-level balanced `{...}` span, skipping braces inside strings
fn balanced_objects(text: &str) -> Vec<String> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(index);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        objects.push(text[begin..=index].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    objects
}

/// Finds the first workflow in a reply, reporting which strategy matched
pub fn extract_workflow(text: &str) -> Option<(GeneratedWorkflow, ExtractionStrategy)> {
    for strategy in ExtractionStrategy::ORDERED {
        for candidate in strategy.candidates(text) {
            match serde_json::from_str::<GeneratedWorkflow>(&candidate) {
                Ok(workflow) => return Some((workflow, strategy)),
                Err(e) => debug!(strategy = %strategy, error = %e, "Candidate is not a workflow"),
            }
        }
    }
    None
}

/// Template ids requested in a `template_request` fence
///
/// Accepts a JSON array, an object with `template_ids`, or bare numbers.
pub fn extract_template_request(text: &str) -> Option<Vec<RecipeId>> {
    let body = fenced(&TEMPLATE_REQUEST_FENCE, text).into_iter().next()?;

    let ids: Vec<i64> = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Array(items)) => items.iter().filter_map(json_id).collect(),
        Ok(Value::Object(map)) => map
            .get("template_ids")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(json_id).collect())
            .unwrap_or_default(),
        _ => NUMBER
            .find_iter(&body)
            .filter_map(|m| m.as_str().parse().ok())
            .collect(),
    };

    let mut unique: Vec<RecipeId> = Vec::new();
    for id in ids.into_iter().map(RecipeId::new) {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    Some(unique)
}

fn json_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Follow-up suggestions from a `suggestions` fence holding a JSON string array
pub fn extract_suggestions(text: &str) -> Option<Vec<String>> {
    let body = fenced(&SUGGESTIONS_FENCE, text).into_iter().next()?;
    let suggestions: Vec<String> = serde_json::from_str(&body).ok()?;
    if suggestions.is_empty() {
        None
    } else {
        Some(suggestions)
    }
}

/// The reply with structured fences removed
pub fn strip_structured_blocks(text: &str) -> String {
    STRUCTURED_FENCE.replace_all(text, "").trim().to_string()
}
