//! Workflow proposals produced by the assistant

use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::recipe::{InputVariable, ModelConfig, RecipeId};

/// A step proposed by the assistant, from scratch or sourced from a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedStep {
    #[serde(default, deserialize_with = "lenient_number")]
    pub order: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_model_config",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_config: Option<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_config: Option<Vec<InputVariable>>,
    #[serde(
        default,
        deserialize_with = "lenient_recipe_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub from_template_id: Option<RecipeId>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub from_step_order: Option<u32>,
    /// Fields where the proposal wins over the template step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_fields: Vec<String>,
}

impl GeneratedStep {
    /// Template step this proposal is sourced from, when fully specified
    pub fn template_source(&self) -> Option<(RecipeId, u32)> {
        Some((self.from_template_id?, self.from_step_order?))
    }

    pub fn overrides(&self, field: &str) -> bool {
        self.override_fields.iter().any(|f| f == field)
    }
}

/// A number written either bare or as a numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Number(T),
    Text(String),
}

impl<T: FromStr> Lenient<T> {
    fn into_number<E: de::Error>(self) -> Result<T, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected a number, got '{}'", text))),
        }
    }
}

fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
{
    Lenient::<T>::deserialize(deserializer)?.into_number()
}

fn lenient_optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
{
    Option::<Lenient<T>>::deserialize(deserializer)?
        .map(Lenient::into_number)
        .transpose()
}

fn lenient_recipe_id<'de, D>(deserializer: D) -> Result<Option<RecipeId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_number::<D, i64>(deserializer)?.map(RecipeId::new))
}

#[derive(Deserialize)]
struct LenientModelConfig {
    #[serde(default, deserialize_with = "lenient_optional_number")]
    temperature: Option<f32>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    max_tokens: Option<u32>,
    #[serde(default)]
    system_prompt: Option<String>,
}

fn lenient_model_config<'de, D>(deserializer: D) -> Result<Option<ModelConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<LenientModelConfig>::deserialize(deserializer)?.map(|config| ModelConfig {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt,
        }),
    )
}

/// An input the proposed workflow needs from the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredInput {
    pub name: String,
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub description: String,
}

fn default_input_type() -> String {
    "text".to_string()
}

/// A complete workflow proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWorkflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<GeneratedStep>,
    #[serde(default)]
    pub required_inputs: Vec<RequiredInput>,
}
