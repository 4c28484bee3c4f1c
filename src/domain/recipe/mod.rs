//! Recipe domain - step definitions and recipes

mod entity;
mod repository;

pub use entity::{
    InputVariable, ModelConfig, Recipe, RecipeId, Step, StepId, StepType, DEFAULT_STEP_TYPE,
    URL_LIST_INPUT_TYPE,
};
pub use repository::RecipeRepository;
