//! Prompt compilation - `{{variable}}` templates resolved against execution state

mod compiler;
mod image;
mod value;

pub use compiler::{
    required_placeholder, CompileContext, CompiledPrompt, PromptCompiler, VariableKind,
};
pub use image::{detect_image, image_placeholder, sniff_media_type};
pub use value::{get_nested_field, is_blank, value_to_text};
