//! AI model client contract and message types

mod client;
mod message;

pub use client::{AiCallConfig, AiCallResult, AiClient, Usage};
pub use message::{ContentPart, Message, MessageRole, PromptImage};

#[cfg(test)]
pub use client::mock::{MockAiClient, RecordedCall};
