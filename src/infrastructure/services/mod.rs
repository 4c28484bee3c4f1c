//! Infrastructure services

mod workflow_assistant;

pub use workflow_assistant::{
    build_system_prompt, AssistantReply, AssistantSettings, WorkflowAssistant,
};
