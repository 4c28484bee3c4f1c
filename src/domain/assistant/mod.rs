//! Workflow assistant domain - proposals, reply parsing and hybrid merge

mod extraction;
mod merge;
mod workflow;

pub use extraction::{
    extract_suggestions, extract_template_request, extract_workflow, strip_structured_blocks,
    ExtractionStrategy,
};
pub use merge::{merge_template_step, proposal_to_step, synthesize_input_config, MERGEABLE_FIELDS};
pub use workflow::{GeneratedStep, GeneratedWorkflow, RequiredInput};
