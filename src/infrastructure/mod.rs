//! Infrastructure layer - External service implementations

pub mod execution;
pub mod executor;
pub mod llm;
pub mod logging;
pub mod recipe;
pub mod scraping;
pub mod services;
pub mod standard;
pub mod storage;
pub mod workflow;
