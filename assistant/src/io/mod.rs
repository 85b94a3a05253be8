//! Side-effecting collaborators for the assistant pipeline.

pub mod config;
pub mod llm;
pub mod prompt;
pub mod run_record;
