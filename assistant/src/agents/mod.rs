//! Agent wrappers for the three pipeline stages.
//!
//! Agents own their prompts and bounds; the collaborators they call (the
//! completer, the tool registry) are passed in by the orchestrator.

pub mod executor;
pub mod planner;
pub mod verifier;
