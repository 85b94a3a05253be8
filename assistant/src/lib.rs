//! Plan → Execute → Verify operations assistant.
//!
//! A natural-language task is turned into an ordered plan of tool calls, the
//! plan is executed through a tool registry, and a verification judge decides
//! whether the results answer the task. The architecture keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (data contracts, parsing and
//!   validation, log merging). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (configuration, the completion
//!   backend, prompt rendering, run records).
//! - **[`tools`]**: The tool registry and the concrete HTTP integrations.
//!
//! The [`agents`] wrap each pipeline stage and [`orchestrator`] sequences them
//! into a single run.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
