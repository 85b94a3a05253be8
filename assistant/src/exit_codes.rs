//! Stable exit codes for assistant CLI commands.

/// Command succeeded and printed its JSON output.
pub const OK: i32 = 0;
/// Command failed due to invalid config, missing credentials, or I/O errors.
pub const INVALID: i32 = 1;
/// The planner exhausted its retry budget without producing a valid plan.
pub const PLAN_FAILED: i32 = 2;
