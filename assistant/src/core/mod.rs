//! Deterministic, pure logic shared by the pipeline stages.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod merge;
pub mod plan;
pub mod schema;
pub mod types;
pub mod verification;
