//! Shared application state for the HTTP server.

use std::sync::Arc;

use assistant::orchestrator::Assistant;

/// Shared state accessible from all request handlers.
///
/// The pipeline holds no per-run state, so concurrent requests share one
/// instance.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant: Arc::new(assistant),
        }
    }
}
