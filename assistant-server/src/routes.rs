//! HTTP route handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use assistant::core::types::FinalPayload;

use crate::state::AppState;

/// Build the router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    task: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// POST /run - run the full pipeline for `task`.
///
/// Planning failure maps to 502 since it reflects the upstream model.
async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<FinalPayload>, ApiError> {
    let task = request.task.trim();
    if task.is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "task must not be empty",
        ));
    }

    match state.assistant.run_task(task).await {
        Ok(payload) => {
            info!(steps = payload.execution.steps.len(), "run completed");
            Ok(Json(payload))
        }
        Err(err) => {
            warn!(err = %err, "run failed during planning");
            Err(api_error(StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}
