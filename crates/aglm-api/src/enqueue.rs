// POST /enqueue and its backwards-compatible alias POST /webhook

use axum::{extract::State, routing::post, Json, Router};
use aglm_contracts::Intent;
use aglm_worker::IntakeRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnqueueRequest {
    pub user: String,
    #[serde(default)]
    pub content: String,
    pub task_type: Option<String>,
    #[serde(default)]
    pub script_args: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub task_id: String,
    pub queue_length: i64,
    pub intent: Intent,
    pub task_type: String,
}

/// `/webhook` is a plain alias kept for backwards compatibility with
/// callers that predate the `/enqueue` name; both routes share one handler.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/enqueue", post(enqueue))
        .route("/webhook", post(enqueue))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/enqueue",
    request_body = EnqueueRequest,
    responses(
        (status = 200, description = "Task accepted", body = EnqueueResponse),
        (status = 400, description = "Validation error"),
        (status = 502, description = "Broker unavailable"),
    ),
    tag = "tasks"
)]
pub async fn enqueue(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let result = state
        .intake()
        .enqueue(IntakeRequest {
            user: req.user,
            content: req.content,
            task_type: req.task_type,
            script_args: req.script_args,
        })
        .await?;

    Ok(Json(EnqueueResponse {
        status: "accepted",
        task_id: result.task_id,
        queue_length: result.queue_length,
        intent: result.intent,
        task_type: result.task_type,
    }))
}
