// POST /finish

use axum::{extract::State, routing::post, Json, Router};
use aglm_contracts::TaskStatus;
use aglm_worker::{FinalizeRequest, Finalizer};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishRequest {
    pub task_id: String,
    pub status: String,
    pub result: Option<String>,
    pub user: Option<String>,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinishResponse {
    pub status: &'static str,
    pub task_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/finish", post(finish)).with_state(state)
}

#[utoipa::path(
    post,
    path = "/finish",
    request_body = FinishRequest,
    responses(
        (status = 200, description = "Task finalized", body = FinishResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn finish(
    State(state): State<AppState>,
    Json(req): Json<FinishRequest>,
) -> Result<Json<FinishResponse>, ApiError> {
    let status: TaskStatus = req
        .status
        .parse()
        .map_err(|e: String| ApiError::Validation(e))?;

    let existing = state
        .store
        .load_task(&req.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(req.task_id.clone()))?;

    let finalizer = Finalizer::new(
        state.broker.clone(),
        state.store.clone(),
        state.workflow_config.clone(),
    );
    finalizer
        .finalize(FinalizeRequest {
            task_id: req.task_id.clone(),
            redis_key: existing.redis_key,
            user: req.user.or(Some(existing.user)),
            workflow: None,
            status,
            result_text: req.result.unwrap_or_default(),
            notify: req.notify,
        })
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(FinishResponse {
        status: "ok",
        task_id: req.task_id,
    }))
}
