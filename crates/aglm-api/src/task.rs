// GET /task/{task_id}

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use aglm_contracts::{TaskEventSummary, TaskStatus, TaskSummary};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

const EVENT_LIMIT: i64 = 20;

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub task: TaskSummary,
    pub events: Vec<TaskEventSummary>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/task/:task_id", get(get_task))
        .with_state(state)
}

/// Live hash values win over the durable row wherever both are available
/// (the broker hash is the low-latency view; see §3's `LiveStatus`
/// definition), since a finalize in flight may have updated the hash before
/// the durable write lands.
#[utoipa::path(
    get,
    path = "/task/{task_id}",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task summary and recent events", body = TaskResponse),
        (status = 404, description = "Task not found"),
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let row = state
        .store
        .load_task(&task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(task_id.clone()))?;

    let redis_key = row.redis_key.clone();
    let live_status = state.broker.hget(&redis_key, "status").await.ok().flatten();
    let live_result = state
        .broker
        .hget(&redis_key, "final_result")
        .await
        .ok()
        .flatten();
    let live_workflow = state
        .broker
        .hget(&redis_key, "workflow")
        .await
        .ok()
        .flatten();

    let status = live_status
        .and_then(|s| s.parse::<TaskStatus>().ok())
        .unwrap_or(row.status);
    let result = live_result
        .filter(|s| !s.is_empty())
        .or(row.result_summary.clone());
    let workflow = live_workflow
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| row.task_type.clone());

    let events = state
        .store
        .query_events(&task_id, EVENT_LIMIT)
        .await?
        .into_iter()
        .map(|e| TaskEventSummary {
            id: e.id,
            phase: e.phase,
            status: e.status,
            input: e.input,
            output: e.output,
            checkpoint_token: e.checkpoint_token,
            created_at: e.created_at,
        })
        .collect();

    let task = TaskSummary {
        task_id: row.id,
        status,
        user: row.user,
        task_type: row.task_type,
        workflow,
        result,
        created_at: row.created_at,
        updated_at: row.updated_at,
        resume_hint: row.resume_hint,
        last_checkpoint: row.last_checkpoint,
    };

    Ok(Json(TaskResponse { task, events }))
}
