// Task status and read-model DTOs for the public API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a task.
///
/// Monotonic: `Pending` -> `Running` -> (`Success` | `Failed`). Never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

impl TaskStatus {
    /// True once the task has reached a status that never changes again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// Response body for `GET /task/{id}`'s `task` field.
///
/// `status` and `result` prefer the live broker hash and fall back to the
/// durable row (see the finalizer's eventual-consistency note).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TaskStatus,
    pub user: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub workflow: String,
    pub result: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
    pub resume_hint: Option<String>,
    pub last_checkpoint: Option<String>,
}

/// One row of the append-only `task_events` audit log, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskEventSummary {
    pub id: i64,
    pub phase: String,
    pub status: String,
    pub input: Option<String>,
    pub output: Option<String>,
    pub checkpoint_token: Option<String>,
    pub created_at: f64,
}
