// Row types and input structs for the tasks / task_events relations.

use aglm_contracts::TaskStatus;

/// A durable row in the `tasks` relation.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub user: String,
    pub task_type: String,
    pub status: TaskStatus,
    pub redis_key: String,
    pub created_at: f64,
    pub updated_at: f64,
    pub last_checkpoint: Option<String>,
    pub resume_hint: Option<String>,
    pub retries: i64,
    pub payload_json: String,
    pub result_summary: Option<String>,
}

/// A row in the append-only `task_events` audit log.
#[derive(Debug, Clone)]
pub struct TaskEventRow {
    pub id: i64,
    pub task_id: String,
    pub phase: String,
    pub status: String,
    pub input: Option<String>,
    pub output: Option<String>,
    pub checkpoint_token: Option<String>,
    pub created_at: f64,
}

/// Input to `Store::persist_task`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: String,
    pub user: String,
    pub task_type: String,
    pub redis_key: String,
    pub payload_json: String,
    pub now: f64,
}

/// Input to `Store::update_task`. `None` fields are coalesced against the
/// row's existing value rather than overwritten.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub result: Option<String>,
    pub resume_hint: Option<String>,
    pub checkpoint: Option<String>,
}
