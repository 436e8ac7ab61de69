// Wire shape of the payload pushed onto the broker list

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON object pushed onto the queue list by intake and popped by a worker.
///
/// `script_args` is carried verbatim so a dynamically registered workflow can
/// forward caller-supplied positional arguments instead of falling back to
/// `content`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueuePayload {
    pub id: String,
    pub user: String,
    pub content: String,
    pub intent: String,
    pub workflow: String,
    pub created_at: f64,
    pub task_type: String,
    #[serde(default)]
    pub script_args: Vec<String>,
}
