// Intent classifier output

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The (intent, workflow) pair produced by classification or by a caller-supplied
/// `task_type` that resolved directly to a registered or dynamically discovered
/// workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Intent {
    pub intent: String,
    pub workflow: String,
}

impl Intent {
    pub fn new(intent: impl Into<String>, workflow: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            workflow: workflow.into(),
        }
    }

    /// The classifier's fallback when nothing matches.
    pub fn general() -> Self {
        Self::new("general", "echo")
    }
}
