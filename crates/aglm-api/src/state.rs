use std::sync::Arc;

use aglm_broker::BrokerClient;
use aglm_storage::Store;
use aglm_worker::{Intake, WorkflowConfig, WorkflowRegistry};

/// Shared application state. `broker` and `store` are cheap to clone (the
/// broker carries no connection state; the store wraps a pooled
/// connection), so handlers build a fresh `Intake`/`Finalizer` per request
/// rather than sharing one behind a lock.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub broker: BrokerClient,
    pub registry: Arc<WorkflowRegistry>,
    pub workflow_config: Arc<WorkflowConfig>,
    pub queue_key: String,
    pub task_prefix: String,
}

impl AppState {
    pub fn intake(&self) -> Intake {
        Intake::new(
            self.broker.clone(),
            self.store.clone(),
            self.registry.clone(),
            self.workflow_config.clone(),
            self.queue_key.clone(),
            self.task_prefix.clone(),
        )
    }

    pub fn redis_key(&self, task_id: &str) -> String {
        format!("{}:{}", self.task_prefix, task_id)
    }
}
