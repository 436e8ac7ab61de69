use std::sync::Arc;

use aglm_broker::BrokerClient;
use aglm_contracts::{now_secs, Intent, QueuePayload};
use aglm_storage::{NewTask, Store};

use crate::classifier::classify;
use crate::config::WorkflowConfig;
use crate::error::IntakeError;
use crate::ids::mint_task_id;
use crate::registry::WorkflowRegistry;

/// Inputs to `Intake::enqueue`, as received from the HTTP surface.
pub struct IntakeRequest {
    pub user: String,
    pub content: String,
    pub task_type: Option<String>,
    pub script_args: Vec<String>,
}

/// What `Intake::enqueue` hands back for the `/enqueue` response body.
pub struct IntakeResult {
    pub task_id: String,
    pub queue_length: i64,
    pub intent: Intent,
    pub task_type: String,
}

/// Validates a request, resolves its workflow, mints a task id, and writes
/// it through the broker list, the live status hash, the durable row, and
/// the `enqueue` audit event, in that order — a durable row must exist
/// before any worker can observe the task (data model invariant 2).
pub struct Intake {
    broker: BrokerClient,
    store: Store,
    registry: Arc<WorkflowRegistry>,
    workflow_config: Arc<WorkflowConfig>,
    queue_key: String,
    task_prefix: String,
}

impl Intake {
    pub fn new(
        broker: BrokerClient,
        store: Store,
        registry: Arc<WorkflowRegistry>,
        workflow_config: Arc<WorkflowConfig>,
        queue_key: String,
        task_prefix: String,
    ) -> Self {
        Self {
            broker,
            store,
            registry,
            workflow_config,
            queue_key,
            task_prefix,
        }
    }

    pub async fn enqueue(&self, request: IntakeRequest) -> Result<IntakeResult, IntakeError> {
        if request.user.trim().is_empty() {
            return Err(IntakeError::Validation("user is required".to_string()));
        }

        let (intent, task_type) = self.resolve(&request);
        let task_id = mint_task_id();
        let redis_key = format!("{}:{}", self.task_prefix, task_id);
        let now = now_secs();

        let payload = QueuePayload {
            id: task_id.clone(),
            user: request.user.clone(),
            content: request.content.clone(),
            intent: intent.intent.clone(),
            workflow: intent.workflow.clone(),
            created_at: now,
            task_type: task_type.clone(),
            script_args: request.script_args.clone(),
        };
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| IntakeError::Validation(format!("payload did not serialize: {e}")))?;

        // (1) LPUSH onto the queue list.
        let queue_length = self.broker.lpush(&self.queue_key, &payload_json).await?;

        // (2) HSET the live status hash with the full resolved metadata.
        let created_at_str = now.to_string();
        self.broker
            .hset(
                &redis_key,
                &[
                    ("status", "pending"),
                    ("created_at", created_at_str.as_str()),
                    ("intent", intent.intent.as_str()),
                    ("workflow", intent.workflow.as_str()),
                    ("user", request.user.as_str()),
                    ("content", request.content.as_str()),
                    ("task_type", task_type.as_str()),
                ],
            )
            .await?;

        // (3) Persist the durable task row.
        self.store
            .persist_task(&NewTask {
                id: task_id.clone(),
                user: request.user.clone(),
                task_type: task_type.clone(),
                redis_key,
                payload_json,
                now,
            })
            .await?;

        // (4) Append the `enqueue` audit event.
        self.store
            .record_event(
                &task_id,
                "enqueue",
                "pending",
                Some(&request.content),
                None,
                None,
                now,
            )
            .await?;

        Ok(IntakeResult {
            task_id,
            queue_length,
            intent,
            task_type,
        })
    }

    /// §4.4's resolution order: a caller-supplied `task_type` that names a
    /// registered or dynamically-discoverable workflow wins outright and
    /// its own name doubles as the `intent` label (no classification ran);
    /// otherwise — including when the supplied `task_type` matches neither
    /// — fall through to keyword classification on `content`. The
    /// caller-supplied `task_type` is still carried on the record even when
    /// classification picked the workflow (data model: "falls back to
    /// workflow name" only when none was supplied at all).
    fn resolve(&self, request: &IntakeRequest) -> (Intent, String) {
        if let Some(task_type) = request.task_type.as_deref().filter(|s| !s.is_empty()) {
            if let Some(def) = self
                .registry
                .resolve_or_register(task_type, &self.workflow_config)
            {
                return (
                    Intent::new(task_type.to_string(), def.name.clone()),
                    task_type.to_string(),
                );
            }
            let intent = classify(&request.content);
            return (intent, task_type.to_string());
        }

        let intent = classify(&request.content);
        let task_type = intent.workflow.clone();
        (intent, task_type)
    }
}
