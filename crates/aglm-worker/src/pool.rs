use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aglm_broker::BrokerClient;
use aglm_contracts::{now_secs, QueuePayload, TaskStatus};
use aglm_storage::{Store, TaskUpdate};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::WorkflowConfig;
use crate::exec::run_workflow;
use crate::finalize::{FinalizeRequest, Finalizer};
use crate::registry::WorkflowRegistry;

/// How long a worker sleeps before retrying after an unexpected loop-level
/// failure (broker down, DAO unreachable). Keeps the worker from busy-looping.
const RETRY_BACKOFF_SECS: u64 = 2;

pub struct WorkerPool {
    broker: BrokerClient,
    store: Store,
    registry: Arc<WorkflowRegistry>,
    workflow_config: Arc<WorkflowConfig>,
    queue_key: String,
    task_prefix: String,
    worker_count: usize,
    brpop_timeout_secs: u64,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl WorkerPool {
    pub fn new(
        broker: BrokerClient,
        store: Store,
        registry: Arc<WorkflowRegistry>,
        workflow_config: Arc<WorkflowConfig>,
        queue_key: String,
        task_prefix: String,
        worker_count: usize,
        brpop_timeout_secs: u64,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            broker,
            store,
            registry,
            workflow_config,
            queue_key,
            task_prefix,
            worker_count,
            brpop_timeout_secs,
            started: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start `worker_count` long-lived tasks. Idempotent — a second call is
    /// a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(worker_count = self.worker_count, "starting worker pool");
        for n in 0..self.worker_count {
            let pool = self.clone();
            let worker_id = format!("worker-{n}");
            let mut shutdown_rx = self.shutdown_rx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            info!(%worker_id, "worker shutting down");
                            break;
                        }
                        _ = pool.run_one_cycle(&worker_id) => {}
                    }
                }
            });
        }
    }

    /// Ask all workers to stop after their current `BRPOP` cycle returns.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn run_one_cycle(&self, worker_id: &str) {
        debug!(%worker_id, "polling queue");

        let popped = match self.broker.brpop(&self.queue_key, self.brpop_timeout_secs).await {
            Ok(Some((_, value))) => value,
            Ok(None) => return,
            Err(e) => {
                warn!(%worker_id, error = %e, "broker unavailable, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(RETRY_BACKOFF_SECS)).await;
                return;
            }
        };

        let payload: QueuePayload = match serde_json::from_str(&popped) {
            Ok(p) => p,
            Err(e) => {
                error!(%worker_id, error = %e, "malformed queue payload, skipping");
                return;
            }
        };

        if let Err(e) = self.process(worker_id, payload).await {
            error!(%worker_id, error = %e, "worker cycle failed");
            tokio::time::sleep(std::time::Duration::from_secs(RETRY_BACKOFF_SECS)).await;
        }
    }

    async fn process(&self, worker_id: &str, payload: QueuePayload) -> anyhow::Result<()> {
        let redis_key = format!("{}:{}", self.task_prefix, payload.id);
        let now = now_secs();
        let running_str = TaskStatus::Running.to_string();
        let now_str = now.to_string();

        self.broker
            .hset(
                &redis_key,
                &[
                    ("status", running_str.as_str()),
                    ("started_at", now_str.as_str()),
                    ("worker", worker_id),
                ],
            )
            .await
            .ok();

        self.store
            .record_event(
                &payload.id,
                "start",
                &TaskStatus::Running.to_string(),
                Some(&payload.content),
                None,
                None,
                now,
            )
            .await?;

        self.store
            .update_task(
                &payload.id,
                &TaskUpdate {
                    status: Some(TaskStatus::Running),
                    ..Default::default()
                },
                now,
            )
            .await?;

        let definition = self
            .registry
            .resolve_or_register(&payload.workflow, &self.workflow_config)
            .or_else(|| self.registry.get("echo"));

        let Some(definition) = definition else {
            // `echo` is always seeded, so this is unreachable in practice;
            // guard it anyway rather than unwrap.
            anyhow::bail!("no workflow definition available, not even the echo fallback");
        };

        let (status, output) = match definition.build(&payload, &self.workflow_config) {
            Ok(argv) => match run_workflow(&argv, definition.timeout, &self.workflow_config.project_root).await {
                Ok(outcome) => (outcome.status, outcome.output),
                Err(e) => (TaskStatus::Failed, e.to_string()),
            },
            Err(e) => (TaskStatus::Failed, e.to_string()),
        };

        let finalizer = Finalizer::new(
            self.broker.clone(),
            self.store.clone(),
            self.workflow_config.clone(),
        );
        finalizer
            .finalize(FinalizeRequest {
                task_id: payload.id.clone(),
                redis_key,
                user: Some(payload.user.clone()),
                workflow: Some(payload.workflow.clone()),
                status,
                result_text: output,
                notify: true,
            })
            .await?;

        info!(task_id = %payload.id, workflow = %payload.workflow, status = %status, "task completed");
        Ok(())
    }
}

