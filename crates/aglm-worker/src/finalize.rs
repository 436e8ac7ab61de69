use std::sync::Arc;

use aglm_broker::BrokerClient;
use aglm_contracts::{now_secs, TaskStatus};
use aglm_storage::{Store, TaskUpdate};
use tracing::{info, warn};

use crate::config::WorkflowConfig;

const OUTPUT_TRIM_CHARS: usize = 2_000;
const NO_RESULT_TEXT: &str = "无详细结果";

fn trim_chars(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= OUTPUT_TRIM_CHARS {
        s.to_string()
    } else {
        chars[chars.len() - OUTPUT_TRIM_CHARS..].iter().collect()
    }
}

/// Everything the finalizer needs to close out a task. `user`/`workflow`
/// are `None` when the caller (e.g. the `/finish` endpoint) doesn't have
/// them handy; the finalizer fills them in from the live broker hash.
pub struct FinalizeRequest {
    pub task_id: String,
    pub redis_key: String,
    pub user: Option<String>,
    pub workflow: Option<String>,
    pub status: TaskStatus,
    pub result_text: String,
    pub notify: bool,
}

/// The single action that writes a task's terminal state to both the live
/// broker hash and the durable row, then emits the terminal event and
/// (optionally) fires the outbound reply subprocess. Idempotent: calling it
/// twice with the same arguments leaves both views byte-identical.
pub struct Finalizer {
    broker: BrokerClient,
    store: Store,
    workflow_config: Arc<WorkflowConfig>,
}

impl Finalizer {
    pub fn new(broker: BrokerClient, store: Store, workflow_config: Arc<WorkflowConfig>) -> Self {
        Self {
            broker,
            store,
            workflow_config,
        }
    }

    pub async fn finalize(&self, request: FinalizeRequest) -> anyhow::Result<()> {
        let FinalizeRequest {
            task_id,
            redis_key,
            user,
            workflow,
            status,
            result_text,
            notify,
        } = request;

        let user = match user {
            Some(u) if !u.is_empty() => u,
            _ => self
                .broker
                .hget(&redis_key, "user")
                .await
                .ok()
                .flatten()
                .unwrap_or_default(),
        };
        let workflow = match workflow {
            Some(w) if !w.is_empty() => w,
            _ => self
                .broker
                .hget(&redis_key, "workflow")
                .await
                .ok()
                .flatten()
                .unwrap_or_default(),
        };

        let result_text = {
            let stripped = result_text.trim();
            let normalized = if stripped.is_empty() {
                NO_RESULT_TEXT
            } else {
                stripped
            };
            trim_chars(normalized)
        };

        let now = now_secs();

        let status_str = status.to_string();
        let now_str = now.to_string();
        if let Err(e) = self
            .broker
            .hset(
                &redis_key,
                &[
                    ("status", status_str.as_str()),
                    ("finished_at", now_str.as_str()),
                    ("final_result", result_text.as_str()),
                    ("workflow", workflow.as_str()),
                    ("user", user.as_str()),
                ],
            )
            .await
        {
            warn!(%task_id, error = %e, "failed to write live status hash on finalize");
        }

        self.store
            .update_task(
                &task_id,
                &TaskUpdate {
                    status: Some(status),
                    result: Some(result_text.clone()),
                    ..Default::default()
                },
                now,
            )
            .await?;

        self.store
            .record_event(
                &task_id,
                "workflow",
                &status.to_string(),
                None,
                Some(&result_text),
                None,
                now,
            )
            .await?;

        info!(%task_id, %workflow, status = %status, "task finalized");

        if notify && !user.is_empty() {
            let composed = format!("任务 {task_id} ({workflow}) {status}。\n结果: {result_text}");
            if let Err(e) = send_reply(&user, &composed, &self.workflow_config).await {
                warn!(%task_id, error = %e, "reply notification failed");
            }
        }

        Ok(())
    }
}

/// Fires the outbound reply subprocess without a timeout (§4.7.6); its
/// model-connection flags are passed through only when configured, same
/// as the deployment check and travel plan workflows.
async fn send_reply(user: &str, message: &str, config: &WorkflowConfig) -> std::io::Result<()> {
    let mut command = tokio::process::Command::new(&config.script_interpreter);
    command
        .current_dir(&config.project_root)
        .arg("scripts/reply_msg.py")
        .arg("--user")
        .arg(user)
        .arg("--message")
        .arg(message);

    if !config.model_base_url.is_empty() {
        command.arg("--base-url").arg(&config.model_base_url);
    }
    if !config.model_api_key.is_empty() {
        command.arg("--apikey").arg(&config.model_api_key);
    }
    if !config.model_name.is_empty() {
        command.arg("--model").arg(&config.model_name);
    }

    command.status().await.map(|_| ())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_text_defaults_to_placeholder() {
        let stripped = "   ".trim();
        let normalized = if stripped.is_empty() {
            NO_RESULT_TEXT
        } else {
            stripped
        };
        assert_eq!(normalized, NO_RESULT_TEXT);
    }

    #[test]
    fn trim_chars_keeps_trailing_window() {
        let long = "x".repeat(2_500);
        assert_eq!(trim_chars(&long).chars().count(), OUTPUT_TRIM_CHARS);
    }
}
