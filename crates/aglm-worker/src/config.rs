use std::path::PathBuf;

/// Configuration needed to build workflow argvs. A subset of the full
/// process configuration (the remainder — DB/broker/listen-address
/// settings — lives in `aglm-api::Config`, which embeds this struct).
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub model_base_url: String,
    pub model_name: String,
    pub model_api_key: String,
    pub device_id: String,
    pub deploy_timeout_secs: u64,
    pub deploy_messages_file: String,
    pub cmd_timeout_secs: u64,
    /// Directory dynamic workflow scripts are discovered in (`workflows/{task_type}.py`).
    pub scripts_dir: PathBuf,
    /// Interpreter used to run a dynamically discovered script.
    pub script_interpreter: String,
    /// Working directory every workflow/reply child process is launched
    /// from, so its project-relative argv paths (`scripts/...`,
    /// `workflows/...`) resolve regardless of the binary's own cwd.
    pub project_root: PathBuf,
}

impl WorkflowConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let model_base_url = std::env::var("PHONE_AGENT_BASE_URL")
            .or_else(|_| std::env::var("AGLM_MODEL_BASE_URL"))
            .unwrap_or_default();
        let model_name = std::env::var("PHONE_AGENT_MODEL")
            .or_else(|_| std::env::var("AGLM_MODEL_NAME"))
            .unwrap_or_default();
        let model_api_key = std::env::var("PHONE_AGENT_API_KEY").unwrap_or_default();
        let device_id = std::env::var("PHONE_AGENT_DEVICE_ID").unwrap_or_default();

        let deploy_timeout_secs = std::env::var("AGLM_DEPLOY_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);
        let deploy_messages_file = std::env::var("AGLM_DEPLOY_MESSAGES_FILE")
            .unwrap_or_else(|_| "deploy_messages.json".to_string());
        let cmd_timeout_secs = std::env::var("AGLM_CMD_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            model_base_url,
            model_name,
            model_api_key,
            device_id,
            deploy_timeout_secs,
            deploy_messages_file,
            cmd_timeout_secs,
            scripts_dir: PathBuf::from("workflows"),
            script_interpreter: "python3".to_string(),
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        })
    }
}
