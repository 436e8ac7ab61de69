use anyhow::{Context, Result};
use aglm_storage::Driver;
use aglm_worker::WorkflowConfig;

/// Process-wide configuration, loaded once at startup from the environment
/// (via `dotenvy` then `std::env::var`, the teacher's own pattern). A
/// missing required variable is a startup-time `anyhow::Context`-wrapped
/// error, never a panic.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_driver: Driver,
    pub database_url: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub task_queue: String,
    pub task_prefix: String,
    pub worker_count: usize,
    pub brpop_timeout_secs: u64,
    pub listen_addr: String,
    pub workflow: WorkflowConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let driver_str = std::env::var("AGLM_DB_DRIVER").unwrap_or_else(|_| "sqlite".to_string());
        let db_driver =
            Driver::from_env_str(&driver_str).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let database_url = match db_driver {
            Driver::Sqlite => {
                let path =
                    std::env::var("AGLM_DB_PATH").unwrap_or_else(|_| "aglm.db".to_string());
                format!("sqlite://{path}?mode=rwc")
            }
            Driver::MySql => {
                let host = std::env::var("AGLM_DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                let port = std::env::var("AGLM_DB_PORT").unwrap_or_else(|_| "3306".to_string());
                let user = std::env::var("AGLM_DB_USER")
                    .context("AGLM_DB_USER is required when AGLM_DB_DRIVER=mysql")?;
                let password = std::env::var("AGLM_DB_PASSWORD").unwrap_or_default();
                let name = std::env::var("AGLM_DB_NAME")
                    .context("AGLM_DB_NAME is required when AGLM_DB_DRIVER=mysql")?;
                format!("mysql://{user}:{password}@{host}:{port}/{name}")
            }
        };

        let redis_host = std::env::var("AGLM_REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redis_port = std::env::var("AGLM_REDIS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6379);
        let redis_db = std::env::var("AGLM_REDIS_DB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let task_queue =
            std::env::var("AGLM_TASK_QUEUE").unwrap_or_else(|_| "aglm:task_queue".to_string());
        let task_prefix =
            std::env::var("AGLM_TASK_PREFIX").unwrap_or_else(|_| "aglm:task".to_string());

        let worker_count = std::env::var("AGLM_WORKER_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let brpop_timeout_secs = std::env::var("AGLM_BRPOP_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let listen_addr = std::env::var("AGLM_API_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let workflow = WorkflowConfig::from_env()?;

        Ok(Self {
            db_driver,
            database_url,
            redis_host,
            redis_port,
            redis_db,
            task_queue,
            task_prefix,
            worker_count,
            brpop_timeout_secs,
            listen_addr,
            workflow,
        })
    }
}
