use thiserror::Error;

/// Failures in the intake path (resolving intent/workflow, minting and
/// persisting a task, pushing onto the broker).
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Broker(#[from] aglm_broker::BrokerError),

    #[error(transparent)]
    Store(#[from] aglm_storage::StoreError),
}

/// Failures building or running a workflow's argv inside a worker. These
/// never propagate out of the worker loop — each maps to a terminal
/// `failed` status and a Chinese-language result message per the source's
/// own user-facing strings.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("构建命令失败: {0}")]
    Build(String),

    #[error("执行超时")]
    Timeout,

    #[error("执行异常: {0}")]
    Launch(String),
}
