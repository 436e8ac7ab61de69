use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// The HTTP surface's single error type. Composes the per-crate error
/// enums (`BrokerError`, `StoreError`, `IntakeError`) into the `{status:
/// "error", msg}` response contract from §6, with a status code chosen per
/// the policy in §7.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Broker(#[from] aglm_broker::BrokerError),

    #[error(transparent)]
    Store(#[from] aglm_storage::StoreError),

    #[error(transparent)]
    Intake(#[from] aglm_worker::IntakeError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Broker(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(aglm_storage::StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Intake(aglm_worker::IntakeError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Intake(aglm_worker::IntakeError::Broker(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Intake(aglm_worker::IntakeError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "status": "error", "msg": self.to_string() }));
        (status, body).into_response()
    }
}
