//! HTTP surface for the AGLM task queue service: `/enqueue`, `/webhook`,
//! `/finish`, `/health`, `/task/{id}`. Exposed as a library (in addition to
//! the `aglm-api` binary) so integration tests can drive the assembled
//! `Router` in-process with `tower::ServiceExt::oneshot` instead of
//! standing up a live server.

pub mod config;
pub mod enqueue;
pub mod error;
pub mod finish;
pub mod health;
pub mod state;
pub mod task;

use axum::Router;
use state::AppState;

/// Assemble the full router (without the CORS/trace layers or Swagger UI
/// main.rs adds — those are ambient HTTP concerns, not part of the route
/// contract tests exercise).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(enqueue::routes(state.clone()))
        .merge(finish::routes(state.clone()))
        .merge(health::routes(state.clone()))
        .merge(task::routes(state))
}
