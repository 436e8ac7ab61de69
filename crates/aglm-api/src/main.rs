// AGLM task queue service: HTTP surface and process entrypoint.

mod config;
mod enqueue;
mod error;
mod finish;
mod health;
mod state;
mod task;

use std::sync::Arc;

use anyhow::{Context, Result};
use aglm_broker::BrokerClient;
use aglm_storage::Store;
use aglm_worker::{WorkflowConfig, WorkflowRegistry, WorkerPool};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        enqueue::enqueue,
        finish::finish,
        health::health,
        task::get_task,
    ),
    components(schemas(
        enqueue::EnqueueRequest,
        enqueue::EnqueueResponse,
        finish::FinishRequest,
        finish::FinishResponse,
        health::HealthResponse,
        task::TaskResponse,
        aglm_contracts::Intent,
        aglm_contracts::TaskStatus,
        aglm_contracts::TaskSummary,
        aglm_contracts::TaskEventSummary,
    )),
    tags(
        (name = "tasks", description = "Enqueue, finalize, and inspect tasks"),
        (name = "health", description = "Liveness probe"),
    ),
    info(
        title = "AGLM Task Queue API",
        version = "0.1.0",
        description = "Backend control plane for the phone-agent automation product: \
                       intake, classification, durable storage, and worker dispatch.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aglm_api=info,aglm_worker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("aglm-api starting...");

    let config = Config::from_env().context("failed to load configuration")?;

    let store = Store::connect(config.db_driver, &config.database_url)
        .await
        .context("failed to connect to the store")?;
    tracing::info!(driver = ?config.db_driver, "store connected");

    let broker = BrokerClient::new(config.redis_host.clone(), config.redis_port, config.redis_db);

    let workflow_config = Arc::new(config.workflow.clone());
    let registry = Arc::new(WorkflowRegistry::new(&workflow_config));

    let pool = Arc::new(WorkerPool::new(
        broker.clone(),
        store.clone(),
        registry.clone(),
        workflow_config.clone(),
        config.task_queue.clone(),
        config.task_prefix.clone(),
        config.worker_count,
        config.brpop_timeout_secs,
    ));
    pool.start();
    tracing::info!(worker_count = config.worker_count, "worker pool started");

    let state = AppState {
        store,
        broker,
        registry,
        workflow_config,
        queue_key: config.task_queue.clone(),
        task_prefix: config.task_prefix.clone(),
    };

    let app = Router::new()
        .merge(enqueue::routes(state.clone()))
        .merge(finish::routes(state.clone()))
        .merge(health::routes(state.clone()))
        .merge(task::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .context("server error")?;

    Ok(())
}

/// Waits for SIGINT or (on unix) SIGTERM, then asks the worker pool to stop
/// accepting new cycles after the in-flight `BRPOP` returns — the
/// graceful-drain behavior called for in §9's design notes.
async fn shutdown_signal(pool: Arc<WorkerPool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining workers");
    pool.shutdown();
}
