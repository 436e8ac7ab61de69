// End-to-end HTTP flow tests: enqueue -> lookup -> finish, driven in-process
// against the assembled router with a fake RESP broker standing in for
// Redis and an in-memory sqlite store standing in for the relational
// backend (see §8's end-to-end scenarios).

mod support;

use std::sync::Arc;

use aglm_api::state::AppState;
use aglm_broker::BrokerClient;
use aglm_storage::{Driver, Store};
use aglm_worker::{WorkflowConfig, WorkflowRegistry};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use support::FakeBroker;

fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        model_base_url: "http://localhost".into(),
        model_name: "m".into(),
        model_api_key: "k".into(),
        device_id: "d".into(),
        deploy_timeout_secs: 300,
        deploy_messages_file: "deploy_messages.json".into(),
        cmd_timeout_secs: 300,
        scripts_dir: std::env::temp_dir(),
        script_interpreter: "python3".into(),
        project_root: std::env::temp_dir(),
    }
}

async fn test_state() -> (AppState, FakeBroker) {
    let broker_server = FakeBroker::spawn().await;
    let broker = BrokerClient::new(
        broker_server.addr.ip().to_string(),
        broker_server.addr.port(),
        0,
    );
    let store = Store::connect(Driver::Sqlite, "sqlite::memory:")
        .await
        .expect("in-memory sqlite store");
    let workflow_config = workflow_config();
    let registry = Arc::new(WorkflowRegistry::new(&workflow_config));

    let state = AppState {
        store,
        broker,
        registry,
        workflow_config: Arc::new(workflow_config),
        queue_key: "aglm:task_queue".into(),
        task_prefix: "aglm:task".into(),
    };
    (state, broker_server)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn enqueue_classifies_deployment_check_and_seeds_live_status() {
    let (state, broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/enqueue")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"user": "alice", "content": "帮我查一下部署健康状况"}).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["status"], "accepted");
    assert_eq!(body["intent"]["intent"], "deployment_check");
    assert_eq!(body["intent"]["workflow"], "deployment_check");
    assert_eq!(body["queue_length"], 1);

    let task_id = body["task_id"].as_str().unwrap();
    assert!(task_id.starts_with("AGLM-"));
    assert_eq!(broker.list_len("aglm:task_queue"), 1);
    assert_eq!(
        broker.hash_get(&format!("aglm:task:{task_id}"), "status"),
        Some("pending".to_string())
    );
}

#[tokio::test]
async fn webhook_is_an_alias_for_enqueue() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(json!({"user": "bob", "content": "hello world"}).to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["intent"]["workflow"], "echo");
}

#[tokio::test]
async fn empty_user_returns_error_body() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/enqueue")
        .header("content-type", "application/json")
        .body(Body::from(json!({"user": "", "content": "hi"}).to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn finish_updates_task_and_get_task_reflects_it() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let enqueue_request = Request::builder()
        .method("POST")
        .uri("/enqueue")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"user": "carol", "content": "帮我查数据报表"}).to_string(),
        ))
        .unwrap();
    let enqueue_response = router.clone().oneshot(enqueue_request).await.unwrap();
    let enqueue_body = body_json(enqueue_response).await;
    let task_id = enqueue_body["task_id"].as_str().unwrap().to_string();
    assert_eq!(enqueue_body["intent"]["workflow"], "report_stub");

    let finish_request = Request::builder()
        .method("POST")
        .uri("/finish")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "task_id": task_id,
                "status": "success",
                "result": "42 rows returned",
                "notify": false,
            })
            .to_string(),
        ))
        .unwrap();
    let finish_response = router.clone().oneshot(finish_request).await.unwrap();
    assert_eq!(finish_response.status(), StatusCode::OK);

    let task_request = Request::builder()
        .method("GET")
        .uri(format!("/task/{task_id}"))
        .body(Body::empty())
        .unwrap();
    let task_response = router.oneshot(task_request).await.unwrap();
    assert_eq!(task_response.status(), StatusCode::OK);
    let task_body = body_json(task_response).await;

    assert_eq!(task_body["task"]["status"], "success");
    assert_eq!(task_body["task"]["result"], "42 rows returned");
    let events = task_body["events"].as_array().unwrap();
    assert!(events.iter().any(|e| e["phase"] == "enqueue"));
    assert!(events.iter().any(|e| e["phase"] == "workflow"));
}

#[tokio::test]
async fn finish_on_unknown_task_is_not_found() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/finish")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"task_id": "AGLM-DEADBEEF", "status": "failed"}).to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_task_for_unknown_id_is_not_found() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/task/AGLM-00000000")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let (state, _broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn two_concurrent_enqueues_mint_distinct_ids_and_grow_queue_by_two() {
    let (state, broker) = test_state().await;
    let router = aglm_api::build_router(state);

    let make_request = || {
        Request::builder()
            .method("POST")
            .uri("/enqueue")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"user": "dave", "content": "same body"}).to_string(),
            ))
            .unwrap()
    };

    let (r1, r2) = tokio::join!(
        router.clone().oneshot(make_request()),
        router.oneshot(make_request())
    );

    let id1 = body_json(r1.unwrap()).await["task_id"]
        .as_str()
        .unwrap()
        .to_string();
    let id2 = body_json(r2.unwrap()).await["task_id"]
        .as_str()
        .unwrap()
        .to_string();

    assert_ne!(id1, id2);
    assert_eq!(broker.list_len("aglm:task_queue"), 2);
}
