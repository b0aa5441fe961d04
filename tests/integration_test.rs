//! Integration tests for the Chatterbox service.
//!
//! These tests load `tests/data/chat_api.json` and drive the HTTP API
//! through the router without binding a socket.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use chatterbox::{
    handlers::{functions_handler, health_handler, ready_handler, resolve_handler},
    AppState, Chatterbox, CollisionPolicy, Config, DocumentSource, TagFilter,
};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn fixture_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/chat_api.json"))
}

fn chat_config() -> Config {
    let mut config = Config::with_source(DocumentSource::File(fixture_path()));
    config.tag_filter = TagFilter::new(["Chat"]);
    config
}

async fn load_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config).await.expect("Failed to create AppState"))
}

/// Helper to create a test router with every endpoint.
fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/functions", get(functions_handler))
        .route("/resolve", post(resolve_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Helper to make a JSON request to the router.
async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

fn function_call(name: &str, arguments: Value) -> Value {
    json!({
        "role": "assistant",
        "content": null,
        "function_call": { "name": name, "arguments": arguments.to_string() }
    })
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let app = Router::new().route("/health", get(health_handler));
    let (status, body) = json_request(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_function_count() {
    let app = create_test_app(load_state(chat_config()).await);
    let (status, body) = json_request(app, "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["functions"], 3);
}

#[tokio::test]
async fn test_ready_waits_for_warmup() {
    let config = chat_config();
    let chatterbox = Chatterbox::load(
        &config.document_source,
        &config.tag_filter,
        CollisionPolicy::Suffix,
        config.fetch_timeout(),
    )
    .await
    .unwrap();
    let state = Arc::new(AppState::with_chatterbox(chatterbox, config));

    let (status, body) = json_request(create_test_app(state.clone()), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");

    state.warmup().unwrap();
    let (status, body) = json_request(create_test_app(state), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["functions"], 3);
}

#[tokio::test]
async fn test_resolve_empty_arguments_returns_422() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = json!({
        "role": "assistant",
        "function_call": { "name": "List_chats", "arguments": "" }
    });

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "malformed_arguments");
}

// ============================================================================
// Function Set Tests
// ============================================================================

#[tokio::test]
async fn test_functions_lists_tagged_operations() {
    let app = create_test_app(load_state(chat_config()).await);
    let (status, body) = json_request(app, "GET", "/functions", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["system_prompt"].as_str().unwrap().contains("function call"));
    assert_eq!(body["base_url"], "http://localhost:3000");
    assert_eq!(body["fingerprint"].as_str().unwrap().len(), 64);

    let names: Vec<&str> = body["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["List_chats", "Get_a_chat", "Follow_up_on_a_chat"]);
}

#[tokio::test]
async fn test_follow_up_descriptor_merges_path_and_body() {
    let app = create_test_app(load_state(chat_config()).await);
    let (_, body) = json_request(app, "GET", "/functions", None).await;

    let follow_up = body["functions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "Follow_up_on_a_chat")
        .unwrap()
        .clone();

    assert_eq!(follow_up["description"], "Append a message to an existing chat");
    assert_eq!(follow_up["parameters"]["type"], "object");
    assert_eq!(
        follow_up["parameters"]["properties"]["chatId"],
        json!({ "type": "string", "description": "The chat id" })
    );
    assert_eq!(
        follow_up["parameters"]["properties"]["mood"],
        json!({ "type": "string", "enum": ["happy", "neutral", "sad"] })
    );
    assert_eq!(follow_up["parameters"]["required"], json!(["chatId", "message"]));
}

#[tokio::test]
async fn test_empty_tag_filter_exposes_every_tagged_operation() {
    let config = Config::with_source(DocumentSource::File(fixture_path()));
    let state = load_state(config).await;

    // "Health check" has no tags and is never exposed.
    assert_eq!(state.chatterbox.functions().len(), 4);
    assert!(state.chatterbox.endpoints().get("Health_check").is_none());
    assert!(state.chatterbox.endpoints().get("Delete_a_user").is_some());
}

// ============================================================================
// Resolve Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_follow_up_on_a_chat() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = function_call(
        "Follow_up_on_a_chat",
        json!({ "message": "it's my birthday", "chatId": "55" }),
    );

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call"]["path"], "/chats/{chatId}");
    assert_eq!(body["call"]["method"], "post");
    assert_eq!(
        body["call"]["payload"],
        json!({ "message": "it's my birthday", "chatId": "55" })
    );
    assert_eq!(
        body["request"],
        json!({
            "url": "http://localhost:3000/chats/55",
            "method": "post",
            "data": { "message": "it's my birthday" }
        })
    );
    assert!(body["call_id"].is_string());
}

#[tokio::test]
async fn test_resolve_get_uses_query_params() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = function_call("List_chats", json!({ "limit": 10 }));

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["request"],
        json!({
            "url": "http://localhost:3000/chats",
            "method": "get",
            "params": { "limit": 10 }
        })
    );
}

#[tokio::test]
async fn test_resolve_colon_placeholder() {
    let config = Config::with_source(DocumentSource::File(fixture_path()));
    let app = create_test_app(load_state(config).await);
    let message = function_call("Delete_a_user", json!({ "userId": "u-7" }));

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["url"], "http://localhost:3000/users/u-7");
    assert_eq!(body["request"]["method"], "delete");
    assert_eq!(body["request"]["data"], json!({}));
    assert!(body["request"].get("params").is_none());
}

#[tokio::test]
async fn test_resolve_plain_message_returns_nulls() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = json!({ "role": "assistant", "content": "Hello" });

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["call"].is_null());
    assert!(body["request"].is_null());
}

#[tokio::test]
async fn test_resolve_unknown_function_returns_422() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = function_call("Delete_a_user", json!({ "userId": "1" }));

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "unknown_function");
    assert!(body["error"].as_str().unwrap().contains("Delete_a_user"));
}

#[tokio::test]
async fn test_resolve_malformed_arguments_returns_422() {
    let app = create_test_app(load_state(chat_config()).await);
    let message = json!({
        "role": "assistant",
        "function_call": { "name": "List_chats", "arguments": "{\"limit\": " }
    });

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "malformed_arguments");
}

#[tokio::test]
async fn test_resolve_oversized_arguments_returns_400() {
    let mut config = chat_config();
    config.max_argument_bytes = 16;
    let app = create_test_app(load_state(config).await);
    let message = function_call("List_chats", json!({ "filter": "x".repeat(64) }));

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

// ============================================================================
// Loading Tests
// ============================================================================

#[tokio::test]
async fn test_base_url_override() {
    let mut config = chat_config();
    config.base_url = Some("https://chat.example.com/".to_string());
    let app = create_test_app(load_state(config).await);
    let message = function_call("Get_a_chat", json!({ "chatId": 3 }));

    let (status, body) = json_request(app, "POST", "/resolve", Some(message)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["url"], "https://chat.example.com/chats/3");
}

#[tokio::test]
async fn test_document_without_paths_yields_no_functions() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "openapi": "3.0.0",
            "info": { "title": "Empty", "version": "1.0" },
            "servers": [{ "url": "http://localhost:3000" }]
        })
    )
    .unwrap();

    let config = Config::with_source(DocumentSource::File(file.path().to_path_buf()));
    let state = load_state(config).await;
    assert!(state.chatterbox.functions().is_empty());
    assert!(state.chatterbox.endpoints().is_empty());
}

#[tokio::test]
async fn test_invalid_document_fails_to_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", json!({ "info": { "title": "Invalid Swagger Doc" } })).unwrap();

    let config = Config::with_source(DocumentSource::File(file.path().to_path_buf()));
    let err = AppState::new(config).await.err().unwrap();
    assert_eq!(err.kind(), "invalid_document");
}
