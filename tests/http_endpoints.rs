//! HTTP endpoint tests driven through the full router with `oneshot`.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use callbridge_gateway::{AppState, ServerConfig, routes};

fn base_config(instructions: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.openai_api_key = Some("sk-test".to_string());
    config.instructions_path = instructions.to_path_buf();
    config
}

fn app(config: ServerConfig) -> (Router, Arc<AppState>) {
    let state = AppState::new(config);
    (routes::create_router(state.clone()), state)
}

fn twilio_config(instructions: &Path, api_base_url: &str) -> ServerConfig {
    let mut config = base_config(instructions);
    config.twilio_account_sid = Some("AC123".to_string());
    config.twilio_auth_token = Some("secret".to_string());
    config.twilio_webhook_url = Some("https://bridge.example.com/incoming-call".to_string());
    config.twilio_api_base_url = api_base_url.to_string();
    config
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    raw_json_post(uri, &body.to_string())
}

fn raw_json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn mount_twilio_number(server: &MockServer, number: &str) {
    Mock::given(method("GET"))
        .and(path(
            "/2010-04-01/Accounts/AC123/AvailablePhoneNumbers/US/Local.json",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "available_phone_numbers": [{"phone_number": number}]
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/IncomingPhoneNumbers.json"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"phone_number": number})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Twilio Media Stream Server is running!"})
    );
}

#[tokio::test]
async fn test_incoming_call_uses_host_header() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/incoming-call")
                .header(header::HOST, "bridge.example.com:5050")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/xml"
    );
    let twiml = body_text(response).await;
    assert!(twiml.contains(r#"<Stream url="wss://bridge.example.com/media-stream"/>"#));
    assert!(twiml.contains("<Say>Please wait while we connect your call</Say>"));
    assert!(twiml.contains(r#"<Pause length="1"/>"#));
}

#[tokio::test]
async fn test_incoming_call_post_prefers_public_host() {
    let dir = TempDir::new().unwrap();
    let mut config = base_config(&dir.path().join("instr.txt"));
    config.public_host = Some("voice.example.org".to_string());
    let (app, _) = app(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "10.0.0.5:5050")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("CallSid=CA1&From=%2B15550001111"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("wss://voice.example.org/media-stream")
    );
}

#[tokio::test]
async fn test_incoming_call_without_host_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/incoming-call")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Missing Host header"})
    );
}

#[tokio::test]
async fn test_set_instruction_writes_profile() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("instr.txt");
    let (app, _) = app(base_config(&file));

    let response = app
        .oneshot(json_post(
            "/set-instruction",
            json!({
                "business_name": "Acme Plumbing",
                "business_description": "24/7 emergency plumbing",
                "instruction": "Be brief."
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Instructions saved successfully."})
    );
    let written = assert_ok!(std::fs::read_to_string(&file));
    assert_eq!(
        written,
        "Business Name: Acme Plumbing\nBusiness Description: 24/7 emergency plumbing\nInstruction: Be brief.\n"
    );
}

#[tokio::test]
async fn test_set_instruction_write_failure() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("missing-dir").join("instr.txt")));

    let response = app
        .oneshot(json_post("/set-instruction", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred while saving instructions: ")
    );
}

#[tokio::test]
async fn test_set_instruction_invalid_body_is_json_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("instr.txt");
    let (app, _) = app(base_config(&file));

    let response = app
        .oneshot(json_post("/set-instruction", json!({"business_name": null})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred while saving instructions: Failed to deserialize")
    );
    assert!(!file.exists());
}

#[tokio::test]
async fn test_assign_number_invalid_body_is_json_error() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(raw_json_post("/assign-twilio-number", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to parse the request body as JSON")
    );
}

#[tokio::test]
async fn test_assign_number_requires_user_id() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(json_post("/assign-twilio-number", json!({"user_id": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "User ID is required"})
    );
}

#[tokio::test]
async fn test_assign_number_without_twilio_credentials() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(base_config(&dir.path().join("instr.txt")));

    let response = app
        .oneshot(json_post("/assign-twilio-number", json!({"user_id": "u-1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Twilio credentials are not configured"})
    );
}

#[tokio::test]
async fn test_assign_number_buys_once_per_user() {
    let twilio = MockServer::start().await;
    mount_twilio_number(&twilio, "+15551234567").await;

    let dir = TempDir::new().unwrap();
    let (app, state) = app(twilio_config(&dir.path().join("instr.txt"), &twilio.uri()));

    let first = app
        .clone()
        .oneshot(json_post("/assign-twilio-number", json!({"user_id": "u-1"})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        body_json(first).await,
        json!({
            "message": "Twilio number assigned successfully",
            "twilio_number": "+15551234567"
        })
    );

    let second = app
        .oneshot(json_post("/assign-twilio-number", json!({"user_id": "u-1"})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        body_json(second).await,
        json!({
            "message": "User already has a Twilio number assigned",
            "twilio_number": "+15551234567"
        })
    );
    assert_eq!(state.numbers.get("u-1").as_deref(), Some("+15551234567"));
}

#[tokio::test]
async fn test_assign_number_with_no_inventory() {
    let twilio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/2010-04-01/Accounts/AC123/AvailablePhoneNumbers/US/Local.json",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"available_phone_numbers": []})),
        )
        .mount(&twilio)
        .await;

    let dir = TempDir::new().unwrap();
    let (app, state) = app(twilio_config(&dir.path().join("instr.txt"), &twilio.uri()));

    let response = app
        .oneshot(json_post("/assign-twilio-number", json!({"user_id": 7})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "No available Twilio numbers"})
    );
    assert!(state.numbers.get("7").is_none());
}

#[tokio::test]
async fn test_media_stream_per_ip_limit() {
    let dir = TempDir::new().unwrap();
    let mut config = base_config(&dir.path().join("instr.txt"));
    config.max_connections_per_ip = 0;
    let (app, state) = app(config);

    let mut request = Request::builder()
        .uri("/media-stream")
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap();
    let addr: SocketAddr = (Ipv4Addr::new(203, 0, 113, 9), 50000).into();
    request.extensions_mut().insert(ConnectInfo(addr));

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_text(response).await,
        "Too many connections from your IP address."
    );
    assert_eq!(state.ws_connection_count(), 0);
}
