//! API integration tests.
//!
//! Each test builds the full router over a private in-memory store and drives
//! it with `oneshot`, so no socket or external database is needed.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use hollow_api::{AppStateInner, CredentialHasher, HasherConfig, TokenService, router};
use hollow_db::Database;

const SECRET: &str = "integration-secret";

fn test_app() -> Router {
    let hasher = CredentialHasher::new(&HasherConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();

    router(Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        tokens: TokenService::new(SECRET),
        hasher,
    }))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

/// Register and log in; returns the bearer token.
async fn signed_in(app: &Router, email: &str) -> String {
    let (status, _) = register(app, email, "secret1").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = login(app, email, "secret1").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_box(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/boxes",
            Some(token),
            Some(json!({ "name": name, "description": "test box" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn post_message(
    app: &Router,
    box_id: &str,
    token: Option<&str>,
    content: &str,
    is_anonymous: bool,
) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            &format!("/api/boxes/{box_id}/messages"),
            token,
            Some(json!({ "content": content, "is_anonymous": is_anonymous })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn toggle_like(app: &Router, message_id: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(
        app,
        json_request("POST", &format!("/api/messages/{message_id}/like"), token, None),
    )
    .await
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_register_login_like_scenario() {
    let app = test_app();

    let (status, body) = register(&app, "alice@example.com", "secret1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_str().unwrap().parse::<Uuid>().is_ok());

    let (status, body) = register(&app, "alice@example.com", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already exists");

    let (status, body) = login(&app, "alice@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = login(&app, "alice@example.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"]["avatar"].as_str().unwrap().starts_with("data:image/png;base64,"));
    assert!(body["user"].get("password").is_none());

    let box_id = create_box(&app, &token, "confessions").await;
    let message_id = post_message(&app, &box_id, None, "hello", true).await;

    let (status, body) = toggle_like(&app, &message_id, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_liked"], true);
    assert_eq!(body["like_count"], 1);

    let (status, body) = toggle_like(&app, &message_id, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_liked"], false);
    assert_eq!(body["like_count"], 0);
}

#[tokio::test]
async fn test_login_unknown_email() {
    let app = test_app();
    let (status, body) = login(&app, "nobody@example.com", "secret1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    // A wrong password for a real account is indistinguishable.
    register(&app, "alice@example.com", "secret1").await;
    let (wrong_status, wrong_body) = login(&app, "alice@example.com", "secret2").await;
    assert_eq!(wrong_status, status);
    assert_eq!(wrong_body, body);
}

#[tokio::test]
async fn test_register_validation() {
    let app = test_app();

    let (status, _) = register(&app, "not-an-email", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = register(&app, "bob@example.com", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least 6"));
}

#[tokio::test]
async fn test_register_rejects_bad_json() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// =============================================================================
// Auth gate
// =============================================================================

#[tokio::test]
async fn test_like_requires_token() {
    let app = test_app();
    let message_id = Uuid::new_v4().to_string();

    let (status, body) = toggle_like(&app, &message_id, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization header is required");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    let uri = format!("/api/messages/{}/like", Uuid::new_v4());

    for value in [format!("Token {token}"), "Bearer".to_string(), format!("Bearer {token} extra")] {
        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::AUTHORIZATION, value.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {value:?}");
        assert_eq!(body["error"], "Invalid token format");
    }
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let app = test_app();
    let forged = TokenService::new("some-other-secret").issue(Uuid::new_v4()).unwrap();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/boxes", Some(&forged), Some(json!({ "name": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token signature");
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = test_app();
    let issued = chrono::Utc::now() - chrono::Duration::hours(25);
    let expired = TokenService::new(SECRET).issue_at(Uuid::new_v4(), issued).unwrap();

    let (status, body) = toggle_like(&app, &Uuid::new_v4().to_string(), Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has expired");
}

#[tokio::test]
async fn test_valid_token_for_unstored_user_is_authorised() {
    let app = test_app();
    let token = TokenService::new(SECRET).issue(Uuid::new_v4()).unwrap();

    let box_id = create_box(&app, &token, "orphan").await;
    let message_id = post_message(&app, &box_id, Some(&token), "hi", false).await;

    let (status, body) = toggle_like(&app, &message_id, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_liked"], true);
    assert_eq!(body["like_count"], 1);

    let (status, body) = send(&app, json_request("GET", &format!("/api/boxes/{box_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["like_count"], 1);
}

// =============================================================================
// Likes
// =============================================================================

#[tokio::test]
async fn test_like_bad_id_and_missing_message() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, body) = toggle_like(&app, "not-a-uuid", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid message ID");

    let (status, body) = toggle_like(&app, &Uuid::new_v4().to_string(), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Message not found");
}

#[tokio::test]
async fn test_likes_from_two_users() {
    let app = test_app();
    let alice = signed_in(&app, "alice@example.com").await;
    let bob = signed_in(&app, "bob@example.com").await;

    let box_id = create_box(&app, &alice, "general").await;
    let message_id = post_message(&app, &box_id, Some(&alice), "hi", false).await;

    toggle_like(&app, &message_id, Some(&alice)).await;
    let (_, body) = toggle_like(&app, &message_id, Some(&bob)).await;
    assert_eq!(body["is_liked"], true);
    assert_eq!(body["like_count"], 2);

    // Each viewer sees their own like state.
    let (_, detail) = send(&app, json_request("GET", &format!("/api/boxes/{box_id}"), Some(&bob), None)).await;
    assert_eq!(detail["messages"][0]["like_count"], 2);
    assert_eq!(detail["messages"][0]["is_liked"], true);

    toggle_like(&app, &message_id, Some(&bob)).await;
    let (_, detail) = send(&app, json_request("GET", &format!("/api/boxes/{box_id}"), Some(&bob), None)).await;
    assert_eq!(detail["messages"][0]["like_count"], 1);
    assert_eq!(detail["messages"][0]["is_liked"], false);

    let (_, detail) = send(&app, json_request("GET", &format!("/api/boxes/{box_id}"), None, None)).await;
    assert_eq!(detail["messages"][0]["is_liked"], false);
    assert!(detail["messages"][0].get("liked_by").is_none());
}

// =============================================================================
// Boxes and messages
// =============================================================================

#[tokio::test]
async fn test_create_box_requires_token() {
    let app = test_app();
    let (status, _) = send(
        &app,
        json_request("POST", "/api/boxes", None, Some(json!({ "name": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_boxes_newest_first() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    create_box(&app, &token, "older").await;
    create_box(&app, &token, "newer").await;

    let (status, body) = send(&app, json_request("GET", "/api/boxes", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let boxes = body.as_array().unwrap();
    assert_eq!(boxes.len(), 2);
    assert_eq!(boxes[0]["name"], "newer");
    assert_eq!(boxes[1]["name"], "older");
}

#[tokio::test]
async fn test_create_box_validation() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/boxes", Some(&token), Some(json!({ "name": "   " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_message_sender_visibility() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    let box_id = create_box(&app, &token, "general").await;

    post_message(&app, &box_id, Some(&token), "signed", false).await;
    post_message(&app, &box_id, Some(&token), "hidden", true).await;
    post_message(&app, &box_id, None, "drive-by", false).await;

    let (status, body) = send(&app, json_request("GET", &format!("/api/boxes/{box_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["box"]["name"], "general");

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);

    assert_eq!(messages[0]["content"], "drive-by");
    assert!(messages[0].get("sender_email").is_none());
    assert_eq!(messages[0]["is_anonymous"], true);

    assert_eq!(messages[1]["content"], "hidden");
    assert!(messages[1].get("sender_email").is_none());

    assert_eq!(messages[2]["content"], "signed");
    assert_eq!(messages[2]["sender_email"], "alice@example.com");
    assert_eq!(messages[2]["is_anonymous"], false);
}

#[tokio::test]
async fn test_box_lookup_errors() {
    let app = test_app();

    let (status, body) = send(&app, json_request("GET", "/api/boxes/xyz", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid box ID");

    let missing = Uuid::new_v4();
    let (status, body) = send(&app, json_request("GET", &format!("/api/boxes/{missing}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Box not found");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/boxes/{missing}/messages"),
            None,
            Some(json!({ "content": "into the void" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;
    let box_id = create_box(&app, &token, "general").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/boxes/{box_id}/messages"),
            None,
            Some(json!({ "content": "  " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Avatars
// =============================================================================

fn multipart_request(token: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let boundary = "hollow-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"avatar\"; filename=\"{file_name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/users/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_avatar_upload_and_fetch() {
    let app = test_app();
    let (_, registered) = register(&app, "alice@example.com", "secret1").await;
    let user_id = registered["id"].as_str().unwrap().to_string();
    let (_, session) = login(&app, "alice@example.com", "secret1").await;
    let token = session["token"].as_str().unwrap();

    // Default avatar is served before any upload.
    let response = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/users/{user_id}/avatar"), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let gif = b"GIF89a-not-really";
    let (status, body) = send(&app, multipart_request(token, "me.gif", gif)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["avatar"].as_str().unwrap().starts_with("data:image/gif;base64,"));

    let response = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/users/{user_id}/avatar"), None, None))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], gif);
}

#[tokio::test]
async fn test_avatar_rejects_non_image() {
    let app = test_app();
    let token = signed_in(&app, "alice@example.com").await;

    let (status, body) = send(&app, multipart_request(&token, "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only image files are allowed");
}

#[tokio::test]
async fn test_avatar_unknown_user() {
    let app = test_app();
    let (status, _) = send(
        &app,
        json_request("GET", &format!("/api/users/{}/avatar", Uuid::new_v4()), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
