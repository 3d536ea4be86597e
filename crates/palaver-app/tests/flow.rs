//! End-to-end flows against an in-process stand-in for the remote API:
//! login populating the session and driving the guard, and the chat
//! controller's send/delete pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use palaver_app::chat::{ChatController, ChatError};
use palaver_app::flows;
use palaver_client::ApiClient;
use palaver_session::{Access, Route, SessionGuard, SessionStore};
use palaver_types::api::Claims;
use palaver_types::models::BOT_AUTHOR_ID;

const CSRF_TOKEN: &str = "csrf-flow-test";
const PASSWORD: &str = "hunter2!";
const AVATAR_URL: &str = "https://i.pravatar.cc/200?img=33";

#[derive(Clone, Default)]
struct Mock {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    messages: Mutex<Vec<Value>>,
    posts: AtomicUsize,
    deletes: AtomicUsize,
}

impl Mock {
    fn seed_message(&self, user_id: &str, text: &str) {
        self.inner.messages.lock().unwrap().push(json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "text": text,
            "userId": user_id,
            "createdAt": chrono::Utc::now().to_rfc3339(),
        }));
    }

    fn stored_texts(&self) -> Vec<String> {
        self.inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

fn mint_token(user_id: &str, username: &str) -> String {
    // this service has shipped the subject as `userId`
    let claims = Claims {
        user_id: Some(user_id.to_string()),
        username: Some(username.to_string()),
        exp: Some((chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize),
        ..Claims::default()
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"flow-test-secret"),
    )
    .expect("token encodes")
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
}

async fn csrf() -> Json<Value> {
    Json(json!({ "csrfToken": CSRF_TOKEN }))
}

async fn issue_token(Json(body): Json<Value>) -> axum::response::Response {
    let username = body["username"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    Json(json!({ "token": mint_token(&format!("u-{username}"), username) })).into_response()
}

async fn get_user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "id": id, "avatar": AVATAR_URL }))
}

async fn get_messages(State(mock): State<Mock>, headers: HeaderMap) -> axum::response::Response {
    if !has_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(Value::Array(mock.inner.messages.lock().unwrap().clone())).into_response()
}

async fn post_message(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !has_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    mock.inner.posts.fetch_add(1, Ordering::SeqCst);
    let id = uuid::Uuid::new_v4().to_string();
    mock.inner.messages.lock().unwrap().push(json!({
        "id": id,
        "text": body["text"],
        "userId": "u-alice",
        "createdAt": chrono::Utc::now().to_rfc3339(),
    }));
    (
        StatusCode::CREATED,
        Json(json!({ "latestMessage": { "id": id } })),
    )
        .into_response()
}

async fn remove_message(
    State(mock): State<Mock>,
    Path(id): Path<String>,
) -> axum::response::Response {
    mock.inner.deletes.fetch_add(1, Ordering::SeqCst);
    let mut messages = mock.inner.messages.lock().unwrap();
    messages.retain(|m| m["id"].as_str() != Some(&*id));
    Json(json!({ "deleteMessage": true })).into_response()
}

async fn spawn_mock() -> (ApiClient, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/csrf", patch(csrf))
        .route("/auth/token", post(issue_token))
        .route("/users/{id}", get(get_user))
        .route("/messages", get(get_messages).post(post_message))
        .route("/messages/{id}", delete(remove_message))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (ApiClient::new(format!("http://{addr}")), mock)
}

#[tokio::test]
async fn login_populates_session_and_flips_the_guard() {
    let (client, _mock) = spawn_mock().await;
    let store = SessionStore::in_memory();

    // entry view reachable while logged out, chat is not
    let guard = SessionGuard::new(&store);
    assert!(matches!(guard.check(Route::Login), Access::Continue));
    assert!(matches!(guard.check(Route::Chat), Access::Redirect(Route::Login)));

    let session = flows::login(&client, &store, "alice", PASSWORD).await.unwrap();
    assert_eq!(session.user_id, "u-alice");
    assert_eq!(session.username, "alice");
    assert!(!session.token.is_empty());
    assert!(!session.csrf_token.is_empty());
    assert_eq!(session.avatar_url, AVATAR_URL);

    // the guard now sends entry views to the chat and grants the chat
    let guard = SessionGuard::new(&store);
    assert!(matches!(guard.check(Route::Login), Access::Redirect(Route::Chat)));
    assert!(matches!(guard.check(Route::Register), Access::Redirect(Route::Chat)));
    assert!(matches!(guard.check(Route::Chat), Access::Granted(_)));

    // logout flips it back
    let outcome = store.logout();
    assert!(outcome.success);
    assert!(matches!(
        SessionGuard::new(&store).check(Route::Chat),
        Access::Redirect(Route::Login)
    ));
}

#[tokio::test]
async fn failed_login_writes_no_session() {
    let (client, _mock) = spawn_mock().await;
    let store = SessionStore::in_memory();

    let err = flows::login(&client, &store, "alice", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(store.session().is_none());
    assert!(matches!(
        SessionGuard::new(&store).check(Route::Chat),
        Access::Redirect(Route::Login)
    ));
}

#[tokio::test]
async fn script_payload_is_stored_and_rendered_as_hello() {
    let (client, mock) = spawn_mock().await;
    let store = SessionStore::in_memory();
    let session = flows::login(&client, &store, "alice", PASSWORD).await.unwrap();

    let mut controller = ChatController::new(client, session, AVATAR_URL.to_string())
        .with_bot_reply_delay(Duration::ZERO);

    controller
        .send("<script>alert(1)</script>Hello")
        .await
        .unwrap();

    assert_eq!(mock.stored_texts(), vec!["Hello".to_string()]);

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].html, "Hello");
    assert!(controller.deletable(0));

    // the synthetic reply trails the sent message and is never deletable
    let reply = messages.last().unwrap();
    assert!(reply.synthetic);
    assert_eq!(reply.author_id, BOT_AUTHOR_ID);
    assert!(!controller.deletable(messages.len() - 1));
}

#[tokio::test]
async fn fully_disallowed_message_rejected_without_network() {
    let (client, mock) = spawn_mock().await;
    let store = SessionStore::in_memory();
    let session = flows::login(&client, &store, "alice", PASSWORD).await.unwrap();

    let mut controller = ChatController::new(client, session, AVATAR_URL.to_string())
        .with_bot_reply_delay(Duration::ZERO);

    let err = controller.send("<script>alert(1)</script>").await.unwrap_err();
    assert!(matches!(err, ChatError::Rejected(_)));
    assert_eq!(mock.inner.posts.load(Ordering::SeqCst), 0);
    assert!(mock.stored_texts().is_empty());
}

#[tokio::test]
async fn foreign_messages_are_not_deletable() {
    let (client, mock) = spawn_mock().await;
    mock.seed_message("u-someone-else", "not yours");

    let store = SessionStore::in_memory();
    let session = flows::login(&client, &store, "alice", PASSWORD).await.unwrap();

    let mut controller = ChatController::new(client, session, AVATAR_URL.to_string())
        .with_bot_reply_delay(Duration::ZERO);
    controller.load().await.unwrap();

    assert!(!controller.deletable(0));
    let err = controller.delete(0).await.unwrap_err();
    assert!(matches!(err, ChatError::NotDeletable));
    assert_eq!(mock.inner.deletes.load(Ordering::SeqCst), 0);

    let err = controller.delete(99).await.unwrap_err();
    assert!(matches!(err, ChatError::NoSuchMessage));
}
