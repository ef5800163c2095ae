// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token builders, a scripted mock API, and
//! assertion helpers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::auth::UserProfile;
use crate::config::ClientConfig;

/// Build an unsigned token whose payload is `claims`.
pub fn token_with_claims(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Build a token that expires `secs` seconds from now (negative for the past).
pub fn token_expiring_in(secs: i64) -> String {
    let now = crate::token::codec::now_millis() / 1000;
    token_with_claims(json!({ "sub": "user-1", "iat": now, "exp": now + secs }))
}

pub fn test_user() -> UserProfile {
    UserProfile {
        id: "user-1".to_owned(),
        first_name: "Ada".to_owned(),
        last_name: "Okafor".to_owned(),
        email: "ada@clinic.test".to_owned(),
        avatar: None,
        role: Some("admin".to_owned()),
    }
}

pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_owned(),
        timeout_ms: 2000,
        state_dir: None,
        refresh_lead_secs: 60,
        login_route: "/login".to_owned(),
        proactive_refresh: false,
    }
}

/// Scripted behaviour and call counters for the mock caredesk API.
pub struct MockApi {
    pub refresh_calls: AtomicU32,
    pub protected_calls: AtomicU32,
    pub unauthorized_replies: AtomicU32,
    pub logout_calls: AtomicU32,
    /// Bearer token the protected routes accept.
    pub valid_token: Mutex<String>,
    /// Status and body returned by `/auth/refresh`.
    pub refresh_reply: Mutex<(u16, Value)>,
    pub refresh_bodies: Mutex<Vec<Value>>,
    pub logout_status: AtomicU16,
    /// When set, `/auth/refresh` waits for a permit on `refresh_release`.
    pub hold_refresh: AtomicBool,
    pub refresh_release: Semaphore,
}

impl MockApi {
    /// A mock whose refresh endpoint hands out `new_token`.
    pub fn new(new_token: &str) -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicU32::new(0),
            protected_calls: AtomicU32::new(0),
            unauthorized_replies: AtomicU32::new(0),
            logout_calls: AtomicU32::new(0),
            valid_token: Mutex::new(new_token.to_owned()),
            refresh_reply: Mutex::new((200, json!({ "data": { "accessToken": new_token } }))),
            refresh_bodies: Mutex::new(Vec::new()),
            logout_status: AtomicU16::new(200),
            hold_refresh: AtomicBool::new(false),
            refresh_release: Semaphore::new(0),
        })
    }

    pub fn set_refresh_reply(&self, status: u16, body: Value) {
        *self.refresh_reply.lock() = (status, body);
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_count(&self) -> u32 {
        self.protected_calls.load(Ordering::SeqCst)
    }
}

fn reply(status: u16, body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(body))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

async fn patients(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    api.protected_calls.fetch_add(1, Ordering::SeqCst);
    let valid = api.valid_token.lock().clone();
    match bearer(&headers) {
        Some(token) if token == valid => {
            reply(200, json!({ "data": { "patients": ["p-1", "p-2"], "token": token } }))
        }
        _ => {
            api.unauthorized_replies.fetch_add(1, Ordering::SeqCst);
            reply(401, json!({ "message": "Unauthorized" }))
        }
    }
}

async fn whoami(headers: HeaderMap) -> Json<Value> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({ "data": { "authorization": auth } }))
}

async fn missing() -> (StatusCode, Json<Value>) {
    reply(404, json!({ "message": "Patient not found" }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "data": null }))
}

async fn refresh(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    api.refresh_calls.fetch_add(1, Ordering::SeqCst);
    api.refresh_bodies.lock().push(body);
    if api.hold_refresh.load(Ordering::SeqCst) {
        if let Ok(permit) = api.refresh_release.acquire().await {
            permit.forget();
        }
    }
    let (status, body) = api.refresh_reply.lock().clone();
    reply(status, body)
}

async fn login(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != "secret" {
        return reply(401, json!({ "message": "Invalid credentials" }));
    }
    let token = api.valid_token.lock().clone();
    reply(200, json!({ "data": { "accessToken": token, "refreshToken": "refresh-1", "user": test_user() } }))
}

async fn register(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"].as_str().unwrap_or_default().is_empty() {
        return reply(400, json!({ "message": "Email is required" }));
    }
    let token = api.valid_token.lock().clone();
    reply(201, json!({ "data": { "token": token, "refreshToken": "refresh-1", "user": test_user() } }))
}

async fn logout(State(api): State<Arc<MockApi>>) -> (StatusCode, Json<Value>) {
    api.logout_calls.fetch_add(1, Ordering::SeqCst);
    reply(api.logout_status.load(Ordering::SeqCst), json!({ "data": null }))
}

async fn google_callback(
    State(api): State<Arc<MockApi>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if params.get("code").map(String::as_str) != Some("good-code") {
        return reply(400, json!({ "message": "Invalid authorization code" }));
    }
    let token = api.valid_token.lock().clone();
    reply(200, json!({ "data": { "accessToken": token, "user": test_user() } }))
}

/// Serve `api` under `/api` on an ephemeral port. Returns the base URL.
pub async fn spawn_mock_api(api: Arc<MockApi>) -> String {
    let routes = Router::new()
        .route("/patients", get(patients).post(patients))
        .route("/patients/missing", get(missing))
        .route("/whoami", get(whoami))
        .route("/slow", get(slow))
        .route("/auth/refresh", post(refresh))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/google/callback", get(google_callback))
        .with_state(api);
    let app = Router::new().nest("/api", routes);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}/api")
}

/// A base URL nothing listens on.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api")
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
