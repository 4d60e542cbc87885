//! Local stub of the marketplace backend for async tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;
use url::Url;

use crate::error::Error;
use crate::storage::{CREDENTIAL_KEY, DurableStorage, MemoryStorage, SNAPSHOT_KEY};

pub(crate) const PASSWORD: &str = "correct-horse";

#[derive(Default)]
pub(crate) struct Backend {
    valid_tokens: Mutex<Vec<String>>,
    issued: AtomicUsize,
    pub(crate) me_hits: AtomicUsize,
    pub(crate) logout_hits: AtomicUsize,
    /// `/auth/me` answers 503 instead of checking the token.
    pub(crate) me_unavailable: AtomicBool,
    /// `/auth/me` waits for `me_release` before answering.
    pub(crate) hold_me: AtomicBool,
    pub(crate) me_reached: Notify,
    pub(crate) me_release: Notify,
}

impl Backend {
    pub(crate) fn accept_token(&self, token: &str) {
        self.valid_tokens.lock().push(token.to_owned());
    }

    pub(crate) fn revoke_all(&self) {
        self.valid_tokens.lock().clear();
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.valid_tokens.lock().iter().any(|t| t == token)
    }

    fn issue(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{n}");
        self.accept_token(&token);
        token
    }
}

pub(crate) fn user_json(email: &str) -> Value {
    let role = if email.starts_with("admin") {
        "admin"
    } else if email.starts_with("seller") {
        "seller"
    } else {
        "customer"
    };
    json!({
        "id": 1,
        "name": "Amina Otieno",
        "email": email,
        "phone": "0712345678",
        "role": role,
        "created_at": "2024-01-05T08:00:00Z"
    })
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(PASSWORD) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "The provided credentials are incorrect." })),
        )
            .into_response();
    }
    Json(json!({ "token": backend.issue(), "user": user_json(email) })).into_response()
}

async fn register(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    let mut user = user_json(body["email"].as_str().unwrap_or_default());
    user["name"] = body["name"].clone();
    user["phone"] = body["phone"].clone();
    user["role"] = body["role"].clone();
    if let Some(package) = body.get("seller_package") {
        user["seller_package"] = package.clone();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "token": backend.issue(), "user": user })),
    )
        .into_response()
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.me_hits.fetch_add(1, Ordering::SeqCst);
    if backend.hold_me.load(Ordering::SeqCst) {
        backend.me_reached.notify_one();
        backend.me_release.notified().await;
    }
    if backend.me_unavailable.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !backend.authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthenticated." })),
        )
            .into_response();
    }
    Json(user_json("amina@example.com")).into_response()
}

async fn logout(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> StatusCode {
    backend.logout_hits.fetch_add(1, Ordering::SeqCst);
    if backend.authorized(&headers) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    Json(json!({
        "authorization": value_of(header::AUTHORIZATION),
        "content_type": value_of(header::CONTENT_TYPE),
        "accept": value_of(header::ACCEPT),
    }))
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Something went wrong" })),
    )
        .into_response()
}

/// Start the stub on an ephemeral port; returns its `/api` base address.
pub(crate) async fn serve(backend: Arc<Backend>) -> Url {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/echo", get(echo).post(echo))
        .route("/broken", get(broken))
        .with_state(backend);
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api").parse().unwrap()
}

/// Memory storage that counts how often the credential entry was removed.
/// Snapshot writes can be made to fail.
#[derive(Default)]
pub(crate) struct CountingStorage {
    inner: MemoryStorage,
    pub(crate) credential_removals: AtomicUsize,
    pub(crate) fail_snapshot_writes: AtomicBool,
}

impl CountingStorage {
    pub(crate) fn removals(&self) -> usize {
        self.credential_removals.load(Ordering::SeqCst)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DurableStorage for CountingStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        if key == SNAPSHOT_KEY && self.fail_snapshot_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("quota exceeded".into()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        if key == CREDENTIAL_KEY {
            self.credential_removals.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.remove(key)
    }
}
