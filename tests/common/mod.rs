//! In-process stand-in for the CaseDesk backend, bound to an ephemeral port.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const EMAIL: &str = "alice@example.com";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok-alice";
pub const SUPER_KEY: &str = "open-sesame";

#[derive(Default)]
pub struct StubState {
    pub logout_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub unauthorized_responses: AtomicUsize,
    pub upload_content_types: Mutex<Vec<String>>,
    pub chat_requests: Mutex<Vec<Value>>,
}

pub struct Stub {
    pub base_url: String,
    pub state: Arc<StubState>,
}

impl Stub {
    pub fn logout_calls(&self) -> usize {
        self.state.logout_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }
}

pub async fn spawn() -> Stub {
    let state = Arc::new(StubState::default());
    let app = Router::new()
        .route("/api/health", get(|| async { Json(json!({"status": "healthy"})) }))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/verify-token", get(verify_token))
        .route("/api/cases", get(list_cases))
        .route("/api/cases/{id}", get(get_case))
        .route("/api/documents/upload", post(upload))
        .route("/api/documents/{case_id}/documents", get(list_documents))
        .route("/api/chat/history/{case_id}", get(history))
        .route("/api/chat/chat", post(chat))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub backend failed");
    });

    Stub {
        base_url: format!("http://{}", addr),
        state,
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {}", TOKEN)[..])
}

fn unauthorized(state: &StubState) -> Response {
    state.unauthorized_responses.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

fn alice() -> Value {
    json!({"id": "user-1", "email": EMAIL, "full_name": "Alice Counsel"})
}

fn case_json(id: &str) -> Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "title": format!("Matter {}", id),
        "status": "active",
        "created_at": "2024-05-01T09:00:00",
        "updated_at": "2024-05-02T09:00:00Z"
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        Json(json!({"access_token": TOKEN, "token_type": "bearer", "user": alice()})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid email or password"})),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["super_key"] != SUPER_KEY {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Invalid super key"})),
        )
            .into_response();
    }
    Json(json!({
        "message": "User registered",
        "user": {"id": "user-2", "email": body["email"], "full_name": body["full_name"]}
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<StubState>>) -> Json<Value> {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"message": "Logged out"}))
}

async fn verify_token(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    Json(json!({"valid": true, "user": alice()})).into_response()
}

async fn list_cases(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    Json(json!({"cases": [case_json("case-1"), case_json("case-2")]})).into_response()
}

async fn get_case(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if id == "expired" || !authorized(&headers) {
        return unauthorized(&state);
    }
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Case not found"}))).into_response();
    }
    Json(case_json(&id)).into_response()
}

async fn list_documents(Path(case_id): Path<String>) -> Json<Value> {
    Json(json!({"documents": [{
        "id": "doc-0",
        "case_id": case_id,
        "filename": "complaint.pdf",
        "file_size": 2048,
        "file_type": "pdf",
        "status": "completed"
    }]}))
}

async fn history(Path(_case_id): Path<String>) -> Json<Value> {
    Json(json!({"messages": [
        {"role": "user", "content": "What is this case about?", "created_at": "2024-05-01T09:00:00"}
    ]}))
}

async fn upload(State(state): State<Arc<StubState>>, headers: HeaderMap, body: Bytes) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized(&state);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.upload_content_types.lock().push(content_type);

    let text = String::from_utf8_lossy(&body);
    let mut documents = Vec::new();
    let mut failed = Vec::new();
    for (i, piece) in text.split("filename=\"").skip(1).enumerate() {
        let name = piece.split('"').next().unwrap_or_default();
        if name == "corrupt.txt" {
            failed.push(json!({"filename": name, "error": "File could not be read"}));
        } else {
            // stored names are sanitised; exhibits lose their original name
            let stored = name.to_lowercase().replace(' ', "_").replace(['(', ')'], "");
            let mut document = json!({
                "id": format!("doc-{}", i + 1),
                "case_id": "case-1",
                "filename": stored,
                "file_size": 4,
                "file_type": name.rsplit('.').next().unwrap_or_default(),
                "status": "pending"
            });
            if stored != name && !name.starts_with("Exhibit") {
                document["original_filename"] = json!(name);
            }
            documents.push(document);
        }
    }

    Json(json!({"documents": documents, "failed": failed})).into_response()
}

/// Fragments deliberately split events mid-line and include a malformed
/// frame and bytes after `done`.
const CHAT_FRAGMENTS: &[&str] = &[
    "data: {\"type\":\"status\",\"message\":\"Searching documents\"}\n\n",
    "data: {\"type\":\"content\",\"content\":\"The contract \"}\n\ndata: {\"type\":\"cont",
    "ent\",\"content\":\"is void.\"}\n\n",
    "data: {not json}\n\n",
    "data: {\"type\":\"complete\",\"response\":\"The contract is void.\",\"citations\":[{\"chunkId\":\"k1\",\"documentId\":\"doc-0\",\"documentName\":\"complaint.pdf\",\"pageNumber\":2,\"relevanceScore\":0.91}]}\n\n",
    "data: {\"type\":\"done\"}\n\n",
    "data: {\"type\":\"content\",\"content\":\" Ignored.\"}\n\n",
];

async fn chat(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized(&state);
    }
    state.chat_requests.lock().push(body);

    let streaming = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/event-stream"))
        .unwrap_or(false);

    if !streaming {
        return Json(json!({
            "response": "The contract is void.",
            "citations": [{"chunk_id": "k1", "document_name": "complaint.pdf", "relevance_score": 0.91}]
        }))
        .into_response();
    }

    let fragments = CHAT_FRAGMENTS
        .iter()
        .copied()
        .map(|f: &'static str| Ok::<_, std::convert::Infallible>(Bytes::from_static(f.as_bytes())));
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(futures::stream::iter(fragments)),
    )
        .into_response()
}
