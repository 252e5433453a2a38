//! In-process HTTP mock of the Bulk Import Service
//!
//! Serves the four `/api/import/*` routes on an ephemeral localhost port with
//! the same chunk semantics as [`super::ScriptedService`].

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Default)]
struct MockState {
    total: u64,
    invalid_rows: Vec<String>,
    fail_finalize: bool,
    uploads: Mutex<Vec<Upload>>,
    chunk_bodies: Mutex<Vec<Value>>,
    finalized: Mutex<Vec<String>>,
    sessions: Mutex<HashMap<String, u64>>,
}

impl MockState {
    fn valid(&self) -> u64 {
        self.total - self.invalid_rows.len() as u64
    }
}

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockServer {
    /// Start a mock whose uploads contain `total` rows, `invalid_rows` of them invalid
    pub async fn start(total: u64, invalid_rows: Vec<String>, fail_finalize: bool) -> Self {
        let state = Arc::new(MockState {
            total,
            invalid_rows,
            fail_finalize,
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/import/init", post(init))
            .route("/api/import/chunk", post(chunk))
            .route("/api/import/status/:session_id", get(status))
            .route("/api/import/finalize", post(finalize))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn chunk_bodies(&self) -> Vec<Value> {
        self.state.chunk_bodies.lock().unwrap().clone()
    }

    pub fn start_indices(&self) -> Vec<u64> {
        self.chunk_bodies()
            .iter()
            .filter_map(|b| b["startIdx"].as_u64())
            .collect()
    }

    pub fn finalized(&self) -> Vec<String> {
        self.state.finalized.lock().unwrap().clone()
    }
}

fn not_found(session_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": format!("Session not found: {}", session_id) })),
    )
        .into_response()
}

async fn init(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    let mut received = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let upload = Upload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            size: 0,
        };
        let bytes = field.bytes().await.unwrap_or_default();
        received = Some(Upload {
            size: bytes.len(),
            ..upload
        });
    }

    let Some(upload) = received.filter(|u| u.field == "file") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "No file uploaded" })),
        )
            .into_response();
    };
    state.uploads.lock().unwrap().push(upload);

    let session_id = {
        let mut sessions = state.sessions.lock().unwrap();
        let id = format!("sess-{}", sessions.len() + 1);
        sessions.insert(id.clone(), 0);
        id
    };

    Json(json!({
        "success": true,
        "sessionId": session_id,
        "totalRecords": state.total,
        "validRecords": state.valid(),
        "invalidRecords": state.invalid_rows.len(),
        "invalidRows": state.invalid_rows,
    }))
    .into_response()
}

async fn chunk(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.chunk_bodies.lock().unwrap().push(body.clone());

    let session_id = body["sessionId"].as_str().unwrap_or_default().to_string();
    let start_idx = body["startIdx"].as_u64().unwrap_or_default();
    let chunk_size = body["chunkSize"].as_u64().unwrap_or_default();
    let total = state.valid();

    let mut sessions = state.sessions.lock().unwrap();
    let Some(processed) = sessions.get_mut(&session_id) else {
        return not_found(&session_id);
    };

    let done = start_idx >= total;
    *processed = (start_idx + chunk_size).min(total);
    let progress = if total == 0 {
        0.0
    } else {
        *processed as f64 * 100.0 / total as f64
    };
    let message = done.then(|| format!("Imported {} family heads", *processed));

    Json(json!({
        "success": true,
        "processed": *processed,
        "total": total,
        "progress": progress,
        "done": done,
        "message": message,
    }))
    .into_response()
}

async fn status(State(state): State<Arc<MockState>>, Path(session_id): Path<String>) -> Response {
    let total = state.valid();
    let sessions = state.sessions.lock().unwrap();
    let Some(processed) = sessions.get(&session_id) else {
        return not_found(&session_id);
    };

    Json(json!({
        "processed": *processed,
        "total": total,
        "done": *processed >= total,
    }))
    .into_response()
}

async fn finalize(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let session_id = body["sessionId"].as_str().unwrap_or_default().to_string();
    state.finalized.lock().unwrap().push(session_id.clone());

    if state.fail_finalize {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "finalize exploded" })),
        )
            .into_response();
    }

    let removed = state.sessions.lock().unwrap().remove(&session_id);
    if removed.is_none() {
        return not_found(&session_id);
    }

    Json(json!({ "success": true })).into_response()
}
