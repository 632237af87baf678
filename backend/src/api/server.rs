//! HTTP shell over the mail-merge engine.
//!
//! # API Endpoints
//!
//! | Method | Path                    | Description                          |
//! |--------|-------------------------|--------------------------------------|
//! | GET    | `/health`               | Health check                         |
//! | POST   | `/api/validate`         | Validate references, fetch rows      |
//! | POST   | `/api/generate/single`  | Generate the output for one row      |
//! | POST   | `/api/generate/merged`  | Generate one merged output           |
//! | POST   | `/api/sheets`           | Upload a CSV as a spreadsheet        |
//! | GET    | `/api/logs`             | SSE stream for real-time logs        |
//!
//! Every `/api` call except the log stream needs `Authorization: Bearer <token>`.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::types::{
    error_response, GenerateMergedRequest, GenerateSingleRequest, SheetUploadResponse, ValidateRequest,
};
use crate::engine::MailMerge;
use crate::error::{ServerError, StoreError};
use crate::models::{GenerationResult, ValidationReport};
use crate::parser::parse_bytes_auto;
use crate::store::memory::Sheet;
use crate::store::{AuthContext, MemoryWorkspace};

type ApiError = (StatusCode, Json<Value>);

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub engine: MailMerge,
    pub workspace: Arc<MemoryWorkspace>,
    /// Snapshot written after every call that changes the workspace
    pub snapshot: Option<PathBuf>,
}

impl AppState {
    pub fn new(workspace: Arc<MemoryWorkspace>, engine: MailMerge) -> Self {
        Self {
            engine,
            workspace,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    async fn persist(&self) {
        let Some(path) = self.snapshot.clone() else {
            return;
        };
        let workspace = self.workspace.clone();
        let target = path.clone();
        let saved = tokio::task::spawn_blocking(move || workspace.save(&target)).await;
        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log_warning(format!("Could not save workspace to {}: {}", path.display(), e)),
            Err(e) => log_warning(format!("Workspace save task failed: {}", e)),
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/validate", post(validate))
        .route("/api/generate/single", post(generate_single))
        .route("/api/generate/merged", post(generate_merged))
        .route("/api/sheets", post(upload_sheet))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Mailmerge server running on http://localhost:{}", port);
    println!("   POST /api/validate         - Validate inputs");
    println!("   POST /api/generate/single  - Generate one row");
    println!("   POST /api/generate/merged  - Generate merged output");
    println!("   POST /api/sheets           - Upload CSV");
    println!("   GET  /api/logs             - SSE log stream");
    println!("   GET  /health               - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn reject(err: ServerError) -> ApiError {
    let status = match &err {
        ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServerError::BadRequest(_) | ServerError::Csv(_) => StatusCode::BAD_REQUEST,
        ServerError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        ServerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        ServerError::Store(StoreError::WrongKind { .. }) => StatusCode::BAD_REQUEST,
        ServerError::Store(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_response(&err.to_string())))
}

/// Credential from the `Authorization: Bearer` header.
fn bearer(headers: &HeaderMap) -> Result<AuthContext, ServerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ServerError::Unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ServerError::Unauthorized("malformed Authorization header".to_string()))?;
    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(AuthContext::bearer(token)),
        _ => Err(ServerError::Unauthorized("expected a Bearer token".to_string())),
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mailmerge",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "validate": "POST /api/validate",
            "generateSingle": "POST /api/generate/single",
            "generateMerged": "POST /api/generate/merged",
            "sheets": "POST /api/sheets",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidationReport>, ApiError> {
    let auth = bearer(&headers).map_err(reject)?;
    let report = state
        .engine
        .validate_and_fetch_data(
            &auth,
            &req.template_url,
            &req.data_url,
            &req.destination_url,
            req.output_mode,
        )
        .await;
    Ok(Json(report))
}

async fn generate_single(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateSingleRequest>,
) -> Result<Json<GenerationResult>, ApiError> {
    let auth = bearer(&headers).map_err(reject)?;
    let result = state
        .engine
        .generate_single_document(&auth, &req.template_id, &req.folder_id, &req.row, &req.headers, &req.config)
        .await;
    state.persist().await;
    Ok(Json(result))
}

async fn generate_merged(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateMergedRequest>,
) -> Result<Json<GenerationResult>, ApiError> {
    let auth = bearer(&headers).map_err(reject)?;
    let result = state
        .engine
        .generate_merged_document(&auth, &req.template_id, &req.folder_id, &req.rows, &req.headers, &req.config)
        .await;
    state.persist().await;
    Ok(Json(result))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload a CSV file (`file` field) as a new spreadsheet, optionally named
/// by a `name` field and placed in a `folderId` folder.
async fn upload_sheet(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<SheetUploadResponse>, ApiError> {
    let auth = bearer(&headers).map_err(reject)?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut sheet_name: Option<String> = None;
    let mut folder_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        let name = field.name().unwrap_or("").to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            reject(ServerError::BadRequest(format!("Read error: {}", e)))
        };
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(read_err)?.to_vec());
            }
            "name" => sheet_name = Some(field.text().await.map_err(read_err)?),
            "folderId" => folder_id = Some(field.text().await.map_err(read_err)?),
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;
    let parsed = parse_bytes_auto(&bytes).map_err(|e| reject(e.into()))?;

    let title = sheet_name
        .filter(|n| !n.is_empty())
        .or_else(|| file_name.map(|f| f.trim_end_matches(".csv").to_string()))
        .unwrap_or_else(|| "Imported sheet".to_string());
    log_info(format!(
        "📄 Imported {} ({} rows, encoding {}, separator '{}')",
        title,
        parsed.row_count(),
        parsed.encoding,
        parsed.delimiter
    ));

    let columns = parsed.headers().to_vec();
    let row_count = parsed.row_count();
    let spreadsheet = state
        .workspace
        .create_spreadsheet_as(
            &auth,
            &title,
            folder_id.as_deref().filter(|f| !f.is_empty()),
            vec![Sheet {
                sheet_id: 0,
                title: "Sheet1".to_string(),
                values: parsed.values,
            }],
        )
        .map_err(|e| reject(e.into()))?;
    state.persist().await;

    Ok(Json(SheetUploadResponse {
        spreadsheet,
        encoding: parsed.encoding,
        delimiter: parsed.delimiter.to_string(),
        row_count,
        columns,
    }))
}
