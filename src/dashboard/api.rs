use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

use crate::agent::{self, AgentProcess, RunParams};
use crate::config::{AppConfig, LimitsSection};
use crate::errors::{AgentError, FileError, PathError};
use crate::files::{self, ContentLimits};
use crate::phase;
use crate::provider::Provider;

/// Extra room allowed on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Extra room on top of the content limit for the JSON envelope.
const JSON_OVERHEAD: usize = 64 * 1024;

/// Buffered output chunks between the agent relay and the HTTP body.
const RUN_CHANNEL_CAPACITY: usize = 64;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    /// Project root every request path is resolved against
    pub root: PathBuf,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    fn content_limits(&self) -> ContentLimits {
        ContentLimits::from(&self.config.limits)
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DirQuery {
    pub dir: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub dir: Option<String>,
    pub filename: Option<String>,
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct WriteContentRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct RunAgentRequest {
    #[serde(alias = "promptPath")]
    pub prompt_path: Option<String>,
    #[serde(default, alias = "yoloMode")]
    pub yolo_mode: bool,
    pub provider: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CheckAgentRequest {
    pub provider: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    Unprocessable(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Empty | PathError::TooLong { .. } | PathError::NoEntry { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            _ => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Path(e) => e.into(),
            FileError::InvalidDirectory(_)
            | FileError::InvalidFilename(_)
            | FileError::IsDirectory(_) => ApiError::BadRequest(err.to_string()),
            FileError::DeleteForbidden(_) => ApiError::Forbidden(err.to_string()),
            FileError::NotFound(_) => ApiError::NotFound(err.to_string()),
            FileError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            FileError::NotPdf => ApiError::UnsupportedMediaType(err.to_string()),
            FileError::NotText(_) => ApiError::Unprocessable(err.to_string()),
            FileError::Io { .. } => {
                tracing::error!(error = %err, "file operation failed");
                ApiError::Internal("File operation failed".into())
            }
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::File(e) => e.into(),
            AgentError::InvalidProvider(_) => ApiError::BadRequest(err.to_string()),
            AgentError::NotInstalled { .. } => ApiError::ServiceUnavailable(err.to_string()),
            AgentError::SpawnFailed { .. } | AgentError::WaitFailed(_) => {
                tracing::error!(error = %err, "agent process failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(message),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::UnsupportedMediaType(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required parameter '{name}'")))
}

fn parse_provider(name: Option<String>) -> Result<Option<Provider>, ApiError> {
    name.map(|n| n.parse::<Provider>())
        .transpose()
        .map_err(ApiError::from)
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router(limits: &LimitsSection) -> Router<SharedState> {
    let upload_limit = body_limit(limits.max_upload_bytes, MULTIPART_OVERHEAD);
    // JSON escaping can double the encoded size of a text body.
    let content_limit = body_limit(limits.max_content_bytes.saturating_mul(2), JSON_OVERHEAD);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/phases", get(list_phases))
        .route("/api/status", get(get_status))
        .route("/api/outputs", get(list_outputs))
        .route("/api/files", get(list_files).delete(delete_file))
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/content",
            get(read_content)
                .post(write_content)
                .layer(DefaultBodyLimit::max(content_limit)),
        )
        .route("/api/readme", get(read_readme))
        .route("/api/agent/run", post(run_agent))
        .route("/api/agent/check", post(check_agent))
}

fn body_limit(max_bytes: u64, overhead: usize) -> usize {
    usize::try_from(max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(overhead)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_phases() -> impl IntoResponse {
    Json(phase::PHASES)
}

async fn get_status(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let root = state.root.clone();
    let status = tokio::task::spawn_blocking(move || phase::dashboard_status(&root))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(status))
}

async fn list_outputs(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let root = state.root.clone();
    let outputs = tokio::task::spawn_blocking(move || phase::output_statuses(&root))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(outputs))
}

async fn list_files(
    State(state): State<SharedState>,
    Query(query): Query<DirQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dir = required(query.dir, "dir")?;
    let listing = files::list_dir(&state.root, &dir).await?;
    Ok(Json(listing))
}

async fn delete_file(
    State(state): State<SharedState>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dir = required(query.dir, "dir")?;
    let filename = required(query.filename, "filename")?;
    files::delete_file(&state.root, &dir, &filename).await?;
    Ok(Json(json!({"success": true})))
}

async fn upload_file(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(&state, e))?;
        let stored = files::store_upload(
            &state.root,
            &original_name,
            &data,
            state.config.limits.max_upload_bytes,
        )
        .await?;
        return Ok(Json(stored));
    }
    Err(ApiError::BadRequest("No file uploaded".into()))
}

fn multipart_error(state: &AppState, err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileError::TooLarge {
            size: state.config.limits.max_upload_bytes.saturating_add(1),
            max: state.config.limits.max_upload_bytes,
        }
        .into()
    } else {
        ApiError::BadRequest(format!("Multipart read error: {}", err.body_text()))
    }
}

async fn read_content(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let path = query.path.unwrap_or_default();
    let content = files::read_content(&state.root, &path, state.content_limits()).await?;
    Ok(Json(content))
}

async fn read_readme(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let readme = files::read_readme(&state.root, state.content_limits()).await?;
    Ok(Json(readme))
}

async fn write_content(
    State(state): State<SharedState>,
    body: Result<Json<WriteContentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let path = req.path.unwrap_or_default();
    let content = req
        .content
        .ok_or_else(|| ApiError::BadRequest("Missing required field 'content'".into()))?;
    files::write_content(&state.root, &path, &content, state.content_limits()).await?;
    Ok(Json(json!({"success": true})))
}

async fn run_agent(
    State(state): State<SharedState>,
    body: Result<Json<RunAgentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let params = RunParams {
        prompt_path: req.prompt_path.unwrap_or_default(),
        provider: parse_provider(req.provider)?,
        yolo: req.yolo_mode,
    };
    let request = agent::prepare_run(&state.root, &state.config, params).await?;
    let process = AgentProcess::spawn(request)?;
    let run_id = process.id();

    let (tx, rx) = mpsc::channel::<String>(RUN_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        if let Err(e) = process.stream(tx).await {
            tracing::error!(%run_id, error = %e, "agent run failed");
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

async fn check_agent(
    State(state): State<SharedState>,
    body: Result<Option<Json<CheckAgentRequest>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body?.map(|Json(req)| req).unwrap_or_default();
    let provider = match parse_provider(req.provider)? {
        Some(provider) => provider,
        None => state
            .config
            .default_provider()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };
    let check = agent::check_provider(
        provider,
        state.config.providers.get(provider),
        state.config.agent.check_timeout(),
        &state.root,
    )
    .await;
    Ok(Json(check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";
    const BOUNDARY: &str = "research-writer-test-boundary";

    fn test_state(dir: &TempDir, config: AppConfig) -> SharedState {
        Arc::new(AppState {
            root: dir.path().to_path_buf(),
            config,
        })
    }

    fn test_app(dir: &TempDir) -> Router {
        test_app_with(dir, AppConfig::default())
    }

    fn test_app_with(dir: &TempDir, config: AppConfig) -> Router {
        let limits = config.limits;
        api_router(&limits).with_state(test_state(dir, config))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, value: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    fn multipart_upload(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response.into_body()).await, "ok");
    }

    #[tokio::test]
    async fn test_list_phases() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir).oneshot(get("/api/phases")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let phases: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(phases.len(), phase::PHASES.len());
        assert_eq!(phases[0]["id"], "corpus");
    }

    #[tokio::test]
    async fn test_status_reflects_corpus_and_outputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("corpus")).unwrap();
        std::fs::write(dir.path().join("corpus/a.pdf"), PDF).unwrap();
        std::fs::create_dir_all(dir.path().join("settings")).unwrap();
        std::fs::write(
            dir.path().join("settings/screening-criteria-template.md"),
            "criteria",
        )
        .unwrap();

        let response = test_app(&dir).oneshot(get("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let status: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(status["corpus_count"], 1);
        assert_eq!(status["completed_phases"], json!(["corpus", "0"]));
        assert_eq!(status["current_phase"], "1");
        assert_eq!(status["all_complete"], false);
    }

    #[tokio::test]
    async fn test_list_outputs_flags_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("outputs")).unwrap();
        std::fs::write(
            dir.path().join("outputs/literature-screening-matrix.md"),
            "| paper |",
        )
        .unwrap();
        let response = test_app(&dir).oneshot(get("/api/outputs")).await.unwrap();
        let outputs: Vec<serde_json::Value> = body_json(response.into_body()).await;
        let screening = outputs
            .iter()
            .find(|o| o["path"] == "outputs/literature-screening-matrix.md")
            .unwrap();
        assert_eq!(screening["exists"], true);
        assert!(outputs.iter().filter(|o| o["exists"] == true).count() == 1);
    }

    #[tokio::test]
    async fn test_list_files_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(get("/api/files?dir=outputs"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(listing["total"], 0);
        assert!(dir.path().join("outputs").is_dir());
    }

    #[tokio::test]
    async fn test_list_files_rejects_unknown_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let response = app.clone().oneshot(get("/api/files?dir=..")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = app.oneshot(get("/api/files")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert!(err["error"].as_str().unwrap().contains("dir"));
    }

    #[tokio::test]
    async fn test_upload_then_list_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let response = app
            .clone()
            .oneshot(multipart_upload("file", "Smith 2020.pdf", PDF))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(stored["success"], true);
        assert_eq!(stored["filename"], "Smith_2020.pdf");
        assert_eq!(stored["size"], PDF.len());

        let response = app
            .clone()
            .oneshot(get("/api/files?dir=corpus"))
            .await
            .unwrap();
        let listing: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(listing["total"], 1);
        assert_eq!(listing["files"][0]["name"], "Smith_2020.pdf");

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/files?dir=corpus&filename=Smith_2020.pdf")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!dir.path().join("corpus/Smith_2020.pdf").exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(multipart_upload("file", "notes.pdf", b"plain text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(multipart_upload("attachment", "a.pdf", PDF))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.limits.max_upload_bytes = 8;
        let response = test_app_with(&dir, config)
            .oneshot(multipart_upload("file", "a.pdf", PDF))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_delete_outside_corpus_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("outputs")).unwrap();
        std::fs::write(dir.path().join("outputs/a.md"), "x").unwrap();
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/files?dir=outputs&filename=a.md")
            .body(Body::empty())
            .unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(dir.path().join("outputs/a.md").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/files?dir=corpus&filename=gone.pdf")
            .body(Body::empty())
            .unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_content_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/content",
                json!({"path": "settings/screening-criteria-template.md", "content": "# Criteria"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get(
                "/api/content?path=settings/screening-criteria-template.md",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(content["content"], "# Criteria");
        assert_eq!(content["path"], "settings/screening-criteria-template.md");
    }

    #[tokio::test]
    async fn test_content_write_above_default_body_limit() {
        let dir = tempfile::tempdir().unwrap();
        let content = "x".repeat(3 * 1024 * 1024);
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/content",
                json!({"path": "settings/big.md", "content": content}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let written = std::fs::read_to_string(dir.path().join("settings/big.md")).unwrap();
        assert_eq!(written.len(), 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_content_write_over_limit_is_json_413() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.limits.max_content_bytes = 1024;
        let app = test_app_with(&dir, config);

        // Over the content cap but inside the body limit.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/content",
                json!({"path": "settings/a.md", "content": "x".repeat(2048)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert!(err["error"].as_str().unwrap().contains("too large"));

        // Over the body limit itself.
        let response = app
            .oneshot(post_json(
                "/api/content",
                json!({"path": "settings/a.md", "content": "x".repeat(256 * 1024)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert!(err["error"].is_string());
        assert!(!dir.path().join("settings/a.md").exists());
    }

    #[tokio::test]
    async fn test_content_write_to_bare_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/content",
                json!({"path": "settings", "content": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("settings").is_file());
    }

    #[tokio::test]
    async fn test_malformed_json_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        for uri in ["/api/agent/run", "/api/agent/check", "/api/content"] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                response.headers()["content-type"],
                "application/json",
                "{uri}"
            );
            let err: serde_json::Value = body_json(response.into_body()).await;
            assert!(err["error"].as_str().unwrap().contains("JSON"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_run_agent_without_json_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/agent/run")
            .body(Body::from("{}"))
            .unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let err: serde_json::Value = body_json(response.into_body()).await;
        assert!(err["error"].is_string());
    }

    #[tokio::test]
    async fn test_readme() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let response = app.clone().oneshot(get("/api/readme")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        std::fs::write(dir.path().join("README.md"), "# Docs").unwrap();
        let response = app.oneshot(get("/api/readme")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let readme: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(readme["content"], "# Docs");
    }

    #[tokio::test]
    async fn test_content_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);

        let cases = [
            ("/api/content", StatusCode::BAD_REQUEST),
            ("/api/content?path=corpus/a.pdf", StatusCode::FORBIDDEN),
            ("/api/content?path=outputs/../../etc/passwd", StatusCode::FORBIDDEN),
            ("/api/content?path=/etc/passwd", StatusCode::FORBIDDEN),
            ("/api/content?path=outputs/missing.md", StatusCode::NOT_FOUND),
        ];
        for (uri, expected) in cases {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_content_write_outside_settings_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/content",
                json!({"path": "outputs/draft.md", "content": "x"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!dir.path().join("outputs/draft.md").exists());
    }

    #[tokio::test]
    async fn test_run_agent_invalid_provider() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/agent/run",
                json!({"promptPath": "quick-start/phase1.md", "provider": "gpt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_run_agent_missing_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/agent/run",
                json!({"prompt_path": "quick-start/phase9.md"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_agent_prompt_outside_prompt_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json(
                "/api/agent/run",
                json!({"prompt_path": "outputs/x.md"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_run_agent_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/p.md"), "go").unwrap();
        let mut config = AppConfig::default();
        config.providers.gemini.command = Some("/no/such/gemini".to_string());
        let response = test_app_with(&dir, config)
            .oneshot(post_json("/api/agent/run", json!({"prompt_path": "prompts/p.md"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_agent_streams_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("quick-start")).unwrap();
        std::fs::write(dir.path().join("quick-start/phase1.md"), "screen papers").unwrap();
        let mut config = AppConfig::default();
        config.providers.gemini.command = Some("sh".to_string());
        config.providers.gemini.args = vec!["-c".to_string(), "cat; echo done 1>&2".to_string()];

        let response = test_app_with(&dir, config)
            .oneshot(post_json(
                "/api/agent/run",
                json!({"promptPath": "quick-start/phase1.md", "yoloMode": false}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()["cache-control"], "no-cache");
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        let text = body_text(response.into_body()).await;
        assert!(text.starts_with("[System] Starting Gemini Agent...\n"));
        assert!(text.contains("screen papers"));
        assert!(text.contains("[Error] done"));
        assert!(text.ends_with("[System] Process finished with exit code 0\n"));
    }

    #[tokio::test]
    async fn test_check_agent_invalid_provider() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(&dir)
            .oneshot(post_json("/api/agent/check", json!({"provider": "gpt"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_agent_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.providers.claude.command = Some("/no/such/claude".to_string());
        let response = test_app_with(&dir, config)
            .oneshot(post_json("/api/agent/check", json!({"provider": "claude"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let check: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(check["provider"], "claude");
        assert_eq!(check["installed"], false);
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(status(PathError::Empty.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(PathError::Traversal.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status(FileError::TooLarge { size: 2, max: 1 }.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status(FileError::NotText("x".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(
                AgentError::NotInstalled {
                    provider: "gemini".into(),
                    command: "gemini".into()
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
