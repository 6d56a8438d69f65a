//! HTTP analysis service.
//!
//! | Route                  | Handler            |
//! |------------------------|--------------------|
//! | `GET /`                | [`service_info`]   |
//! | `GET /health`          | [`health_check`]   |
//! | `POST /analyze`        | [`analyze`]        |
//! | `GET /download/:file`  | [`download_file`]  |
//! | `GET /files`           | [`list_files`]     |
//! | `DELETE /files/:file`  | [`delete_file`]    |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::pipeline::{analyze_repository, iso_timestamp, AnalysisOptions};

pub mod error;

pub use error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn analysis_options(&self, request: &AnalyzeRequest) -> AnalysisOptions {
        AnalysisOptions {
            save_json: request.save_json,
            include_source: request.include_source,
            output_dir: self.config.output_dir.clone(),
            clone_dir: self.config.clone_dir.clone(),
            source_preview_chars: self.config.source_preview_chars,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/download/:file", get(download_file))
        .route("/files", get(list_files))
        .route("/files/:file", delete(delete_file))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        output_dir = %config.output_dir.display(),
        "analysis service listening"
    );

    axum::serve(listener, router(AppState::new(config))).await?;
    Ok(())
}

async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "online",
        "service": "Code Dependency Analyzer",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "analyze": "/analyze",
            "health": "/health",
            "download": "/download/{filename}",
            "files": "/files"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": iso_timestamp(),
        "output_dir": state.config.output_dir.display().to_string(),
        "output_dir_exists": state.config.output_dir.is_dir()
    }))
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()))?;

    info!(repo_url = %request.repo_url, "analysis requested");
    let options = state.analysis_options(&request);

    let response = tokio::task::spawn_blocking(move || analyze_repository(&request, &options))
        .await
        .map_err(|e| ApiError::internal(format!("Analysis failed: {e}")))??;

    Ok(Json(response))
}

/// Resolve `file` inside the output directory, refusing anything that could
/// name a path outside it.
fn output_file(state: &AppState, file: &str) -> Result<PathBuf, ApiError> {
    if file.is_empty() || file.contains('/') || file.contains('\\') || file.contains("..") {
        return Err(ApiError::bad_request(format!("Invalid file name: {file}")));
    }
    Ok(state.config.output_dir.join(file))
}

async fn download_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let path = output_file(&state, &file)?;
    if !path.is_file() {
        return Err(ApiError::file_not_found(&file));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read {file}: {e}")))?;

    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

#[derive(Debug, Serialize)]
struct FileEntry {
    filename: String,
    size: u64,
    created: String,
    modified: String,
    #[serde(skip)]
    modified_at: SystemTime,
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

async fn list_files(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let dir = &state.config.output_dir;
    let mut files = Vec::new();

    let listing = match tokio::fs::read_dir(dir).await {
        Ok(entries) => Some(entries),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(ApiError::internal(format!("Failed to list {}: {e}", dir.display()))),
    };

    if let Some(mut entries) = listing {
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to list {}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let created = meta.created().unwrap_or(modified);

            files.push(FileEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                created: format_time(created),
                modified: format_time(modified),
                modified_at: modified,
            });
        }
    }

    files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

    Ok(Json(serde_json::json!({
        "output_dir": dir.display().to_string(),
        "total_files": files.len(),
        "files": files
    })))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = output_file(&state, &file)?;
    if !path.is_file() {
        return Err(ApiError::file_not_found(&file));
    }

    tokio::fs::remove_file(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete {file}: {e}")))?;
    info!(%file, "deleted output file");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("File {file} deleted successfully")
    })))
}
