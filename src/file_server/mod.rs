//! Artifact store service: upload, fetch by id, and bearer-gated latest lookups

pub mod storage;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{
        header::{CONTENT_TYPE, HOST},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::FileServerConfig;
use crate::error::{AppError, Result};
use crate::middleware::BearerAuthLayer;
use storage::{media_type, FileStorage, StoredFile};

/// Shared state of the artifact store
pub struct FileServerState {
    pub storage: Arc<FileStorage>,
    pub public_base_url: Option<String>,
    pub zone: FixedOffset,
}

impl FileServerState {
    pub fn from_config(config: &FileServerConfig) -> Result<Self> {
        let zone = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Config(::config::ConfigError::Message(format!(
                "Invalid UTC offset: {} hours",
                config.utc_offset_hours
            )))
        })?;

        Ok(Self {
            storage: Arc::new(FileStorage::new(&config.storage_dir)),
            public_base_url: config
                .public_base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            zone,
        })
    }
}

/// Reply of `POST /upload`
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Reply of `GET /latest`
#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub url: String,
    pub updated_at: String,
}

/// Build the artifact store router
pub fn create_router(state: Arc<FileServerState>, config: &FileServerConfig) -> Router {
    if config.bearer_token.is_none() {
        warn!("No bearer token configured; /latest lookups will be refused");
    }

    let gated = Router::new()
        .route("/latest", get(latest))
        .route("/latest/raw", get(latest_raw))
        .route_layer(BearerAuthLayer::new(config.bearer_token.clone()));

    Router::new()
        .route("/upload", post(upload))
        .route("/i/:fid", get(get_file))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .merge(gated)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically delete artifacts older than `max_age`
pub fn spawn_retention_sweep(storage: Arc<FileStorage>, max_age: Duration, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match storage.cleanup(max_age).await {
                Ok(0) => {}
                Ok(deleted) => info!(deleted, "Swept expired artifacts"),
                Err(e) => warn!(error = %e, "Artifact sweep failed"),
            }
        }
    });
}

async fn upload(State(state): State<Arc<FileServerState>>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Invalid multipart data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Error reading file: {}", e)))?;

        let id = state.storage.save(&data, file_name.as_deref()).await?;
        info!(id = %id, size = data.len(), "Stored artifact");
        return Ok(Json(UploadResponse { url: format!("/i/{}", id) }));
    }

    Err(AppError::InvalidRequest("Missing 'file' field".to_string()))
}

async fn get_file(State(state): State<Arc<FileServerState>>, Path(fid): Path<String>) -> Result<Response> {
    let data = state.storage.read(&fid).await?;
    Ok(([(CONTENT_TYPE, media_type(&fid))], data).into_response())
}

async fn latest(State(state): State<Arc<FileServerState>>, headers: HeaderMap) -> Result<Json<LatestResponse>> {
    let file = latest_file(&state).await?;

    let base = match &state.public_base_url {
        Some(base) => base.clone(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost");
            format!("https://{}", host)
        }
    };

    Ok(Json(LatestResponse {
        url: format!("{}/i/{}", base, file.id),
        updated_at: format_timestamp(file.modified.into(), state.zone),
    }))
}

async fn latest_raw(State(state): State<Arc<FileServerState>>) -> Result<Response> {
    let file = latest_file(&state).await?;
    let data = state.storage.read(&file.id).await?;
    Ok(([(CONTENT_TYPE, media_type(&file.id))], data).into_response())
}

async fn latest_file(state: &FileServerState) -> Result<StoredFile> {
    state
        .storage
        .latest()
        .await?
        .ok_or_else(|| AppError::NotFound("no files".to_string()))
}

/// ISO-8601 with microseconds in the configured fixed offset
pub fn format_timestamp(time: DateTime<Utc>, zone: FixedOffset) -> String {
    time.with_timezone(&zone).to_rfc3339_opts(SecondsFormat::Micros, false)
}
