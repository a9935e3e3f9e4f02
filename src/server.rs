//! HTTP surface: router, shared state, and error → status mapping.
//!
//! # Routes
//!
//! - `POST /generate_mindmap/` (and without the trailing slash) — multipart
//!   upload, field `file`; answers with the [`Branch`] tree as JSON
//! - `GET /health` — liveness plus whether a model is configured
//!
//! Errors are returned as `{"detail": "<message>"}` with the status chosen by
//! [`status_for`].

use crate::config::ServiceConfig;
use crate::error::MindMapError;
use crate::generate::generate_mindmap;
use crate::output::Branch;
use crate::pipeline::llm::{GeminiClient, GenerativeModel};
use crate::pipeline::upload::UploadedFile;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// Request-body allowance on top of `max_upload_bytes` for multipart
/// boundaries and part headers. The file itself is limited exactly.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// State shared by every request. Immutable once built.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServiceConfig>,
    model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    /// Build state from configuration, creating a [`GeminiClient`] when an
    /// API key is present. Without a key the service still starts, but
    /// generation answers 503.
    pub fn from_config(config: ServiceConfig) -> Result<Self, MindMapError> {
        let model: Option<Arc<dyn GenerativeModel>> = if config.has_credential() {
            Some(Arc::new(GeminiClient::from_config(&config)?))
        } else {
            warn!("No API key configured; mind-map generation will answer 503");
            None
        };
        Ok(Self {
            config: Arc::new(config),
            model,
        })
    }

    /// Build state around an already-constructed model.
    pub fn with_model(config: ServiceConfig, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            config: Arc::new(config),
            model: Some(model),
        }
    }

    /// State with no model at all.
    pub fn without_model(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
            model: None,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Result<Router, MindMapError> {
    let cors = cors_layer(&state.config.allowed_origins)?;
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Ok(Router::new()
        .route("/generate_mindmap/", post(generate_mindmap_handler))
        .route("/generate_mindmap", post(generate_mindmap_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS for the configured front-end origins, with credentials.
///
/// Credentials rule out wildcard methods/headers, so both are mirrored from
/// the preflight request instead.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, MindMapError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| MindMapError::InvalidConfig(format!("Bad CORS origin '{o}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub detail: String,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub model: Option<String>,
    pub model_configured: bool,
}

/// HTTP status for each error kind.
pub fn status_for(err: &MindMapError) -> StatusCode {
    match err {
        MindMapError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        MindMapError::MissingFile
        | MindMapError::MalformedUpload(_)
        | MindMapError::InvalidContentType { .. }
        | MindMapError::NotAPdf { .. }
        | MindMapError::ContentBlocked { .. } => StatusCode::BAD_REQUEST,
        MindMapError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        MindMapError::Validation(_)
        | MindMapError::ModelApi { .. }
        | MindMapError::ModelTimeout { .. }
        | MindMapError::FileNotFound { .. }
        | MindMapError::PermissionDenied { .. }
        | MindMapError::InvalidConfig(_)
        | MindMapError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Detail message shown to the client.
///
/// Upload, credential, blocking, and validation errors carry their own
/// message; everything else is reported as an internal server error.
pub fn detail_for(err: &MindMapError) -> String {
    match err {
        MindMapError::ModelApi { .. }
        | MindMapError::ModelTimeout { .. }
        | MindMapError::FileNotFound { .. }
        | MindMapError::PermissionDenied { .. }
        | MindMapError::InvalidConfig(_)
        | MindMapError::Internal(_) => format!("An internal server error occurred: {err}"),
        _ => err.to_string(),
    }
}

impl IntoResponse for MindMapError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorResponse {
            detail: detail_for(&self),
        };
        (status, Json(body)).into_response()
    }
}

/// `POST /generate_mindmap/`
///
/// The credential is checked before the body is read, so a service without
/// a key never buffers uploads.
async fn generate_mindmap_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Branch>, MindMapError> {
    let Some(model) = state.model.as_ref() else {
        error!("Rejecting upload: no API key configured");
        return Err(MindMapError::MissingCredential);
    };
    let multipart = multipart.map_err(|rejection| {
        warn!("Upload rejected: {}", rejection.body_text());
        MindMapError::MalformedUpload(rejection.body_text())
    })?;

    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    info!(
        "Received file: {}, Content-Type: {:?}",
        upload.display_name(),
        upload.content_type
    );

    let result = generate_mindmap(model.as_ref(), &upload, &state.config).await;
    drop(upload);
    debug!("Released uploaded file");
    result.map(Json)
}

/// Pull the `file` field out of the multipart body. Other fields are skipped.
async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<UploadedFile, MindMapError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if bytes.len() > limit {
            warn!("Upload rejected: {} bytes, limit {}", bytes.len(), limit);
            return Err(MindMapError::UploadTooLarge { limit_bytes: limit });
        }
        return Ok(UploadedFile::new(file_name, content_type, bytes));
    }
    Err(MindMapError::MissingFile)
}

fn multipart_error(err: MultipartError, limit: usize) -> MindMapError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload rejected: larger than {} bytes", limit);
        MindMapError::UploadTooLarge { limit_bytes: limit }
    } else {
        warn!("Upload rejected: {}", err.body_text());
        MindMapError::MalformedUpload(err.body_text())
    }
}

/// `GET /health`
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        service: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        model: state.model.as_ref().map(|m| m.model_name().to_string()),
        model_configured: state.model.is_some(),
    })
}
