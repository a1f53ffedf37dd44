// HTTP server with the detection and notification API

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use olivefly_core::{DetectionSummary, MinConfidence, ServiceConfig, DEFAULT_MIN_CONFIDENCE};
use olivefly_eye::{decode_image, DetectionPipeline, Detector, ModelHandle, VisionError};
use olivefly_notify::{Notifier, NotifyError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};

use crate::security::{authorize, AuditLogger};

/// Multipart field carrying the uploaded image
pub const FILE_FIELD: &str = "file";

// API state
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<ServiceConfig>,
    pub models: Arc<ModelHandle>,
    pub pipeline: Arc<DetectionPipeline>,
    pub notifier: Arc<dyn Notifier>,
}

// Response types
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    pub min_conf: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub to: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub status: String,
    pub to: String,
}

/// Every way a request can fail, mapped onto a status and a client message.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    InvalidImage,
    PayloadTooLarge,
    ModelUnavailable,
    Inference(String),
    Notify(NotifyError),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::InvalidImage => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Notify(NotifyError::InvalidRecipient(_)) => StatusCode::BAD_REQUEST,
            ApiError::ModelUnavailable
            | ApiError::Inference(_)
            | ApiError::Notify(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidImage => "INVALID_IMAGE",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::ModelUnavailable => "MODEL_UNAVAILABLE",
            ApiError::Inference(_) => "INFERENCE_ERROR",
            ApiError::Notify(NotifyError::MissingCredentials) => "NOTIFY_NOT_CONFIGURED",
            ApiError::Notify(NotifyError::InvalidRecipient(_)) => "INVALID_RECIPIENT",
            ApiError::Notify(_) => "NOTIFY_SEND_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized => "Invalid API key".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::InvalidImage => "Invalid image".to_string(),
            ApiError::PayloadTooLarge => "Upload too large".to_string(),
            ApiError::ModelUnavailable => "Model not available".to_string(),
            ApiError::Inference(_) => "Inference failed".to_string(),
            ApiError::Notify(NotifyError::MissingCredentials) => {
                "WhatsApp credentials missing".to_string()
            }
            ApiError::Notify(NotifyError::InvalidRecipient(_)) => {
                "Recipient must contain digits".to_string()
            }
            ApiError::Notify(NotifyError::Rejected { body, .. }) => {
                format!("WhatsApp send failed: {}", body)
            }
            ApiError::Notify(NotifyError::Http(e)) => format!("WhatsApp send failed: {}", e),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Inference(msg) => error!("Inference failed: {}", msg),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
            ApiError::Notify(e) => error!("Notification failed: {}", e),
            _ => debug!("Request rejected: {:?}", self),
        }

        let status = self.status();
        let body = Json(ErrorResponse {
            detail: self.detail(),
            code: self.code().to_string(),
        });
        (status, body).into_response()
    }
}

impl From<VisionError> for ApiError {
    fn from(e: VisionError) -> Self {
        match e {
            VisionError::InvalidImage(_) | VisionError::Image(_) => ApiError::InvalidImage,
            VisionError::ModelUnavailable(_) => ApiError::ModelUnavailable,
            other => ApiError::Inference(other.to_string()),
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(e: NotifyError) -> Self {
        ApiError::Notify(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
        }
    }
}

/// Create HTTP router with all API routes
pub fn create_router(state: ApiState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/detect", post(detect_handler))
        .route("/api/notify/whatsapp", post(notify_whatsapp_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Load the model off the async runtime. `None` when it cannot be loaded.
async fn load_detector(models: Arc<ModelHandle>) -> Option<Arc<dyn Detector>> {
    tokio::task::spawn_blocking(move || models.get())
        .await
        .ok()
        .flatten()
}

// Health check. Attempts the lazy model load.
async fn health_handler(State(state): State<ApiState>) -> Json<HealthResponse> {
    let model_loaded = load_detector(Arc::clone(&state.models)).await.is_some();
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded,
        model_path: state.config.model_path.display().to_string(),
    })
}

async fn detect_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    query: Result<Query<DetectQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionSummary>, ApiError> {
    authorize(&state.config, &headers, "/api/detect")?;

    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let min_conf = MinConfidence::clamped(query.min_conf.unwrap_or(DEFAULT_MIN_CONFIDENCE));

    let detector = load_detector(Arc::clone(&state.models))
        .await
        .ok_or(ApiError::ModelUnavailable)?;

    let mut multipart =
        multipart.map_err(|_| ApiError::BadRequest(format!("Missing file field '{}'", FILE_FIELD)))?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes =
        upload.ok_or_else(|| ApiError::BadRequest(format!("Missing file field '{}'", FILE_FIELD)))?;
    debug!("Received upload of {} bytes, min_conf {}", bytes.len(), min_conf.value());

    let pipeline = Arc::clone(&state.pipeline);
    let summary = tokio::task::spawn_blocking(move || {
        let image = decode_image(&bytes)?;
        pipeline.run(detector.as_ref(), &image, min_conf)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Detection task failed: {}", e)))??;

    info!(
        "Detected {} objects in {} ms (min_conf {})",
        summary.count, summary.inference_ms, summary.min_conf
    );
    Ok(Json(summary))
}

async fn notify_whatsapp_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<NotifyResponse>, ApiError> {
    authorize(&state.config, &headers, "/api/notify/whatsapp")?;

    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    state.notifier.send(&request.to, &request.text).await?;
    AuditLogger::log_notification(state.notifier.name(), "/api/notify/whatsapp");

    Ok(Json(NotifyResponse {
        status: "sent".to_string(),
        to: request.to,
    }))
}
