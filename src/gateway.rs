use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::coordinator::TranslationCoordinator;
use crate::error::{TranslateError, TranslationFailure};
use crate::model::{SourceLanguage, StatusSnapshot, TranslationRequest};

pub const DEFAULT_TARGET_LANGUAGE: &str = "繁體中文";

pub struct AppState {
    pub coordinator: Arc<TranslationCoordinator>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/translate", post(handle_translate))
        .route("/cache/status", get(handle_status))
        .route("/cache/clear", post(handle_clear))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Wire shape of `POST /translate`. Missing fields deserialize as empty so
/// they fail validation rather than JSON extraction.
#[derive(Debug, Deserialize)]
pub struct TranslatePayload {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_target")]
    pub target_language: String,
    #[serde(default)]
    pub source_language: SourceLanguage,
    #[serde(default)]
    pub api_key: String,
}

fn default_target() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

impl From<TranslatePayload> for TranslationRequest {
    fn from(p: TranslatePayload) -> Self {
        TranslationRequest {
            text: p.text,
            source_language: p.source_language,
            target_language: p.target_language,
            credential: p.api_key,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub translation: String,
    pub from_cache: bool,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
    pub processing_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IntoResponse for TranslationFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let retry_after_secs = match &self.error {
            TranslateError::ProviderRateLimit { retry_after_secs } => *retry_after_secs,
            _ => None,
        };
        let body = ErrorResponse {
            success: false,
            error: self.error.to_string(),
            kind: self.error.kind().to_string(),
            processing_time_ms: self.processing_time_ms,
            retry_after_secs,
        };
        (status, Json(body)).into_response()
    }
}

pub async fn handle_translate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslatePayload>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(payload)) => TranslationRequest::from(payload),
        Err(rejection) => {
            return TranslationFailure {
                error: TranslateError::Validation(rejection.body_text()),
                processing_time_ms: 0.0,
            }
            .into_response();
        }
    };
    match state.coordinator.translate(&request).await {
        Ok(result) => (
            StatusCode::OK,
            Json(TranslateResponse {
                success: true,
                translation: result.translation,
                from_cache: result.from_cache,
                processing_time_ms: result.processing_time_ms,
            }),
        )
            .into_response(),
        Err(failure) => {
            if failure.error.status_code() >= 500 && !failure.error.is_provider_error() {
                error!(error = %failure.error, "translation failed");
            }
            failure.into_response()
        }
    }
}

pub async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.coordinator.status())
}

pub async fn handle_clear(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.coordinator.clear_cache();
    info!("cache cleared via admin endpoint");
    Json(serde_json::json!({ "success": true }))
}
