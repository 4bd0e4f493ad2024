//! HTTP detection API.
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /check` | `{text}` | `[Detection]`, text is stored |
//! | `POST /redact` | `{text, policy?}` | `{redacted}` |
//! | `POST /text` | `{text}` | `{message}` |
//! | `GET /text` | | `{text}` |
//! | `GET /health` | | `{status}` |
//! | `GET /metrics` | | Prometheus text format |
//!
//! Detection runs on the blocking pool. A recognizer failure in strict mode
//! is reported as `502 Bad Gateway`. Otherwise pattern detections are
//! returned with an `x-pii-recognizer: failed` header, and `/redact` also
//! sets `warning` in its body.

use crate::config::ServerSettings;
use crate::models::{Detection, PiiCategory};
use crate::observability::install_prometheus;
use crate::pipeline::PiiPipeline;
use crate::{Error, Result};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request body carrying a text.
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    /// Input text.
    pub text: String,
}

/// Request body for `POST /redact`.
#[derive(Debug, Deserialize)]
pub struct RedactRequest {
    /// Input text.
    pub text: String,
    /// Placeholder overrides keyed by category name.
    #[serde(default)]
    pub policy: BTreeMap<String, String>,
}

/// Response header set when the recognizer failed and results are
/// pattern-only.
pub const RECOGNIZER_HEADER: &str = "x-pii-recognizer";

/// Response body for `POST /redact`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedactResponse {
    /// Text with placeholders substituted.
    pub redacted: String,
    /// Set when only pattern detections were applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response body for `GET /text`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredText {
    /// Last submitted text, empty if none.
    pub text: String,
}

/// Last submitted text, per server instance.
#[derive(Debug, Clone, Default)]
pub struct TextStore {
    inner: Arc<RwLock<String>>,
}

impl TextStore {
    /// Replaces the stored text.
    pub async fn set(&self, text: String) {
        *self.inner.write().await = text;
    }

    /// Returns a copy of the stored text.
    pub async fn get(&self) -> String {
        self.inner.read().await.clone()
    }
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<PiiPipeline>,
    store: TextStore,
    metrics: PrometheusHandle,
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The recognizer failed in strict mode.
    Recognition(String),
    /// The request was malformed.
    BadRequest(String),
    /// Anything else.
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Recognition { .. } => Self::Recognition(e.to_string()),
            Error::InvalidInput(_) | Error::InvalidSpan { .. } => Self::BadRequest(e.to_string()),
            Error::OperationFailed { .. } | Error::FeatureNotEnabled(_) => {
                Self::Internal(e.to_string())
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Recognition(message) => (StatusCode::BAD_GATEWAY, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            },
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// HTTP server for the detection API.
pub struct Server {
    pipeline: Arc<PiiPipeline>,
    settings: ServerSettings,
    store: TextStore,
}

impl Server {
    /// Creates a server around `pipeline`.
    #[must_use]
    pub fn new(pipeline: PiiPipeline, settings: ServerSettings) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            settings,
            store: TextStore::default(),
        }
    }

    /// Sets the listen port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    /// Returns the text store.
    #[must_use]
    pub const fn store(&self) -> &TextStore {
        &self.store
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Returns an error if a CORS origin is invalid or the metrics recorder
    /// cannot be installed.
    pub fn router(&self) -> Result<Router> {
        let state = AppState {
            pipeline: Arc::clone(&self.pipeline),
            store: self.store.clone(),
            metrics: install_prometheus()?,
        };

        Ok(Router::new()
            .route("/check", post(check))
            .route("/redact", post(redact))
            .route("/text", post(store_text).get(get_text))
            .route("/health", get(health))
            .route("/metrics", get(render_metrics))
            .layer(cors_layer(&self.settings.cors_origins)?)
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Runs the server until it fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created or the listener
    /// cannot be bound.
    pub fn run(self) -> Result<()> {
        let app = self.router()?;

        let rt = tokio::runtime::Runtime::new().map_err(|e| Error::OperationFailed {
            operation: "create_runtime".to_string(),
            cause: e.to_string(),
        })?;

        let host = self.settings.host.clone();
        let port = self.settings.port;
        tracing::info!(host = %host, port, "Starting detection API server");

        rt.block_on(async {
            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "bind".to_string(),
                    cause: format!("{host}:{port}: {e}"),
                })?;

            axum::serve(listener, app)
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "serve".to_string(),
                    cause: e.to_string(),
                })
        })
    }
}

/// Any origin when `origins` is empty, otherwise exactly those origins.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let values = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| Error::InvalidInput(format!("invalid CORS origin '{origin}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(values)))
}

/// Runs `f` against the pipeline on the blocking pool.
async fn with_pipeline<T, F>(pipeline: &Arc<PiiPipeline>, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&PiiPipeline) -> Result<T> + Send + 'static,
{
    let pipeline = Arc::clone(pipeline);
    tokio::task::spawn_blocking(move || f(&pipeline))
        .await
        .map_err(|e| ApiError::Internal(format!("detection task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Marks a degraded response.
fn recognizer_headers(error: Option<&Error>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(e) = error {
        tracing::warn!(error = %e, "Responding with pattern-only detections");
        headers.insert(RECOGNIZER_HEADER, HeaderValue::from_static("failed"));
    }
    headers
}

async fn check(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> std::result::Result<(HeaderMap, Json<Vec<Detection>>), ApiError> {
    let text = request.text.clone();
    let result = with_pipeline(&state.pipeline, move |p| p.process(&text)).await?;
    state.store.set(request.text).await;

    tracing::debug!(detections = result.detections.len(), "Checked text");
    let headers = recognizer_headers(result.recognizer_error.as_ref());
    Ok((headers, Json(result.detections)))
}

async fn redact(
    State(state): State<AppState>,
    Json(request): Json<RedactRequest>,
) -> std::result::Result<(HeaderMap, Json<RedactResponse>), ApiError> {
    let overrides: Vec<(PiiCategory, String)> = request
        .policy
        .into_iter()
        .map(|(category, placeholder)| {
            if category.trim().is_empty() {
                Err(ApiError::BadRequest(
                    "policy override has an empty category".to_string(),
                ))
            } else {
                Ok((PiiCategory::custom(&category), placeholder))
            }
        })
        .collect::<std::result::Result<_, _>>()?;

    let text = request.text;
    let result = with_pipeline(&state.pipeline, move |p| {
        let policy = p.config().policy.with_overrides(overrides);
        p.process_with(&text, &policy)
    })
    .await?;

    let headers = recognizer_headers(result.recognizer_error.as_ref());
    Ok((
        headers,
        Json(RedactResponse {
            redacted: result.redacted,
            warning: result.recognizer_error.map(|e| e.to_string()),
        }),
    ))
}

async fn store_text(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<serde_json::Value> {
    state.store.set(request.text).await;
    Json(serde_json::json!({ "message": "Text stored" }))
}

async fn get_text(State(state): State<AppState>) -> Json<StoredText> {
    Json(StoredText {
        text: state.store.get().await,
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_origins() {
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&["http://localhost:3000".to_string()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError::from(Error::Recognition {
            cause: "offline".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = ApiError::from(Error::InvalidInput("bad".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_recognizer_headers() {
        assert!(recognizer_headers(None).is_empty());

        let error = Error::Recognition {
            cause: "offline".to_string(),
        };
        let headers = recognizer_headers(Some(&error));
        assert_eq!(
            headers.get(RECOGNIZER_HEADER).and_then(|v| v.to_str().ok()),
            Some("failed")
        );
    }

    #[tokio::test]
    async fn test_text_store() {
        let store = TextStore::default();
        assert!(store.get().await.is_empty());
        store.set("hello".to_string()).await;
        assert_eq!(store.get().await, "hello");
    }
}
