use crate::config::{AppState, DecoderHealth, ServerConfig};
use crate::middleware::{enforce_rate_limit, RateLimitGuard};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use cqgate_core::BridgeError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;
mod mcp;
mod validation;

pub use validation::RequestSchemas;

/// Start the API server
///
/// Runs until ctrl-c or SIGTERM, then drains in-flight requests and stops
/// the rate-limit sweeper.
pub async fn serve(addr: &str, config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(config).await?);

    let sweeper = state
        .limiter
        .start_sweeper(state.config.sweep_interval());

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.stop().await;
    tracing::info!("API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Create the API router
fn create_router(state: Arc<AppState>) -> Router {
    let rest_limit = RateLimitGuard::new(state.limiter.clone(), state.config.rest_policy());

    let mcp_route = if state.config.mcp.enabled {
        let mcp_limit = RateLimitGuard::new(state.limiter.clone(), state.config.mcp_policy());
        post(mcp::handle)
            .fallback(mcp::method_not_allowed)
            .layer(from_fn_with_state(mcp_limit, enforce_rate_limit))
    } else {
        any(mcp::disabled)
    };

    Router::new()
        .route("/api/health", get(health_check))
        .route(
            "/api/query",
            post(handlers::query)
                .fallback(method_not_allowed)
                .layer(from_fn_with_state(rest_limit.clone(), enforce_rate_limit)),
        )
        .route(
            "/api/address",
            post(handlers::decode_address)
                .fallback(method_not_allowed)
                .layer(from_fn_with_state(rest_limit.clone(), enforce_rate_limit)),
        )
        .route(
            "/api/validate",
            post(handlers::validate)
                .fallback(method_not_allowed)
                .layer(from_fn_with_state(rest_limit, enforce_rate_limit)),
        )
        .route("/api/mcp", mcp_route)
        .fallback(not_found)
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
///
/// Decoder availability is the result captured at startup, so health checks
/// never spawn the decoder.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "cqgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        decoder: state.decoder_health.clone(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub decoder: DecoderHealth,
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}

/// One schema violation in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            details: None,
        }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            error: error.into(),
            message: None,
            details: Some(details),
        }
    }
}

/// Error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(Vec<FieldError>),

    /// The decoder rejected the caller's input
    #[error("{error}: {message}")]
    Decode {
        error: &'static str,
        message: String,
    },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The body could not be read, e.g. it exceeds the size limit
    #[error("Invalid request body: {message}")]
    Body { status: StatusCode, message: String },
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    /// Split decoder failures into caller errors (non-zero exit) and
    /// server errors (anything else)
    pub fn from_bridge(error: &'static str, err: BridgeError) -> Self {
        if err.is_decode_failure() {
            Self::Decode {
                error,
                message: err.to_string(),
            }
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Validation error", details),
            ),
            Self::Decode { error, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_message(error, message),
            ),
            Self::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_message("Internal server error", message),
                )
            }
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorResponse::new("Method not allowed"),
            ),
            Self::Body { status, message } => (
                status,
                ErrorResponse::with_message("Invalid request body", message),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
