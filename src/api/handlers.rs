//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse, LoginRequest, LoginResponse, SuccessResponse};
use super::AppState;
use crate::error::{RelayError, RelayErrorKind};
use crate::relay::relay_stream;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        // Streaming chat relay
        .route("/api/chat", post(send_chat).fallback(method_not_allowed))
        // File upload relay
        .route(
            "/api/files",
            post(upload_files)
                .layer(upload_limit)
                .fallback(method_not_allowed),
        )
        // Login
        .route("/api/login", post(login).fallback(method_not_allowed))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    // Misconfiguration is reported before the body is even looked at.
    if !state.webhooks.chat_configured() {
        tracing::error!("CHAT_WEBHOOK_URL is not configured");
        return Err(RelayError::configuration("Chat webhook URL is not configured").into());
    }

    let request = parse_chat_request(&body)?;
    tracing::info!(
        user_id = %request.user_id,
        message_len = request.message.len(),
        "Forwarding chat message"
    );

    let upstream = state.webhooks.forward_chat(&request).await.map_err(|e| {
        tracing::error!(error = %e, kind = ?e.kind, "Failed to forward chat message");
        AppError::from(e)
    })?;

    let body = Body::from_stream(relay_stream(upstream, state.read_timeout));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("Request body is empty."));
    }

    let request: ChatRequest = serde_json::from_slice(body).map_err(|e| AppError::BadRequest {
        message: "Bad Request".to_string(),
        details: Some(e.to_string()),
    })?;

    if request.message.trim().is_empty() {
        return Err(AppError::bad_request("Message is empty."));
    }
    Ok(request)
}

// ============================================================
// File Upload
// ============================================================

async fn upload_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.webhooks.files_configured() {
        tracing::error!("FILES_WEBHOOK_URL is not configured");
        return Err(RelayError::configuration("File webhook URL is not configured").into());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let size = body.len();

    state
        .webhooks
        .forward_upload(body, content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, kind = ?e.kind, "File upload forwarding failed");
            AppError::from_upload(e)
        })?;

    tracing::info!(bytes = size, "Files forwarded");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Login
// ============================================================

async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("Request body is empty."));
    }

    let request: LoginRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest {
            message: "Bad Request".to_string(),
            details: Some(e.to_string()),
        })?;

    let Some(pin) = request.pin.as_str() else {
        return Err(AppError::bad_request("Invalid PIN format in request body."));
    };

    match state.users.authenticate(request.email.as_deref(), pin) {
        Some(user) => {
            tracing::info!(user_id = %user.id, "Login succeeded");
            Ok((StatusCode::OK, Json(LoginResponse::accepted(user))))
        }
        None => {
            tracing::warn!(with_email = request.email.is_some(), "Login rejected");
            Ok((
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse::rejected("Invalid PIN")),
            ))
        }
    }
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("chat-relay ", env!("CARGO_PKG_VERSION"))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest {
        message: String,
        details: Option<String>,
    },
    MethodNotAllowed,
    Upstream {
        status: StatusCode,
        message: String,
        details: Option<String>,
    },
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Upload failures keep the webhook's own status code.
    fn from_upload(e: RelayError) -> Self {
        match (e.kind, e.status) {
            (RelayErrorKind::UpstreamStatus, Some(code)) => AppError::Upstream {
                status: StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                message: "Webhook processing failed".to_string(),
                details: e.details,
            },
            (RelayErrorKind::Transport | RelayErrorKind::Timeout, _) => AppError::Internal {
                message: "Internal Server Error".to_string(),
                details: Some(e.message),
            },
            _ => AppError::from(e),
        }
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e.kind {
            RelayErrorKind::InvalidRequest => AppError::BadRequest {
                message: e.message,
                details: e.details,
            },
            RelayErrorKind::UpstreamStatus => AppError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: "Webhook processing failed".to_string(),
                details: e.details,
            },
            RelayErrorKind::Transport => AppError::Internal {
                message: "Internal Server Error".to_string(),
                details: Some(e.message),
            },
            RelayErrorKind::Configuration
            | RelayErrorKind::NoContent
            | RelayErrorKind::Stream
            | RelayErrorKind::Timeout => AppError::Internal {
                message: e.message,
                details: e.details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::BadRequest { message, details } => (StatusCode::BAD_REQUEST, message, details),
            AppError::MethodNotAllowed => {
                return (
                    StatusCode::METHOD_NOT_ALLOWED,
                    [(header::ALLOW, "POST")],
                    Json(ErrorResponse::new("Method Not Allowed")),
                )
                    .into_response();
            }
            AppError::Upstream {
                status,
                message,
                details,
            } => (status, message, details),
            AppError::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };

        let body = Json(ErrorResponse::new(message).with_details(details));
        (status, body).into_response()
    }
}
