//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use twitodon_oauth::OAuthError;
use twitodon_store::StoreError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required session cookie is absent or its signature does not verify.
    #[error("Missing session cookie: {0}")]
    MissingSessionCookie(&'static str),

    /// The callback `state` does not belong to this browser's login session.
    #[error("OAuth state does not match the login session")]
    SessionMismatch,

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A provider refused a registration or identity call.
    #[error("Upstream error: {message}")]
    Upstream { status: u16, message: String },

    /// A provider refused a token call; its status and body are relayed as-is.
    #[error("Upstream rejected request with status {status}")]
    Passthrough { status: u16, body: String },

    /// A provider could not be reached or answered nonsense.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Database/storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OAuthError> for ServerError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::InvalidHost(_) => ServerError::BadRequest(e.to_string()),
            OAuthError::MissingChallenge => {
                ServerError::BadRequest("Login session expired, request a new login URL".into())
            }
            OAuthError::ProviderRegistration { status } | OAuthError::UpstreamAuth { status } => {
                ServerError::Upstream {
                    status,
                    message: e.to_string(),
                }
            }
            OAuthError::TokenExchange { status, body } | OAuthError::Revoke { status, body } => {
                ServerError::Passthrough { status, body }
            }
            OAuthError::MissingCredentials(_) => ServerError::Config(e.to_string()),
            OAuthError::Network(msg) | OAuthError::InvalidResponse(msg) => {
                ServerError::BadGateway(msg)
            }
            OAuthError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidHost(host) => {
                ServerError::BadRequest(format!("Invalid host: {}", host))
            }
            other => ServerError::Storage(other.to_string()),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// A provider status as a response status; anything outside 4xx/5xx becomes 500.
pub(crate) fn relayed_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Passthrough { status, body } => {
                let status = relayed_status(*status);
                tracing::warn!(status = %status, "Relaying upstream rejection");
                return (status, body.clone()).into_response();
            }
            ServerError::MissingSessionCookie(_) => {
                (StatusCode::UNAUTHORIZED, "missing_session_cookie")
            }
            ServerError::SessionMismatch => (StatusCode::UNAUTHORIZED, "session_mismatch"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Upstream { status, .. } => (relayed_status(*status), "upstream_error"),
            ServerError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "bad_gateway"),
            ServerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ServerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
