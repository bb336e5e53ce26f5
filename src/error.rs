//! Error types
//!
//! Stores report [`StoreError`]s. The gateway turns everything into a [`GatewayError`], which knows its HTTP status.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::schedule::ScheduleId;

/// Errors of a schedule source or store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No schedule has this id
    #[error("Schedule {0} not found")]
    NotFound(ScheduleId),

    /// The backend cannot compare this id with its row ids, e.g. text against a numeric column
    #[error("Invalid schedule id {0}")]
    InvalidId(ScheduleId),

    /// The remote end answered with a non-success status
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The backend failed in any other way
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Invalid or missing configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// The error of a gateway request. Each variant maps to a single HTTP status
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The server cannot serve this request because it is misconfigured
    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Method Not Allowed: Only {allowed} requests are accepted.")]
    MethodNotAllowed { allowed: &'static str },

    /// No credential, or a credential the identity provider does not recognize
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A valid credential that lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    Validation(String),

    #[error("Schedule with ID {0} not found.")]
    NotFound(ScheduleId),

    /// A store failure. `context` is the only part that reaches the client
    #[error("{context}")]
    Store { context: &'static str, source: StoreError },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. Internal details (configuration, store errors) are only logged
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Configuration(_) => "Server configuration error.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Configuration(detail) => log::error!("Server configuration error: {}", detail),
            GatewayError::Store { context, source } => log::error!("{} ({})", context, source),
            other => log::warn!("Rejecting request: {}", other),
        }

        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));
        let mut response = (status, body).into_response();
        if let GatewayError::MethodNotAllowed { allowed } = self {
            response.headers_mut().insert(header::ALLOW, HeaderValue::from_static(allowed));
        }
        response
    }
}
