// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// No calendar credential is stored for the caller.
    #[error("Not connected")]
    NotConnected,

    /// The provider refused to refresh the stored credential; the user must
    /// go through consent again.
    #[error("Calendar reauthorization required")]
    ReauthRequired,

    /// The provider rejected the access token (HTTP 401).
    #[error("Token expired")]
    TokenExpired,

    #[error("{0}")]
    Provider(String),

    #[error("Invalid action")]
    InvalidAction,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Method not allowed for action: {0}")]
    MethodNotAllowed(&'static str),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the UI should route the user back through calendar consent.
    pub fn needs_auth(&self) -> bool {
        matches!(
            self,
            AppError::NotConnected | AppError::ReauthRequired | AppError::TokenExpired
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "needsAuth", skip_serializing_if = "Option::is_none")]
    needs_auth: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized
            | AppError::NotConnected
            | AppError::ReauthRequired
            | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Provider(_)
            | AppError::InvalidAction
            | AppError::MissingFields
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error = match &self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error,
            needs_auth: self.needs_auth().then_some(true),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
