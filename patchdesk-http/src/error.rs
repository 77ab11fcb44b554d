use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use patchdesk_agent::AgentError;
use patchdesk_patches::PatchError;
use patchdesk_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Every handler failure, as the client sees it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // duplicate signup answers 400
            ApiError::Conflict(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => ApiError::Conflict("Email already registered".into()),
            StoreError::Unauthorized => ApiError::Unauthorized("Invalid credentials".into()),
            StoreError::InvalidValue { .. } => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PatchError> for ApiError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            PatchError::InvalidName { .. }
            | PatchError::InvalidTarget { .. }
            | PatchError::PathTraversal { .. } => ApiError::BadRequest(e.to_string()),
            PatchError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            PatchError::Io { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Configuration(_) => ApiError::Configuration(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
