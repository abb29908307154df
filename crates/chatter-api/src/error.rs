use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use chatter_db::DatastoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error("not allowed to act on another user's resources")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Datastore(#[from] DatastoreError),

    #[error("background task failed")]
    Internal,
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Datastore(e) => match e {
                DatastoreError::Constraint { .. } => StatusCode::CONFLICT,
                DatastoreError::Validation(_) => StatusCode::BAD_REQUEST,
                DatastoreError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Driver detail stays in the log.
        let message = if status.is_server_error() {
            error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            debug!("request rejected: {}", self);
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
