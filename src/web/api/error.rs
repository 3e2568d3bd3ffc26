use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::producer::PushError;
use crate::session::SessionError;
use crate::storage::{ShareError, StorageError};
use crate::web::auth::PermissionError;

pub enum ApiError {
    Permission(PermissionError),
    Conflict(&'static str, String),
    Unavailable(&'static str, String),
    Forbidden(&'static str, String),
    NotFound(&'static str, String),
    Internal(&'static str, String),
}

impl From<PermissionError> for ApiError {
    fn from(e: PermissionError) -> Self {
        ApiError::Permission(e)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Internal("storage_error", e.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::AlreadyRecording => ApiError::Conflict("already_recording", message),
            SessionError::NotRecording => ApiError::Conflict("not_recording", message),
            SessionError::InvalidStateTransition { .. } => {
                ApiError::Conflict("stop_recording_first", message)
            }
            SessionError::Storage(_) => ApiError::Internal("storage_error", message),
            SessionError::Share(ShareError::Unavailable) => {
                ApiError::Unavailable("export_unavailable", message)
            }
            SessionError::Share(_) => ApiError::Internal("share_failed", message),
        }
    }
}

impl From<PushError> for ApiError {
    fn from(e: PushError) -> Self {
        let message = e.to_string();
        match e {
            PushError::PermissionDenied => ApiError::Forbidden("permission_denied", message),
            PushError::NotSubscribed(_) => ApiError::NotFound("channel_not_subscribed", message),
            PushError::Backlogged(_) => ApiError::Unavailable("channel_backlogged", message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Permission(e) => return e.into_response(),
            ApiError::Conflict(error, message) => (StatusCode::CONFLICT, error, message),
            ApiError::Unavailable(error, message) => {
                (StatusCode::SERVICE_UNAVAILABLE, error, message)
            }
            ApiError::Forbidden(error, message) => (StatusCode::FORBIDDEN, error, message),
            ApiError::NotFound(error, message) => (StatusCode::NOT_FOUND, error, message),
            ApiError::Internal(error, message) => {
                log::error!("{}: {}", error, message);
                (StatusCode::INTERNAL_SERVER_ERROR, error, message)
            }
        };
        (status, Json(ErrorResponse::with_message(error, &message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_status_codes() {
        let cases = [
            (SessionError::AlreadyRecording, StatusCode::CONFLICT),
            (
                SessionError::InvalidStateTransition {
                    operation: "changing the activity type",
                },
                StatusCode::CONFLICT,
            ),
            (
                SessionError::Share(ShareError::Unavailable),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SessionError::Storage(StorageError::InvalidDeviceId("x/y".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
