use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    CameraUnavailable(String),
    UnsupportedCameraCount(usize),
    SessionNotFound(String),
    InvalidStartTime(String),
    InvalidDuration(String),
    /// The side effect already happened, only the record of it did not.
    /// `session_id` is set when the caller can still compensate (e.g. an
    /// out-of-band stop of a process that is already running).
    PersistenceWriteFailed {
        session_id: Option<String>,
        message: String,
    },
    FileAlreadyMoved(String),
    FileNotFound(String),
    ArchiveUploadFailed(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn camera_unavailable<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::CameraUnavailable(t.to_string())
    }

    pub fn session_not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::SessionNotFound(t.to_string())
    }

    pub fn invalid_start_time<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::InvalidStartTime(t.to_string())
    }

    pub fn archive_upload_failed<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::ArchiveUploadFailed(t.to_string())
    }

    pub fn persistence_write_failed<T>(session_id: Option<String>, t: T) -> Self
    where
        T: ToString,
    {
        AppError::PersistenceWriteFailed {
            session_id,
            message: t.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::CameraUnavailable(err) => {
                (StatusCode::SERVICE_UNAVAILABLE, format!("camera unavailable: {err}"))
                    .into_response()
            }
            AppError::UnsupportedCameraCount(count) => (
                StatusCode::BAD_REQUEST,
                format!("unsupported camera count: {count}, only 1 or 2 cameras are supported"),
            )
                .into_response(),
            AppError::SessionNotFound(err) => {
                (StatusCode::NOT_FOUND, format!("session not found: {err}")).into_response()
            }
            AppError::InvalidStartTime(err) => {
                (StatusCode::BAD_REQUEST, format!("invalid start time: {err}")).into_response()
            }
            AppError::InvalidDuration(err) => {
                (StatusCode::BAD_REQUEST, format!("invalid duration: {err}")).into_response()
            }
            AppError::PersistenceWriteFailed {
                session_id,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("persistence write failed: {message}"),
                    "session_id": session_id,
                })),
            )
                .into_response(),
            AppError::FileAlreadyMoved(err) => {
                (StatusCode::NOT_FOUND, format!("file already moved: {err}")).into_response()
            }
            AppError::FileNotFound(err) => {
                (StatusCode::NOT_FOUND, format!("file not found: {err}")).into_response()
            }
            AppError::ArchiveUploadFailed(err) => {
                (StatusCode::BAD_GATEWAY, format!("archive upload failed: {err}")).into_response()
            }
            AppError::InternalServerError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
