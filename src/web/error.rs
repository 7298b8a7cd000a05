use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::views;
use crate::services::{AuthError, UploadError};

#[derive(Debug)]
pub enum WebError {
    NotFound,

    BadRequest(String),

    InternalError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "The page you were looking for does not exist.".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our end.".to_string(),
                )
            }
        };

        (status, views::error_page(status, &message)).into_response()
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::BadRequest(msg),
            AuthError::StoreUnavailable(msg) | AuthError::Internal(msg) => Self::InternalError(msg),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<UploadError> for WebError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => Self::InternalError(format!("Failed to store upload: {e}")),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<MultipartError> for WebError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(format!("Malformed form upload: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_internal_detail_is_not_rendered() {
        let response = WebError::InternalError("db is on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8_lossy(&body);
        assert!(!html.contains("fire"));
        assert!(html.contains("Something went wrong"));
    }

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            WebError::from(AuthError::Validation("short".into())),
            WebError::BadRequest(_)
        ));
        assert!(matches!(
            WebError::from(AuthError::StoreUnavailable("gone".into())),
            WebError::InternalError(_)
        ));
    }
}
