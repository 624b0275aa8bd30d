use crate::services::upload_service::UploadError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for handler errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Stable discriminator for the error classes clients must tell apart.
    pub code: Option<&'static str>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            code: None,
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Attach a machine-readable code to the JSON body.
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(code) = self.code {
            body["code"] = json!(code);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match &err {
            // Both stored objects survive; a plain retry would leak more.
            UploadError::StaleFileRetained { .. } => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                    .with_code("stale_file_retained")
            }
            // The object is stored; only the access URL is missing.
            UploadError::UploadUnconfirmed { .. } => {
                AppError::new(StatusCode::BAD_GATEWAY, err.to_string())
                    .with_code("upload_unconfirmed")
            }
            _ => AppError::new(StatusCode::BAD_GATEWAY, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_file_error_maps_to_distinct_code() {
        let err = UploadError::StaleFileRetained {
            old_key: "uploads/a-123-xyz.png".into(),
            detail: "connection reset".into(),
        };
        let app_err = AppError::from(err);
        assert_eq!(app_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.code, Some("stale_file_retained"));
        assert!(app_err.message.contains("uploads/a-123-xyz.png"));
    }

    #[test]
    fn plain_store_errors_carry_no_code() {
        let err = UploadError::Upload("timed out".into());
        let app_err = AppError::from(err);
        assert_eq!(app_err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(app_err.code, None);
    }

    #[test]
    fn unconfirmed_upload_is_retryable_class() {
        let err = UploadError::UploadUnconfirmed {
            key: "uploads/b-1-a.png".into(),
            detail: "signing failed".into(),
        };
        let app_err = AppError::from(err);
        assert_eq!(app_err.code, Some("upload_unconfirmed"));
    }
}
