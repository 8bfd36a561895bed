//! Error handling for the upload boundary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Every way an upload request can fail. Rendered as a plain-text body.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// `fileType` missing or not `Image` / `Video`
    #[error("Unsupported File Type")]
    UnsupportedFileType,

    #[error("Missing File")]
    MissingFile,

    #[error("Malformed Upload")]
    MalformedUpload,

    #[error("Upload Too Large")]
    PayloadTooLarge,

    /// The file could not be decoded as the declared kind
    #[error("Unsupported File")]
    UnsupportedFile,

    #[error("Internal Server Error")]
    Internal,
}

impl UploadError {
    pub fn status(self) -> StatusCode {
        match self {
            UploadError::UnsupportedFileType
            | UploadError::MissingFile
            | UploadError::MalformedUpload => StatusCode::BAD_REQUEST,
            UploadError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::UnsupportedFile => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Extension trait for logging errors and converting to UploadError
pub trait LogErr<T> {
    /// Log error with context and return Internal
    fn log_500(self, context: &str) -> Result<T, UploadError>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_500(self, context: &str) -> Result<T, UploadError> {
        self.map_err(|e| {
            tracing::error!("{}: {}", context, e);
            UploadError::Internal
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_distinct() {
        assert_eq!(UploadError::UnsupportedFileType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::UnsupportedFile.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_ne!(
            UploadError::UnsupportedFileType.to_string(),
            UploadError::UnsupportedFile.to_string()
        );
    }

    #[test]
    fn log_500_maps_to_internal() {
        let failed: Result<(), &str> = Err("disk full");
        assert_eq!(failed.log_500("write"), Err(UploadError::Internal));

        let ok: Result<u8, &str> = Ok(3);
        assert_eq!(ok.log_500("never"), Ok(3));
    }
}
