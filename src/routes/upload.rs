//! Upload endpoint (/upload)

use axum::{
    Router,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;

use crate::AppState;
use crate::constants::{BLOCK_SIZE, RESULT_CONTENT_TYPE};
use crate::error::{LogErr, UploadError};
use crate::pipeline::{MediaKind, ProcessError};
use crate::storage;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload))
}

struct UploadedFile {
    name: Option<String>,
    data: Bytes,
}

#[derive(Default)]
struct UploadForm {
    file_type: Option<String>,
    file: Option<UploadedFile>,
}

fn multipart_error(e: MultipartError) -> UploadError {
    tracing::warn!("[upload] Multipart field error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge
    } else {
        UploadError::MalformedUpload
    }
}

/// Read the whole form before touching disk, so an invalid `fileType` is
/// rejected without side effects regardless of field order
async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("fileType") => {
                form.file_type = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    name: file_name,
                    data,
                });
            }
            other => tracing::debug!("[upload] Ignoring form field {:?}", other),
        }
    }

    Ok(form)
}

fn process_failure(kind: MediaKind, err: ProcessError) -> UploadError {
    if err.is_unsupported_input() {
        tracing::warn!("[upload] Unsupported {} content: {}", kind.as_str(), err);
        UploadError::UnsupportedFile
    } else {
        tracing::error!("[upload] Failed to process {}: {}", kind.as_str(), err);
        UploadError::Internal
    }
}

/// POST /upload - Classify an uploaded image or video
/// Accepts multipart form data with:
/// - "fileType": `Image` or `Video`
/// - "file": the media bytes
///
/// Responds with one 32-byte result block per image or sampled frame.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, UploadError> {
    let form = read_form(&mut multipart).await?;

    let kind = form
        .file_type
        .as_deref()
        .and_then(MediaKind::from_discriminator)
        .ok_or_else(|| {
            tracing::warn!("[upload] Rejected fileType {:?}", form.file_type);
            UploadError::UnsupportedFileType
        })?;

    let file = form.file.ok_or(UploadError::MissingFile)?;
    let size = file.data.len();

    let stored = storage::persist_upload(
        &state.config.upload_dir,
        kind,
        file.name.as_deref(),
        &file.data,
    )
    .await
    .log_500("[upload] Failed to persist upload")?;
    drop(file);

    let pipeline = Arc::clone(&state.pipeline);
    let path = stored.path().to_path_buf();
    let result = tokio::task::spawn_blocking(move || pipeline.process(kind, &path))
        .await
        .log_500("[upload] Processing task failed")?;

    // Upload is removed whatever the outcome
    drop(stored);

    let body = result.map_err(|e| process_failure(kind, e))?;

    tracing::info!(
        "[upload] Classified {} ({} bytes) into {} blocks",
        kind.as_str(),
        size,
        body.len() / BLOCK_SIZE
    );

    Ok(([(header::CONTENT_TYPE, RESULT_CONTENT_TYPE)], body).into_response())
}
