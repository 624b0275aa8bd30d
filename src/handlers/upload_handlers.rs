//! HTTP handlers for the upload API.
//! Extracts multipart payloads, enforces file constraints before any store
//! call, and delegates the storage work to `UploadService`.

use crate::{
    errors::AppError,
    models::upload::{UploadOptions, UploadResult, UploadedFile},
    services::upload_service::UploadService,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on a single uploaded file.
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted by the API.
pub const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "text/plain",
];

/// Upper bound on files per batch request.
pub const MAX_FILES_PER_BATCH: usize = 10;

/// Query params accepted by the signed-URL endpoint.
#[derive(Debug, Deserialize)]
pub struct SignedUrlQuery {
    #[serde(rename = "expiresIn")]
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
pub struct SignedUrlResponse {
    pub url: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Everything a multipart upload request may carry.
#[derive(Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    folder: Option<String>,
    signed_url_expires: Option<u64>,
}

impl UploadForm {
    fn options(&self) -> UploadOptions {
        UploadOptions {
            folder: self.folder.clone(),
            signed_url_expires: self.signed_url_expires,
        }
    }
}

/// POST `/upload/single` — store one file, field `file`.
pub async fn upload_single(
    State(service): State<UploadService>,
    multipart: Multipart,
) -> Result<Json<UploadResult>, AppError> {
    let form = read_upload_form(multipart, "file").await?;
    let options = form.options();
    let Some(file) = form.files.into_iter().next() else {
        return Err(AppError::bad_request("no file provided"));
    };
    validate_file(&file)?;

    let result = service.upload_file(file, options).await?;
    Ok(Json(result))
}

/// POST `/upload/multiple` — store up to 10 files, field `files`.
///
/// The whole batch is validated before any store call; a store failure on
/// one file fails the request while the other files stay stored (the
/// service does no rollback).
pub async fn upload_multiple(
    State(service): State<UploadService>,
    multipart: Multipart,
) -> Result<Json<Vec<UploadResult>>, AppError> {
    let form = read_upload_form(multipart, "files").await?;
    if form.files.is_empty() {
        return Err(AppError::bad_request("no files provided"));
    }
    if form.files.len() > MAX_FILES_PER_BATCH {
        return Err(AppError::bad_request(format!(
            "at most {MAX_FILES_PER_BATCH} files per request"
        )));
    }
    for file in &form.files {
        validate_file(file)?;
    }

    let options = form.options();
    let results = service.upload_files(form.files, options).await?;
    Ok(Json(results))
}

/// GET `/upload/signed-url/{*key}` — time-limited URL for an existing key.
pub async fn signed_url(
    State(service): State<UploadService>,
    Path(key): Path<String>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Json<SignedUrlResponse>, AppError> {
    ensure_key(&key)?;
    let (url, expires_at) = service.signed_url(&key, query.expires_in).await?;
    Ok(Json(SignedUrlResponse { url, expires_at }))
}

/// DELETE `/upload/{*key}` — remove the stored object.
pub async fn delete_file(
    State(service): State<UploadService>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    ensure_key(&key)?;
    service.delete_file(&key).await?;
    Ok(Json(DeleteResponse {
        message: format!("file `{key}` deleted"),
    }))
}

/// PUT `/upload/{*key}` — replace the stored object with a new file.
pub async fn update_file(
    State(service): State<UploadService>,
    Path(key): Path<String>,
    multipart: Multipart,
) -> Result<Json<UploadResult>, AppError> {
    ensure_key(&key)?;
    let form = read_upload_form(multipart, "file").await?;
    let options = form.options();
    let Some(file) = form.files.into_iter().next() else {
        return Err(AppError::bad_request("no file provided for update"));
    };
    validate_file(&file)?;

    let result = service.replace_file(&key, file, options).await?;
    Ok(Json(result))
}

/// Collect file parts (under `file_field`) and the optional text fields.
/// Unknown fields are ignored.
async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            n if n == file_field => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("failed to read field `{name}`: {err}"))
                })?;
                form.files.push(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "folder" => {
                let folder = read_text(field).await?;
                if !folder.trim().is_empty() {
                    form.folder = Some(folder);
                }
            }
            "signedUrlExpires" => {
                let raw = read_text(field).await?;
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    AppError::bad_request(format!(
                        "signedUrlExpires must be a number of seconds, got `{raw}`"
                    ))
                })?;
                form.signed_url_expires = Some(secs);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or("field").to_string();
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("failed to read field `{name}`: {err}")))
}

/// Enforce size and content-type constraints before any store call.
fn validate_file(file: &UploadedFile) -> Result<(), AppError> {
    if file.bytes.len() > MAX_FILE_SIZE_BYTES {
        return Err(AppError::bad_request(format!(
            "file `{}` exceeds the {} MiB size limit",
            file.filename,
            MAX_FILE_SIZE_BYTES / (1024 * 1024)
        )));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(AppError::bad_request(format!(
            "content type `{}` is not allowed",
            file.content_type
        )));
    }
    Ok(())
}

fn ensure_key(key: &str) -> Result<(), AppError> {
    if key.trim().is_empty() {
        return Err(AppError::bad_request("file key is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bytes::Bytes;

    fn file(content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            filename: "sample.png".into(),
            content_type: content_type.into(),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn allowed_type_within_limit_passes() {
        assert!(validate_file(&file("image/png", 1024)).is_ok());
    }

    #[test]
    fn oversize_file_is_rejected_before_any_store_call() {
        let err = validate_file(&file("image/png", MAX_FILE_SIZE_BYTES + 1)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("size limit"));
    }

    #[test]
    fn disallowed_content_type_is_rejected() {
        let err = validate_file(&file("application/zip", 10)).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("application/zip"));
    }

    #[test]
    fn file_at_exact_limit_passes() {
        assert!(validate_file(&file("application/pdf", MAX_FILE_SIZE_BYTES)).is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(ensure_key("").is_err());
        assert!(ensure_key("  ").is_err());
        assert!(ensure_key("uploads/a-1-x.png").is_ok());
    }
}
