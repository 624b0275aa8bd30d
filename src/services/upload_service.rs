//! src/services/upload_service.rs
//!
//! UploadService — upload, replace, delete, and signed-URL workflows over
//! the object-store client. The store is the single source of truth; this
//! service holds no object registry, only the shared client handle and the
//! URL-mode configuration snapshot.
//!
//! Replace is the one composite operation: two independent remote calls
//! (upload the new object, then delete the old one) with a failure window
//! between them. Its three observable outcomes are kept explicit rather
//! than pretending atomicity.

use crate::config::UrlMode;
use crate::models::upload::{UploadOptions, UploadResult, UploadedFile};
use crate::services::object_store::{ObjectStore, StoreError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

const DEFAULT_FOLDER: &str = "uploads";
const RANDOM_TOKEN_LEN: usize = 12;

/// Metadata field that carries the original filename alongside each object.
const ORIGINAL_NAME_META: &str = "originalname";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
    #[error("signed URL generation failed: {0}")]
    SignedUrl(String),

    /// The object bytes were written but the access URL could not be
    /// produced. The stored object is intact under `key`; the upload is
    /// safe to retry.
    #[error("upload stored under `{key}` but URL generation failed: {detail}")]
    UploadUnconfirmed { key: String, detail: String },

    /// Replace wrote the new object but could not remove the old one, so
    /// both now exist. The old key needs a manual follow-up delete.
    #[error("critical: previous file `{old_key}` retained after update failure: {detail}")]
    StaleFileRetained { old_key: String, detail: String },
}

pub type ServiceResult<T> = Result<T, UploadError>;

/// UploadService provides the CRUD-style file operations:
/// - Upload a file under a freshly generated key
/// - Replace a stored object (upload new, then delete old)
/// - Delete an object by key
/// - Produce time-limited signed URLs
///
/// Cloning is cheap; the store handle is shared and read-only after
/// construction.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    url_mode: UrlMode,
    default_signed_url_expires: u64,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        url_mode: UrlMode,
        default_signed_url_expires: u64,
    ) -> Self {
        Self {
            store,
            url_mode,
            default_signed_url_expires,
        }
    }

    /// Derive a collision-resistant storage key from the original filename.
    ///
    /// `{folder}/{sanitizedBase}-{timestamp_ms}-{random}.{ext}` — the base
    /// is everything before the first dot with non-alphanumerics mapped to
    /// `-`; the extension is everything after the last dot, omitted
    /// entirely (no dangling dot) when the name has none.
    fn generate_key(original_filename: &str, folder: &str) -> String {
        let base = original_filename
            .split('.')
            .next()
            .unwrap_or(original_filename);
        let sanitized: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();

        let timestamp = Utc::now().timestamp_millis();
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(RANDOM_TOKEN_LEN);

        let ext = match original_filename.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => format!(".{ext}"),
            _ => String::new(),
        };

        format!("{folder}/{sanitized}-{timestamp}-{token}{ext}")
    }

    /// Store one file's bytes under a generated key and return its
    /// descriptive metadata.
    ///
    /// A failed write has no side effects to roll back. A successful write
    /// followed by a URL-generation failure is the one partial state: it
    /// surfaces as [`UploadError::UploadUnconfirmed`], distinct from a full
    /// upload failure, because the object exists and a retry is safe.
    pub async fn upload_file(
        &self,
        file: UploadedFile,
        options: UploadOptions,
    ) -> ServiceResult<UploadResult> {
        let folder = options.folder.as_deref().unwrap_or(DEFAULT_FOLDER);
        let expires_secs = options
            .signed_url_expires
            .unwrap_or(self.default_signed_url_expires);

        let key = Self::generate_key(&file.filename, folder);
        let size = file.bytes.len() as u64;
        info!(key = %key, size, "uploading object");

        let mut metadata = HashMap::new();
        metadata.insert(ORIGINAL_NAME_META.to_string(), file.filename.clone());

        let outcome = self
            .store
            .put_object(&key, file.bytes.clone(), &file.content_type, &metadata)
            .await
            .map_err(|err| {
                error!(key = %key, error = %err, "object write failed");
                UploadError::Upload(err.to_string())
            })?;

        let (url, signed_url_expires) = match self.url_mode {
            UrlMode::Signed => {
                let url = self
                    .store
                    .presign_get(&key, Duration::from_secs(expires_secs))
                    .await
                    .map_err(|err| {
                        error!(key = %key, error = %err, "URL generation failed after successful write");
                        UploadError::UploadUnconfirmed {
                            key: key.clone(),
                            detail: err.to_string(),
                        }
                    })?;
                (url, Some(expiry_from_now(expires_secs)))
            }
            UrlMode::Public => (self.store.public_url(&key), None),
        };

        info!(key = %key, "upload complete");
        Ok(UploadResult {
            url,
            key,
            filename: file.filename,
            mimetype: file.content_type,
            size,
            bucket: self.store.bucket().to_string(),
            etag: outcome.etag,
            signed_url_expires,
        })
    }

    /// Upload a batch as independent concurrent operations.
    ///
    /// No ordering between files and no rollback: every upload runs to
    /// completion, then the first error (if any) is surfaced. Files that
    /// were stored before the failing one remain in the bucket.
    pub async fn upload_files(
        &self,
        files: Vec<UploadedFile>,
        options: UploadOptions,
    ) -> ServiceResult<Vec<UploadResult>> {
        let uploads = files
            .into_iter()
            .map(|file| self.upload_file(file, options.clone()));
        join_all(uploads).await.into_iter().collect()
    }

    /// Remove the object at `key`.
    ///
    /// Idempotent from the caller's view: the store reports success for
    /// missing keys and no existence pre-check is made here.
    pub async fn delete_file(&self, key: &str) -> ServiceResult<()> {
        self.store.delete_object(key).await.map_err(|err| {
            error!(key = %key, error = %err, "object delete failed");
            UploadError::Delete(err.to_string())
        })?;
        info!(key = %key, "object deleted");
        Ok(())
    }

    /// Replace the object at `old_key` with a new file.
    ///
    /// The store offers no multi-object transaction, so this is two
    /// independent calls in a fixed order: upload the new object first,
    /// and only a fully confirmed upload allows the delete of the old key.
    /// A failed upload leaves the old object untouched. A failed delete
    /// after a successful upload leaves BOTH objects in place and surfaces
    /// as [`UploadError::StaleFileRetained`] — no automated cleanup is
    /// attempted, and the new object's result is withheld so the caller
    /// treats the update as failed.
    pub async fn replace_file(
        &self,
        old_key: &str,
        file: UploadedFile,
        options: UploadOptions,
    ) -> ServiceResult<UploadResult> {
        // The folder is the first path segment of the old key unless
        // explicitly overridden.
        let folder = options.folder.clone().unwrap_or_else(|| {
            old_key
                .split('/')
                .next()
                .unwrap_or(DEFAULT_FOLDER)
                .to_string()
        });

        info!(old_key = %old_key, folder = %folder, "replacing object");
        let upload_options = UploadOptions {
            folder: Some(folder),
            ..options
        };

        let new_file = self
            .upload_file(file, upload_options)
            .await
            .map_err(|err| {
                error!(old_key = %old_key, error = %err, "replacement upload failed; old object untouched");
                match err {
                    UploadError::Upload(detail) => {
                        UploadError::Upload(format!("update failed: {detail}"))
                    }
                    other => other,
                }
            })?;

        if let Err(err) = self.store.delete_object(old_key).await {
            error!(
                old_key = %old_key,
                new_key = %new_file.key,
                error = %err,
                "old object delete failed after successful upload; both objects remain"
            );
            return Err(UploadError::StaleFileRetained {
                old_key: old_key.to_string(),
                detail: err.to_string(),
            });
        }

        info!(old_key = %old_key, new_key = %new_file.key, "replace complete");
        Ok(new_file)
    }

    /// Time-limited GET URL for an existing key, plus its expiry instant.
    pub async fn signed_url(
        &self,
        key: &str,
        expires_in: Option<u64>,
    ) -> ServiceResult<(String, DateTime<Utc>)> {
        let expires_secs = expires_in.unwrap_or(self.default_signed_url_expires);
        let url = self
            .store
            .presign_get(key, Duration::from_secs(expires_secs))
            .await
            .map_err(|err| {
                error!(key = %key, error = %err, "signed URL generation failed");
                UploadError::SignedUrl(err.to_string())
            })?;
        Ok((url, expiry_from_now(expires_secs)))
    }

    /// Reachability probe used by the readiness endpoint.
    pub async fn store_health(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }
}

fn expiry_from_now(expires_secs: u64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(expires_secs as i64)
}
