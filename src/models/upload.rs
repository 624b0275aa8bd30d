//! Shapes exchanged with callers of the upload API.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Descriptive metadata returned after a successful store write.
///
/// Serialized in camelCase to stay compatible with existing clients.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Access URL for the stored object; signed or public per configuration.
    pub url: String,

    /// Storage key the object was written under. Sole identifier for
    /// delete, replace, and signed-URL operations.
    pub key: String,

    /// Original filename as supplied by the client.
    pub filename: String,

    /// Declared content type.
    pub mimetype: String,

    /// Payload size in bytes.
    pub size: u64,

    /// Bucket the object lives in.
    pub bucket: String,

    /// Content fingerprint reported by the store for the bytes written.
    pub etag: String,

    /// Expiry of the signed URL; absent in public-URL mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url_expires: Option<DateTime<Utc>>,
}

/// One file extracted from a multipart request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Caller-tunable knobs shared by the upload and replace operations.
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// Logical folder, the first key segment. Defaults to `uploads`.
    pub folder: Option<String>,

    /// Signed-URL lifetime in seconds. Defaults to the configured value.
    pub signed_url_expires: Option<u64>,
}
