//! Defines routes for the upload API.
//!
//! ## Structure
//! - **Upload endpoints**
//!   - `POST /upload/single` — store one file
//!   - `POST /upload/multiple` — store up to 10 files
//!   - `GET  /upload/signed-url/{*key}` — time-limited access URL
//!   - `PUT    /upload/{*key}` — replace stored object
//!   - `DELETE /upload/{*key}` — remove stored object
//!
//! The wildcard `{*key}` spans nested keys like `uploads/photo-1712-ab12.png`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{
            MAX_FILE_SIZE_BYTES, MAX_FILES_PER_BATCH, delete_file, signed_url, update_file,
            upload_multiple, upload_single,
        },
    },
    services::upload_service::UploadService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Body cap for multipart requests: a full batch at the per-file limit plus
/// headroom for multipart framing.
const MAX_BODY_BYTES: usize = MAX_FILES_PER_BATCH * MAX_FILE_SIZE_BYTES + 1024 * 1024;

/// Build and return the router for all upload routes.
///
/// The router carries shared state (`UploadService`) to all handlers.
pub fn routes() -> Router<UploadService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload endpoints
        .route("/upload/single", post(upload_single))
        .route("/upload/multiple", post(upload_multiple))
        .route("/upload/signed-url/{*key}", get(signed_url))
        .route("/upload/{*key}", put(update_file).delete(delete_file))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
