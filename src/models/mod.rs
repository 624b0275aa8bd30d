//! Request and response models for the upload gateway.
//!
//! Everything here is request-scoped — the remote bucket is the single
//! source of truth and no object registry is kept in process.

pub mod upload;
