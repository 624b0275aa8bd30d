//! src/services/object_store.rs
//!
//! The narrow surface the upload service needs from the remote bucket:
//! single-object put/delete, presigned GET URLs, and a cheap reachability
//! probe. `S3Store` wraps the AWS SDK client; tests substitute an in-memory
//! fake behind the same trait.

use crate::config::AppConfig;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Service(String),
    #[error("invalid signed-url expiry: {0}")]
    InvalidExpiry(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a successful single-object write.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    /// Content fingerprint the store assigned to the bytes written.
    pub etag: String,
}

/// Authenticated handle to one remote bucket.
///
/// Implementations must be safe to share read-only across concurrent
/// requests; all methods are pure functions of their inputs plus the
/// remote store's current state.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this handle is scoped to.
    fn bucket(&self) -> &str;

    /// Write one object under `key`. Overwrites silently, per S3 semantics.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StoreResult<PutOutcome>;

    /// Delete the object at `key`. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> StoreResult<()>;

    /// Produce a time-limited GET URL for `key`. No side effects on stored
    /// data; the signature differs per call.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String>;

    /// Deterministic unauthenticated URL for `key`.
    fn public_url(&self, key: &str) -> String;

    /// Cheap reachability probe against the bucket.
    async fn health_check(&self) -> StoreResult<()>;
}

/// AWS S3 implementation of [`ObjectStore`].
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Store {
    /// Build the long-lived S3 handle from startup configuration.
    pub async fn new(cfg: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &cfg.access_key_id,
            &cfg.secret_access_key,
            None,
            None,
            "upload-gateway",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials);
        if let Some(ref endpoint) = cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // S3-compatible stores behind an endpoint override expect
        // path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(cfg.endpoint_url.is_some())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: cfg.bucket.clone(),
            region: cfg.region.clone(),
            endpoint_url: cfg.endpoint_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StoreResult<PutOutcome> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type);

        for (name, value) in metadata {
            request = request.metadata(name, value);
        }

        let output = request
            .send()
            .await
            .map_err(|err| StoreError::Service(err.to_string()))?;

        let etag = output
            .e_tag()
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        Ok(PutOutcome { etag })
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StoreError::Service(err.to_string()))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        let presign_cfg = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StoreError::InvalidExpiry(err.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_cfg)
            .await
            .map_err(|err| StoreError::Service(err.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(self.endpoint_url.as_deref(), &self.bucket, &self.region, key)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| StoreError::Service(err.to_string()))?;
        Ok(())
    }
}

/// Deterministic object URL: virtual-hosted AWS form, or path-style when an
/// endpoint override is configured.
fn public_object_url(endpoint_url: Option<&str>, bucket: &str, region: &str, key: &str) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_uses_virtual_hosted_form_by_default() {
        let url = public_object_url(None, "media", "eu-west-1", "uploads/a-1-x.png");
        assert_eq!(
            url,
            "https://media.s3.eu-west-1.amazonaws.com/uploads/a-1-x.png"
        );
    }

    #[test]
    fn public_url_is_path_style_behind_endpoint_override() {
        let url = public_object_url(
            Some("http://localhost:4566/"),
            "media",
            "us-east-1",
            "uploads/a-1-x.png",
        );
        assert_eq!(url, "http://localhost:4566/media/uploads/a-1-x.png");
    }
}
