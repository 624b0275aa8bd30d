use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr};

/// Default lifetime of signed access URLs, in seconds.
pub const DEFAULT_SIGNED_URL_EXPIRES_SECS: u64 = 3600;

/// Which kind of access URL upload responses carry.
///
/// Selected once from configuration; the upload path branches on this in a
/// single place rather than duplicating the URL-construction logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlMode {
    /// Time-limited signed GET URLs (default).
    Signed,
    /// Deterministic public URLs with no expiry.
    Public,
}

impl FromStr for UrlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signed" => Ok(UrlMode::Signed),
            "public" => Ok(UrlMode::Public),
            other => Err(format!(
                "unknown url mode `{}` (expected `signed` or `public`)",
                other
            )),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub url_mode: UrlMode,
    pub signed_url_expires: u64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("region", &self.region)
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .field("url_mode", &self.url_mode)
            .field("signed_url_expires", &self.signed_url_expires)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "S3 file upload gateway API")]
pub struct Args {
    /// Host to bind to (overrides UPLOAD_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOAD_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Target S3 bucket (overrides AWS_S3_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Access URL variant, `signed` or `public` (overrides UPLOAD_GATEWAY_URL_MODE)
    #[arg(long)]
    pub url_mode: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    ///
    /// Credentials are read from the environment only. Missing required
    /// values are a startup error, never deferred to first use.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_env_with(Args::parse())
    }

    fn from_env_with(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("UPLOAD_GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("UPLOAD_GATEWAY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing UPLOAD_GATEWAY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading UPLOAD_GATEWAY_PORT"),
        };

        let region = match args.region {
            Some(region) => region,
            None => env::var("AWS_REGION").context("AWS_REGION must be set (or pass --region)")?,
        };
        let access_key_id =
            env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID must be set")?;
        let secret_access_key =
            env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY must be set")?;
        let bucket = match args.bucket {
            Some(bucket) => bucket,
            None => env::var("AWS_S3_BUCKET_NAME")
                .context("AWS_S3_BUCKET_NAME must be set (or pass --bucket)")?,
        };

        // Optional override for S3-compatible stores (LocalStack, MinIO).
        let endpoint_url = env::var("AWS_ENDPOINT_URL").ok();

        let url_mode = match args
            .url_mode
            .or_else(|| env::var("UPLOAD_GATEWAY_URL_MODE").ok())
        {
            Some(raw) => raw.parse::<UrlMode>().map_err(anyhow::Error::msg)?,
            None => UrlMode::Signed,
        };

        let signed_url_expires = match env::var("UPLOAD_GATEWAY_SIGNED_URL_EXPIRES") {
            Ok(value) => value.parse::<u64>().with_context(|| {
                format!("parsing UPLOAD_GATEWAY_SIGNED_URL_EXPIRES value `{}`", value)
            })?,
            Err(env::VarError::NotPresent) => DEFAULT_SIGNED_URL_EXPIRES_SECS,
            Err(err) => return Err(err).context("reading UPLOAD_GATEWAY_SIGNED_URL_EXPIRES"),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            region,
            access_key_id,
            secret_access_key,
            bucket,
            endpoint_url,
            url_mode,
            signed_url_expires,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_mode_parses_known_variants() {
        assert_eq!("signed".parse::<UrlMode>().unwrap(), UrlMode::Signed);
        assert_eq!("public".parse::<UrlMode>().unwrap(), UrlMode::Public);
        assert_eq!("SIGNED".parse::<UrlMode>().unwrap(), UrlMode::Signed);
    }

    #[test]
    fn url_mode_rejects_unknown_variant() {
        let err = "presigned".parse::<UrlMode>().unwrap_err();
        assert!(err.contains("presigned"));
    }

    #[test]
    fn debug_redacts_credentials() {
        let cfg = AppConfig {
            host: "0.0.0.0".into(),
            port: 3000,
            region: "us-east-1".into(),
            access_key_id: "AKIAEXAMPLE".into(),
            secret_access_key: "topsecret".into(),
            bucket: "my-bucket".into(),
            endpoint_url: None,
            url_mode: UrlMode::Signed,
            signed_url_expires: DEFAULT_SIGNED_URL_EXPIRES_SECS,
        };
        let debug = format!("{:?}", cfg);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("AKIAEXAMPLE"));
    }
}
