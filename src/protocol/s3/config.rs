//! Configuration types for the S3 client

use super::error::{S3Error, S3Result};
use serde::{Deserialize, Serialize};

/// Default operation timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Default number of attempts the SDK makes per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// S3 client configuration
///
/// Bucket and key are not part of the connection settings; they are passed
/// with every upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// AWS region (e.g., "us-east-1")
    pub region: Option<String>,

    /// Custom endpoint URL (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,

    /// AWS access key ID (optional - uses credential chain if not provided)
    pub access_key: Option<String>,

    /// AWS secret access key (optional - uses credential chain if not provided)
    pub secret_key: Option<String>,

    /// Session token (for temporary credentials)
    pub session_token: Option<String>,

    /// Named profile from the shared AWS config files
    pub profile: Option<String>,

    /// Path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,

    /// Operation timeout in seconds
    pub timeout_seconds: u64,

    /// Attempts per request, including the first
    pub max_attempts: u32,
}

impl S3Config {
    pub fn new() -> Self {
        Self {
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            profile: None,
            force_path_style: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn builder() -> S3ConfigBuilder {
        S3ConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> S3Result<()> {
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(S3Error::InvalidConfig(
                "Both access_key and secret_key must be provided together".to_string(),
            ));
        }

        if self.session_token.is_some() && self.access_key.is_none() {
            return Err(S3Error::InvalidConfig(
                "session_token requires access_key and secret_key".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(S3Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(S3Error::InvalidConfig(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint).map_err(|e| {
                S3Error::InvalidConfig(format!("Invalid endpoint URL '{}': {}", endpoint, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(S3Error::InvalidConfig(format!(
                    "Endpoint URL must use http or https: {}",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Check if using custom endpoint (S3-compatible service)
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Check if using explicit credentials
    pub fn has_explicit_credentials(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for S3Config
#[derive(Debug, Default)]
pub struct S3ConfigBuilder {
    config: S3Config,
}

impl S3ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set custom endpoint (for MinIO, LocalStack, etc.)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Set AWS credentials explicitly
    pub fn credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.config.access_key = Some(access_key.into());
        self.config.secret_key = Some(secret_key.into());
        self
    }

    /// Set session token (for temporary credentials)
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.config.session_token = Some(token.into());
        self
    }

    /// Set AWS profile name
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = Some(profile.into());
        self
    }

    /// Enable or disable path-style addressing
    pub fn force_path_style(mut self, force: bool) -> Self {
        self.config.force_path_style = force;
        self
    }

    /// Set operation timeout
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set attempts per request
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Build the configuration
    pub fn build(self) -> S3Result<S3Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Reject bucket names S3 would refuse, before any request is made
pub fn validate_bucket_name(name: &str) -> S3Result<()> {
    if is_valid_bucket_name(name) {
        Ok(())
    } else {
        Err(S3Error::InvalidConfig(format!(
            "Invalid bucket name: {}. Bucket names must be 3-63 characters, \
             lowercase letters, numbers, hyphens, and periods only",
            name
        )))
    }
}

/// Validate S3 bucket name according to AWS rules
fn is_valid_bucket_name(name: &str) -> bool {
    let bytes = name.as_bytes();

    // Length check: 3-63 characters
    if !(3..=63).contains(&bytes.len()) {
        return false;
    }

    // Must start and end with lowercase letter or number
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(bytes[0]) || !edge_ok(bytes[bytes.len() - 1]) {
        return false;
    }

    // Only lowercase letters, numbers, hyphens, and periods
    if !bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return false;
    }

    if name.contains("..") {
        return false;
    }

    // Cannot be formatted as IP address
    if name.split('.').count() == 4 && name.split('.').all(|s| s.parse::<u8>().is_ok()) {
        return false;
    }

    !name.starts_with("xn--") && !name.ends_with("-s3alias")
}
