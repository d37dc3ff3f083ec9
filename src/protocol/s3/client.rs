//! S3 client implementation

use super::config::S3Config;
use super::error::S3Result;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client as AwsS3Client;
use std::time::Duration;

/// S3 client for AWS S3 and S3-compatible storage
#[derive(Clone)]
pub struct S3Client {
    /// AWS S3 client
    client: AwsS3Client,

    /// Client configuration
    config: S3Config,
}

impl S3Client {
    /// Create a new S3 client with the given configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s3_integrity::protocol::s3::{S3Client, S3Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = S3Config::builder()
    ///         .endpoint("http://localhost:9000")
    ///         .credentials("minioadmin", "minioadmin")
    ///         .build()?;
    ///     let client = S3Client::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: S3Config) -> S3Result<Self> {
        config.validate()?;

        let client = Self::build_aws_client(&config).await;

        Ok(Self { client, config })
    }

    /// Build the AWS SDK S3 client from configuration
    async fn build_aws_client(config: &S3Config) -> AwsS3Client {
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = if let Some(region_str) = &config.region {
            RegionProviderChain::first_try(Region::new(region_str.clone()))
        } else {
            RegionProviderChain::default_provider().or_else(Region::new("us-east-1"))
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        if let Some(profile) = &config.profile {
            aws_config_loader = aws_config_loader.profile_name(profile);
        }

        // Explicit credentials win over the profile
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = Credentials::new(
                access_key,
                secret_key,
                config.session_token.clone(),
                None,
                "s3-integrity-explicit",
            );
            aws_config_loader = aws_config_loader.credentials_provider(credentials);
        }

        aws_config_loader = aws_config_loader
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        // Required for MinIO, LocalStack and most S3-compatible stores
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        s3_config_builder = s3_config_builder.timeout_config(timeout_config);

        AwsS3Client::from_conf(s3_config_builder.build())
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Get a reference to the underlying AWS S3 client
    pub fn aws_client(&self) -> &AwsS3Client {
        &self.client
    }
}
