/*!
 * s3-integrity CLI
 *
 * Uploads a file or a text snippet to S3 with multipart upload, verifying
 * every part's CRC32 and the assembled object's checksum.
 */

use clap::{ArgGroup, Parser};
use s3_integrity::{
    cli_style::{self, print_error, print_phase_summary, print_upload_failure, print_upload_report},
    config::{UploadConfig, MIN_PART_SIZE_MIB},
    core::source::UploadSource,
    error::{Result, UploadError, EXIT_SUCCESS},
    logging,
    protocol::s3::{MultipartUploader, S3Client, TracingObserver, UploadOptions},
};
use std::path::PathBuf;

/// Environment variable that overrides `--endpoint-url`
const ENDPOINT_ENV_VAR: &str = "AWS_ENDPOINT_URL";

#[derive(Parser, Debug)]
#[command(name = "s3-integrity")]
#[command(
    version,
    about = "Multipart upload to S3 with per-part and whole-object checksum verification",
    long_about = None
)]
#[command(group(ArgGroup::new("input").required(true).args(["file", "text"])))]
struct Cli {
    /// Local file to upload
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Text to upload instead of a file
    #[arg(long, value_name = "CONTENT")]
    text: Option<String>,

    /// Destination bucket
    #[arg(long)]
    bucket: String,

    /// Destination object key
    #[arg(long)]
    key: String,

    /// S3-compatible endpoint; AWS_ENDPOINT_URL takes precedence
    #[arg(long = "endpoint-url", value_name = "URL")]
    endpoint_url: Option<String>,

    /// Access key ID
    #[arg(long = "access-key")]
    access_key: Option<String>,

    /// Secret access key
    #[arg(long = "secret-key")]
    secret_key: Option<String>,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// Named AWS profile
    #[arg(long)]
    profile: Option<String>,

    /// Debug logging, including raw store responses
    #[arg(short, long)]
    verbose: bool,

    /// Part size in MiB (minimum 5)
    #[arg(long = "part-size", value_name = "MiB", value_parser = clap::value_parser!(u64).range(MIN_PART_SIZE_MIB as u64..))]
    part_size: Option<u64>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write JSON logs to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

impl Cli {
    fn source(&self) -> Result<UploadSource> {
        match (&self.file, &self.text) {
            (Some(path), _) => Ok(UploadSource::file(path)),
            (None, Some(text)) => Ok(UploadSource::text(text.as_str())),
            (None, None) => Err(UploadError::Input(
                "Either --file or --text is required".to_string(),
            )),
        }
    }

    /// Layer command-line flags over the file configuration
    fn apply_to(&self, config: &mut UploadConfig, endpoint_env: Option<String>) {
        if let Some(endpoint) = resolve_endpoint(endpoint_env, self.endpoint_url.clone()) {
            config.s3.endpoint = Some(endpoint);
        }
        if let Some(access_key) = &self.access_key {
            config.s3.access_key = Some(access_key.clone());
        }
        if let Some(secret_key) = &self.secret_key {
            config.s3.secret_key = Some(secret_key.clone());
        }
        if let Some(region) = &self.region {
            config.s3.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.s3.profile = Some(profile.clone());
        }
        if let Some(part_size) = self.part_size {
            config.part_size_mib = part_size as usize;
        }
        if self.log.is_some() {
            config.log_file = self.log.clone();
        }
        config.verbose |= self.verbose;
    }
}

/// A non-empty environment value wins over the flag
fn resolve_endpoint(env_value: Option<String>, flag: Option<String>) -> Option<String> {
    env_value.filter(|v| !v.trim().is_empty()).or(flag)
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            print_error(&e.to_string(), suggestion(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            UploadConfig::from_file(path).map_err(|e| UploadError::Config(format!("{:#}", e)))?
        }
        None => UploadConfig::default(),
    };
    cli.apply_to(&mut config, std::env::var(ENDPOINT_ENV_VAR).ok());
    config
        .validate()
        .map_err(|e| UploadError::Config(format!("{:#}", e)))?;

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let source = cli.source()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| UploadError::Config(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(upload(&config, &cli.bucket, &cli.key, &source))
}

async fn upload(config: &UploadConfig, bucket: &str, key: &str, source: &UploadSource) -> Result<()> {
    cli_style::print_info(&format!(
        "Uploading {} to {}/{} in {} MiB parts",
        source.describe(),
        bucket,
        key,
        config.part_size_mib
    ));

    let result = match S3Client::new(config.s3.clone()).await {
        Ok(client) => {
            let observer = TracingObserver;
            MultipartUploader::new(&client, &observer)
                .with_options(UploadOptions::with_part_size(config.part_size_bytes()))
                .upload(bucket, key, source)
                .await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(report) => {
            print_phase_summary(&report.ledger);
            print_upload_report(&report);
            cli_style::print_success(&format!(
                "Uploaded {} to {}/{} and verified",
                source.describe(),
                bucket,
                key
            ));
            Ok(())
        }
        Err(e) => {
            print_upload_failure(&e);
            Err(e)
        }
    }
}

fn suggestion(error: &UploadError) -> Option<&'static str> {
    let data_rejected = error
        .failed_phase()
        .and_then(|phase| phase.error.as_ref())
        .is_some_and(|e| e.is_integrity_failure() || e.is_checksum_rejection());

    match error {
        UploadError::SourceNotFound(_) => Some("Check the --file path"),
        UploadError::Config(_) => Some("Check the endpoint, credentials and --config file"),
        UploadError::PhaseFailed(_) if data_rejected => {
            Some("Checksums disagreed; the multipart upload was aborted")
        }
        _ => None,
    }
}
