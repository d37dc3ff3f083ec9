//! Error types for S3 operations

use super::verify::ChecksumMismatch;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::io;
use thiserror::Error;

/// Result type alias for S3 operations
pub type S3Result<T> = Result<T, S3Error>;

/// Error codes the store uses when it rejects a part's attached checksum
const CHECKSUM_REJECTION_CODES: &[&str] = &["InvalidChecksum", "BadDigest"];

/// Errors that can occur during S3 operations
#[derive(Error, Debug, Clone)]
pub enum S3Error {
    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// S3 service error with specific error code
    #[error("S3 service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Object not found in bucket
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Access denied error
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Multipart upload protocol error
    #[error("Multipart upload error: {0}")]
    MultipartUpload(String),

    /// Locally computed checksum disagrees with the store
    #[error("{0}")]
    Integrity(ChecksumMismatch),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<S3Error>,
    },
}

impl S3Error {
    /// Add context to an error
    pub fn context<S: Into<String>>(self, context: S) -> Self {
        S3Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Machine-readable service error code, if the store returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Service { code, .. } => Some(code),
            S3Error::AccessDenied(_) => Some("AccessDenied"),
            S3Error::WithContext { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Whether the store refused a request because its checksum did not match
    pub fn is_checksum_rejection(&self) -> bool {
        self.code()
            .is_some_and(|code| CHECKSUM_REJECTION_CODES.contains(&code))
    }

    /// Whether this error reports a local/remote checksum disagreement
    pub fn is_integrity_failure(&self) -> bool {
        match self {
            S3Error::Integrity(_) => true,
            S3Error::WithContext { source, .. } => source.is_integrity_failure(),
            _ => false,
        }
    }
}

// Convert io::Error to S3Error
impl From<io::Error> for S3Error {
    fn from(err: io::Error) -> Self {
        S3Error::Io(err.to_string())
    }
}

impl From<ChecksumMismatch> for S3Error {
    fn from(mismatch: ChecksumMismatch) -> Self {
        S3Error::Integrity(mismatch)
    }
}

/// Convert AWS SDK errors to S3Error, keeping the service error code
impl<E, R> From<SdkError<E, R>> for S3Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: SdkError<E, R>) -> Self {
        match error {
            SdkError::DispatchFailure(e) => {
                S3Error::Network(format!("Network dispatch failure: {:?}", e))
            }
            SdkError::ResponseError(e) => S3Error::Network(format!("Response error: {:?}", e)),
            SdkError::TimeoutError(e) => S3Error::Timeout(format!("{:?}", e)),
            SdkError::ServiceError(e) => {
                let err = e.err();
                let code = err.code().unwrap_or("Unknown").to_string();
                let message = err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());

                if code == "AccessDenied" {
                    S3Error::AccessDenied(message)
                } else {
                    S3Error::Service { code, message }
                }
            }
            _ => S3Error::Sdk(format!("{:?}", error)),
        }
    }
}
