/*!
 * s3-integrity - integrity-verified S3 multipart upload
 *
 * - CRC32 computed per part and checked against the store's echo
 * - Whole-object CRC32 recomputed with S3's multipart combination and
 *   compared with the stored object's checksum
 * - Abort of the server-side session on any failure
 * - Ordered phase ledger for diagnostics
 */

pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod protocol;

// Re-export commonly used types
pub use config::UploadConfig;
pub use core::source::UploadSource;
pub use error::{Result, UploadError};
pub use protocol::s3::{MultipartStore, MultipartUploader, PhaseLedger, UploadOptions, UploadReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
