//! S3 multipart upload with end-to-end integrity verification
//!
//! This module uploads an object to AWS S3 or an S3-compatible store
//! (MinIO, LocalStack, ...) using the official AWS SDK for Rust, checking
//! integrity at two levels:
//!
//! - every part's CRC32 is attached to `UploadPart` and compared with the
//!   checksum the store echoes back;
//! - before completion the store's part listing is audited against the local
//!   manifest (count and per-part CRC32);
//! - after completion the object is fetched with checksum mode enabled and the
//!   store's whole-object CRC32 is compared with the one recomputed from the
//!   part checksums.
//!
//! Any failure after the upload id is issued aborts the multipart session.
//!
//! # Example
//!
//! ```ignore
//! use s3_integrity::core::source::UploadSource;
//! use s3_integrity::protocol::s3::{MultipartUploader, S3Client, S3Config, TracingObserver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = S3Config::builder()
//!         .endpoint("http://localhost:9000")
//!         .region("us-east-1") // Required even for MinIO
//!         .credentials("minioadmin", "minioadmin")
//!         .build()?;
//!
//!     let client = S3Client::new(config).await?;
//!     let observer = TracingObserver;
//!     let report = MultipartUploader::new(&client, &observer)
//!         .upload("my-bucket", "remote/file.bin", &UploadSource::file("file.bin"))
//!         .await?;
//!
//!     println!("Final CRC32: {}", report.final_checksum);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod multipart;
mod operations;
mod types;
mod verify;

pub mod events;
pub mod ledger;
pub mod mock;


// Re-export main types
pub use client::S3Client;
pub use config::{
    validate_bucket_name, S3Config, S3ConfigBuilder, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS,
};
pub use error::{S3Error, S3Result};
pub use events::{ChannelObserver, EventSubscriber, TracingObserver, UploadEvent, UploadObserver};
pub use ledger::{PhaseLedger, UploadPhase, UploadStage};
pub use multipart::{MultipartUploader, UploadOptions, UploadReport, DEFAULT_PART_SIZE};
pub use operations::MultipartStore;
pub use types::{
    CompleteUploadResponse, GetObjectResponse, ListedPart, ObjectBody, PartManifest,
    UploadPartInfo, UploadPartResponse, UploadSession,
};
pub use verify::{
    audit_listed_parts, verify_listed_parts, verify_part_checksum, verify_uploaded_object,
    ChecksumMismatch,
};
