//! Type definitions for S3 multipart operations

use super::error::{S3Error, S3Result};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Streaming object body returned by `GetObject`
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

/// Information about an uploaded part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPartInfo {
    /// Part number (1-indexed)
    pub part_number: i32,

    /// ETag of the uploaded part
    pub etag: String,

    /// CRC32 of the part's raw bytes, base64 big-endian
    pub checksum_crc32: String,

    /// Size of the part in bytes
    pub size: usize,
}

impl UploadPartInfo {
    /// Create a new upload part info
    pub fn new(part_number: i32, etag: String, checksum_crc32: String, size: usize) -> Self {
        Self {
            part_number,
            etag,
            checksum_crc32,
            size,
        }
    }
}

/// Ordered, gap-free list of uploaded parts
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartManifest {
    parts: Vec<UploadPartInfo>,
}

impl PartManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part; the part number must be exactly one past the last one
    pub fn push(&mut self, part: UploadPartInfo) -> S3Result<()> {
        let expected = self.next_part_number();
        if part.part_number != expected {
            return Err(S3Error::MultipartUpload(format!(
                "Part {} appended out of order (expected part {})",
                part.part_number, expected
            )));
        }
        self.parts.push(part);
        Ok(())
    }

    pub fn parts(&self) -> &[UploadPartInfo] {
        &self.parts
    }

    /// Part checksums in ascending part-number order
    pub fn checksums(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().map(|p| p.checksum_crc32.as_str())
    }

    pub fn next_part_number(&self) -> i32 {
        self.parts.len() as i32 + 1
    }

    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.size as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Server-side handle for one in-progress multipart upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadSession {
    /// Upload ID issued by `CreateMultipartUpload`
    pub upload_id: String,

    /// Destination bucket
    pub bucket: String,

    /// Destination key
    pub key: String,

    /// Size of the source in bytes
    pub total_size: u64,

    /// Bytes acknowledged and verified so far
    pub bytes_sent: u64,
}

impl UploadSession {
    pub fn new(upload_id: String, bucket: &str, key: &str, total_size: u64) -> Self {
        Self {
            upload_id,
            bucket: bucket.to_string(),
            key: key.to_string(),
            total_size,
            bytes_sent: 0,
        }
    }

    /// Advance the running byte counter after a verified part
    pub fn record_bytes(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
    }
}

/// Response of a single `UploadPart` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadPartResponse {
    pub e_tag: Option<String>,
    pub checksum_crc32: Option<String>,
    pub checksum_sha256: Option<String>,
}

/// A part as the store lists it for an in-progress upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListedPart {
    pub part_number: i32,
    pub size: Option<i64>,
    pub e_tag: Option<String>,
    pub checksum_crc32: Option<String>,
}

/// Response of `CompleteMultipartUpload`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompleteUploadResponse {
    pub e_tag: Option<String>,
    pub location: Option<String>,
    pub checksum_crc32: Option<String>,
    pub version_id: Option<String>,
}

/// Response of `GetObject` with checksum mode enabled
pub struct GetObjectResponse {
    /// Object content; must be drained before it is dropped
    pub body: ObjectBody,

    /// Store-computed CRC32, possibly carrying a `-<partCount>` suffix
    pub checksum_crc32: Option<String>,

    pub checksum_sha256: Option<String>,

    pub e_tag: Option<String>,

    pub content_length: Option<i64>,
}

impl std::fmt::Debug for GetObjectResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectResponse")
            .field("checksum_crc32", &self.checksum_crc32)
            .field("checksum_sha256", &self.checksum_sha256)
            .field("e_tag", &self.e_tag)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
