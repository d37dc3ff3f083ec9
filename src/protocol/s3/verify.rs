//! Part and object checksum verification against store responses

use super::error::{S3Error, S3Result};
use super::operations::MultipartStore;
use super::types::{ListedPart, PartManifest, UploadPartResponse};
use crate::core::checksum::{
    combine_multipart_crc32, decode_crc32, parse_store_checksum, sha256_base64,
};
use thiserror::Error;

/// Disagreement between a locally computed checksum and the store's
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumMismatch {
    #[error("CRC32 mismatch: local 0x{local:08x} ({local}), S3 0x{remote:08x} ({remote})")]
    Crc32 { local: u32, remote: u32 },

    #[error("Invalid CRC32 format: {0}")]
    InvalidCrc32Format(String),

    #[error("SHA256 mismatch: local {local}, S3 {remote}")]
    Sha256 { local: String, remote: String },

    #[error("Parts count mismatch: uploaded {uploaded}, listed {listed}")]
    PartCount { uploaded: usize, listed: usize },

    #[error("Listed part {listed} where part {expected} was uploaded")]
    UnexpectedPart { expected: i32, listed: i32 },

    #[error("Part {0} missing CRC32 checksum")]
    MissingPartChecksum(i32),

    #[error("Checksum mismatch for part {part_number}: expected {expected}, got {actual}")]
    PartChecksum {
        part_number: i32,
        expected: String,
        actual: String,
    },

    #[error("Checksum mismatch (Calculated: {calculated}, S3: {stored})")]
    Object { calculated: String, stored: String },
}

/// Check an `UploadPart` response against the chunk that was sent
///
/// CRC32 values are compared numerically. A SHA-256 in the response is
/// checked against a digest recomputed over `data`. A response carrying
/// neither checksum passes.
pub fn verify_part_checksum(
    response: &UploadPartResponse,
    data: &[u8],
    sent_crc32: &str,
) -> Result<(), ChecksumMismatch> {
    if let Some(remote_b64) = &response.checksum_crc32 {
        let local = decode_crc32(sent_crc32)
            .map_err(|e| ChecksumMismatch::InvalidCrc32Format(e.to_string()))?;
        let remote = decode_crc32(remote_b64)
            .map_err(|e| ChecksumMismatch::InvalidCrc32Format(e.to_string()))?;

        if local != remote {
            return Err(ChecksumMismatch::Crc32 { local, remote });
        }
        tracing::debug!(
            "CRC32 match: {} ({}) b64 {}",
            hex::encode(local.to_be_bytes()),
            local,
            remote_b64
        );
    }

    if let Some(remote) = &response.checksum_sha256 {
        let local = sha256_base64(data);
        if &local != remote {
            return Err(ChecksumMismatch::Sha256 {
                local,
                remote: remote.clone(),
            });
        }
        tracing::debug!("SHA256 match: {}", local);
    }

    Ok(())
}

/// Compare the store's part listing with the local manifest
///
/// The listing must hold exactly the manifest's parts, in order, each with
/// the CRC32 that was sent.
pub fn audit_listed_parts(
    listed: &[ListedPart],
    manifest: &PartManifest,
) -> Result<(), ChecksumMismatch> {
    if listed.len() != manifest.len() {
        return Err(ChecksumMismatch::PartCount {
            uploaded: manifest.len(),
            listed: listed.len(),
        });
    }

    for (local, remote) in manifest.parts().iter().zip(listed) {
        if local.part_number != remote.part_number {
            return Err(ChecksumMismatch::UnexpectedPart {
                expected: local.part_number,
                listed: remote.part_number,
            });
        }
        let actual = remote
            .checksum_crc32
            .as_deref()
            .ok_or(ChecksumMismatch::MissingPartChecksum(remote.part_number))?;
        if actual != local.checksum_crc32 {
            return Err(ChecksumMismatch::PartChecksum {
                part_number: remote.part_number,
                expected: local.checksum_crc32.clone(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(())
}

/// List the session's parts and audit them against `manifest`
///
/// Returns the listing. A failed `ListParts` call is wrapped with
/// `Part listing error` context.
pub async fn verify_listed_parts<S: MultipartStore + ?Sized>(
    store: &S,
    bucket: &str,
    key: &str,
    upload_id: &str,
    manifest: &PartManifest,
) -> S3Result<Vec<ListedPart>> {
    let listed = store
        .list_parts(bucket, key, upload_id)
        .await
        .map_err(|e| e.context("Part listing error"))?;

    for part in &listed {
        tracing::debug!(
            part_number = part.part_number,
            size = ?part.size,
            "Listed part CRC32 {}",
            part.checksum_crc32.as_deref().unwrap_or("-")
        );
    }

    audit_listed_parts(&listed, manifest)?;
    Ok(listed)
}

/// Re-fetch the stored object and compare its CRC32 with the manifest's
///
/// The body is drained to the end before it is dropped. Returns the verified
/// checksum. Transport failures are wrapped with `Verification error` context;
/// a disagreement is an [`S3Error::Integrity`].
pub async fn verify_uploaded_object<S: MultipartStore + ?Sized>(
    store: &S,
    bucket: &str,
    key: &str,
    manifest: &PartManifest,
) -> S3Result<String> {
    let mut response = store
        .get_object(bucket, key, true)
        .await
        .map_err(|e| e.context("Verification error"))?;

    let drained = tokio::io::copy(&mut response.body, &mut tokio::io::sink())
        .await
        .map_err(|e| S3Error::from(e).context("Verification error"))?;
    tracing::debug!("Drained {} bytes of {}/{}", drained, bucket, key);

    let stored = parse_store_checksum(response.checksum_crc32.as_deref().unwrap_or(""))
        .to_string();
    drop(response);

    let calculated = combine_multipart_crc32(manifest.checksums())
        .map_err(|e| S3Error::Integrity(ChecksumMismatch::InvalidCrc32Format(e.to_string())))?;

    if calculated != stored {
        return Err(S3Error::Integrity(ChecksumMismatch::Object { calculated, stored }));
    }

    tracing::debug!("Object CRC32 verified: {} over {} parts", stored, manifest.len());
    Ok(stored)
}
