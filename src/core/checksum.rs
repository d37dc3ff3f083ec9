/*!
 * Checksum engine for multipart integrity verification
 *
 * CRC32 values travel as base64 of the big-endian 4-byte integer, which is
 * the representation S3 uses for `x-amz-checksum-crc32`.
 */

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while decoding checksums received from the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    /// Value is not valid base64
    #[error("Invalid base64 checksum '{value}': {reason}")]
    InvalidBase64 { value: String, reason: String },

    /// Decoded CRC32 is not exactly four bytes
    #[error("CRC32 checksum must decode to 4 bytes, got {0}")]
    InvalidLength(usize),
}

/// Streaming CRC32 (IEEE 802.3) accumulator
pub struct Crc32Hasher {
    hasher: crc32fast::Hasher,
}

impl Crc32Hasher {
    /// Create a new hasher seeded with 0
    pub fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Continue a CRC32 computation from a previously finalized value
    pub fn with_seed(seed: u32) -> Self {
        Self {
            hasher: crc32fast::Hasher::new_with_initial(seed),
        }
    }

    /// Update the checksum with new data
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and return the checksum value
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Default for Crc32Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a CRC32 value the way S3 transmits it
pub fn encode_crc32(value: u32) -> String {
    BASE64.encode(value.to_be_bytes())
}

/// Decode a base64 CRC32 into its integer value
pub fn decode_crc32(checksum: &str) -> Result<u32, ChecksumError> {
    let bytes = BASE64
        .decode(checksum)
        .map_err(|e| ChecksumError::InvalidBase64 {
            value: checksum.to_string(),
            reason: e.to_string(),
        })?;

    let raw: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ChecksumError::InvalidLength(bytes.len()))?;

    Ok(u32::from_be_bytes(raw))
}

/// CRC32 of `data`, base64-encoded big-endian
pub fn crc32(data: &[u8]) -> String {
    encode_crc32(crc32fast::hash(data))
}

/// Chained CRC32 over raw part data
///
/// Each part continues the running checksum of the previous one, so the
/// result equals the CRC32 of all parts concatenated.
pub fn compute_multipart_crc32<I, D>(parts_data: I) -> String
where
    I: IntoIterator<Item = D>,
    D: AsRef<[u8]>,
{
    let mut value = 0u32;
    for data in parts_data {
        let mut hasher = Crc32Hasher::with_seed(value);
        hasher.update(data.as_ref());
        value = hasher.finalize();
    }
    encode_crc32(value)
}

/// Derive the whole-object checksum S3 reports for a multipart upload
///
/// Every part checksum is decoded to its raw 4 bytes and fed, in part-number
/// order, through a running CRC32. An empty sequence yields the CRC32 of no
/// bytes.
pub fn combine_multipart_crc32<I, S>(ordered_checksums: I) -> Result<String, ChecksumError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut combined = 0u32;
    for checksum in ordered_checksums {
        let raw = decode_crc32(checksum.as_ref())?.to_be_bytes();
        let mut hasher = Crc32Hasher::with_seed(combined);
        hasher.update(&raw);
        combined = hasher.finalize();
    }
    Ok(encode_crc32(combined))
}

/// SHA-256 digest of `data`, base64-encoded
pub fn sha256_base64(data: &[u8]) -> String {
    BASE64.encode(Sha256::digest(data))
}

/// Strip the `-<partCount>` suffix S3 appends to composite checksums
pub fn parse_store_checksum(raw: &str) -> &str {
    raw.split_once('-').map_or(raw, |(checksum, _)| checksum)
}
