/*!
 * Core building blocks: checksums and upload sources
 */

pub mod checksum;
pub mod source;

pub use checksum::{
    combine_multipart_crc32, compute_multipart_crc32, crc32, decode_crc32, encode_crc32,
    parse_store_checksum, sha256_base64, ChecksumError, Crc32Hasher,
};
pub use source::{SourceReader, UploadSource};
