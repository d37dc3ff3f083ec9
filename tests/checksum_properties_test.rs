//! Properties of the checksum engine checked against independent references

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use s3_integrity::core::checksum::{
    combine_multipart_crc32, compute_multipart_crc32, crc32, decode_crc32, parse_store_checksum,
    sha256_base64,
};

/// Deterministic pseudo-random bytes (xorshift)
fn pseudo_random(len: usize, mut seed: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed & 0xff) as u8
        })
        .collect()
}

fn part_checksums(parts: &[Vec<u8>]) -> Vec<String> {
    parts.iter().map(|p| crc32(p)).collect()
}

#[test]
fn test_combine_equals_crc32_of_concatenated_raw_checksums() {
    for count in [1usize, 2, 3, 7, 64] {
        let parts: Vec<Vec<u8>> = (0..count)
            .map(|i| pseudo_random(100 + i * 37, 0x9E37_79B9_7F4A_7C15 + i as u64))
            .collect();
        let checksums = part_checksums(&parts);

        let mut raw = Vec::with_capacity(count * 4);
        for checksum in &checksums {
            raw.extend_from_slice(&BASE64.decode(checksum).unwrap());
        }

        let combined = combine_multipart_crc32(&checksums).unwrap();
        assert_eq!(combined, crc32(&raw), "{} parts", count);
    }
}

#[test]
fn test_combine_equals_chained_crc32_of_decoded_checksums() {
    let parts: Vec<Vec<u8>> = (0..5).map(|i| pseudo_random(4096, i + 1)).collect();
    let checksums = part_checksums(&parts);

    let decoded: Vec<[u8; 4]> = checksums
        .iter()
        .map(|c| decode_crc32(c).unwrap().to_be_bytes())
        .collect();

    assert_eq!(
        combine_multipart_crc32(&checksums).unwrap(),
        compute_multipart_crc32(&decoded)
    );
}

#[test]
fn test_chained_crc32_equals_crc32_of_whole_data() {
    let data = pseudo_random(10_000, 42);
    let chunks: Vec<&[u8]> = data.chunks(999).collect();
    assert_eq!(compute_multipart_crc32(chunks), crc32(&data));
}

#[test]
fn test_checksums_are_deterministic() {
    let data = pseudo_random(5000, 7);
    assert_eq!(crc32(&data), crc32(&data.clone()));
    assert_eq!(sha256_base64(&data), sha256_base64(&data.clone()));
    assert_eq!(crc32(&data).len(), 8);
    assert_eq!(sha256_base64(&data).len(), 44);
}

#[test]
fn test_suffix_stripping_is_idempotent() {
    for raw in ["AAAAAA==-3", "3YR2dg==-12", "Dl3bFA==", ""] {
        let once = parse_store_checksum(raw);
        assert_eq!(parse_store_checksum(once), once);
        assert!(!once.contains('-'));
    }
    assert_eq!(parse_store_checksum("AAAAAA==-3"), "AAAAAA==");
}

#[test]
fn test_store_reported_checksum_matches_after_stripping() {
    let checksums = part_checksums(&[b"part1".to_vec(), b"part2".to_vec(), b"part3".to_vec()]);
    let combined = combine_multipart_crc32(&checksums).unwrap();
    let reported = format!("{}-{}", combined, checksums.len());
    assert_eq!(parse_store_checksum(&reported), "3YR2dg==");
}
