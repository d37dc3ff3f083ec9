//! End-to-end tests of the verified multipart upload against a scripted store

use s3_integrity::core::checksum::{combine_multipart_crc32, crc32};
use s3_integrity::protocol::s3::mock::{ScriptedStore, StoreCall};
use s3_integrity::protocol::s3::{
    ChannelObserver, EventSubscriber, MultipartUploader, S3Error, UploadEvent, UploadOptions,
    UploadReport, UploadStage,
};
use s3_integrity::{UploadError, UploadSource};
use std::io::Write;

const BUCKET: &str = "test-bucket";
const KEY: &str = "uploads/object.bin";

async fn run_upload(
    store: &ScriptedStore,
    source: UploadSource,
    part_size: usize,
) -> (Result<UploadReport, UploadError>, EventSubscriber) {
    let (observer, subscriber) = ChannelObserver::unbounded();
    let result = MultipartUploader::new(store, &observer)
        .with_options(UploadOptions::with_part_size(part_size))
        .upload(BUCKET, KEY, &source)
        .await;
    (result, subscriber)
}

fn service_error(code: &str) -> S3Error {
    S3Error::Service {
        code: code.to_string(),
        message: "rejected by store".to_string(),
    }
}

#[tokio::test]
async fn test_end_to_end_test_data() {
    let store = ScriptedStore::new();
    let (result, subscriber) = run_upload(&store, UploadSource::text("test data"), 1024).await;
    let report = result.expect("upload should succeed");

    assert_eq!(report.final_checksum, "Dl3bFA==");
    assert_eq!(report.manifest.parts()[0].checksum_crc32, "0wiusg==");
    assert_eq!(
        report.ledger.summary_lines(),
        vec![
            "✓ upload initialization: Upload initiated successfully",
            "✓ part upload (Part 1): Uploaded and verified (9/9 bytes)",
            "✓ upload completion: Upload completed successfully",
            "✓ checksum verification: All checksums verified successfully",
        ]
    );

    let calls = store.calls();
    assert_eq!(calls.len(), 5);
    assert!(matches!(calls[0], StoreCall::CreateMultipartUpload { .. }));
    assert!(matches!(
        &calls[1],
        StoreCall::UploadPart { part_number: 1, size: 9, checksum_crc32, .. } if checksum_crc32 == "0wiusg=="
    ));
    assert!(matches!(
        &calls[2],
        StoreCall::ListParts { upload_id } if upload_id == "upload-1"
    ));
    assert!(matches!(
        &calls[3],
        StoreCall::CompleteMultipartUpload { part_numbers, .. } if part_numbers == &vec![1]
    ));
    assert!(matches!(
        calls[4],
        StoreCall::GetObject {
            checksum_mode: true,
            ..
        }
    ));
    assert_eq!(store.abort_count(), 0);
    assert!(store.body_drained());
    assert_eq!(store.object(BUCKET, KEY).unwrap(), b"test data");

    let events = subscriber.drain();
    assert!(matches!(
        events.first(),
        Some(UploadEvent::PhaseStarted {
            stage: UploadStage::Init,
            ..
        })
    ));
    assert!(matches!(events.last(), Some(UploadEvent::Completed { .. })));
}

#[tokio::test]
async fn test_corrupted_part_two_aborts() {
    let store = ScriptedStore::new().corrupt_part_checksum(2, crc32(b"zzzz"));
    let (result, subscriber) =
        run_upload(&store, UploadSource::text("abcdefghijkl"), 4).await;
    let err = result.expect_err("corrupted part must fail the upload");

    let phase = err.failed_phase().expect("phase failure");
    assert_eq!(phase.stage, UploadStage::PartUpload);
    assert_eq!(phase.part_number, Some(2));
    assert_eq!(
        phase.message.as_deref(),
        Some("Part checksum verification failed")
    );
    assert!(phase.error.as_ref().unwrap().is_integrity_failure());
    assert!(phase.summary().contains("CRC32 mismatch"));

    let ledger = err.ledger().unwrap();
    assert_eq!(ledger.phases().len(), 3);
    assert!(ledger.phases()[..2].iter().all(|p| p.success));
    assert_eq!(ledger.phases()[2].part_number, Some(2));
    assert!(!ledger.phases()[2].success);

    let calls = store.calls();
    let session_id = calls
        .iter()
        .find_map(|c| match c {
            StoreCall::UploadPart { upload_id, .. } => Some(upload_id.clone()),
            _ => None,
        })
        .expect("parts were uploaded");
    assert_eq!(session_id, "upload-1");
    assert!(calls.iter().all(|c| match c {
        StoreCall::UploadPart { upload_id, .. } => upload_id == &session_id,
        _ => true,
    }));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, StoreCall::CompleteMultipartUpload { .. })));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, StoreCall::UploadPart { part_number: 3, .. })));
    assert!(matches!(
        calls.last(),
        Some(StoreCall::AbortMultipartUpload { upload_id }) if upload_id == &session_id
    ));
    assert_eq!(store.abort_count(), 1);

    let events = subscriber.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, UploadEvent::AbortIssued { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, UploadEvent::AbortFailed { .. })));
}

#[tokio::test]
async fn test_store_checksum_rejection_message() {
    let store = ScriptedStore::new().fail_part(2, service_error("InvalidChecksum"));
    let (result, _events) = run_upload(&store, UploadSource::text("abcdefgh"), 4).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.message.as_deref(), Some("Checksum validation failed"));
    assert_eq!(store.abort_count(), 1);
}

#[tokio::test]
async fn test_transport_failure_message() {
    let store = ScriptedStore::new().fail_part(1, S3Error::Network("connection reset".to_string()));
    let (result, _events) = run_upload(&store, UploadSource::text("abcdefgh"), 4).await;
    let err = result.unwrap_err();

    assert_eq!(
        err.to_string(),
        "✗ part upload (Part 1): Upload failed (Network error: connection reset)"
    );
    assert_eq!(store.abort_count(), 1);
}

#[tokio::test]
async fn test_zero_byte_input() {
    let store = ScriptedStore::new();
    let (result, _events) = run_upload(&store, UploadSource::text(""), 4).await;
    let report = result.expect("empty upload should succeed");

    assert!(report.manifest.is_empty());
    assert_eq!(report.final_checksum, "AAAAAA==");
    assert_eq!(report.session.total_size, 0);
    assert_eq!(report.ledger.phases().len(), 3);

    let calls = store.calls();
    assert!(!calls
        .iter()
        .any(|c| matches!(c, StoreCall::UploadPart { .. })));
    assert!(calls.iter().any(|c| matches!(
        c,
        StoreCall::CompleteMultipartUpload { part_numbers, .. } if part_numbers.is_empty()
    )));
}

#[tokio::test]
async fn test_init_failure_does_not_abort() {
    let store = ScriptedStore::new().fail_create(service_error("AccessDenied"));
    let (result, subscriber) = run_upload(&store, UploadSource::text("test data"), 4).await;
    let err = result.unwrap_err();

    let ledger = err.ledger().unwrap();
    assert_eq!(ledger.phases().len(), 1);
    assert_eq!(ledger.phases()[0].stage, UploadStage::Init);
    assert_eq!(
        ledger.phases()[0].message.as_deref(),
        Some("Failed to initiate upload")
    );
    assert_eq!(store.calls().len(), 1);
    assert_eq!(store.abort_count(), 0);
    assert!(!subscriber
        .drain()
        .iter()
        .any(|e| matches!(e, UploadEvent::AbortIssued { .. })));
}

#[tokio::test]
async fn test_completion_failure_aborts() {
    let store = ScriptedStore::new().fail_complete(service_error("InvalidPart"));
    let (result, _events) = run_upload(&store, UploadSource::text("test data"), 4).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.stage, UploadStage::Completion);
    assert_eq!(phase.message.as_deref(), Some("Failed to complete upload"));
    assert_eq!(store.abort_count(), 1);
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::GetObject { .. })));
}

#[tokio::test]
async fn test_listed_part_count_mismatch_aborts_before_completion() {
    let store = ScriptedStore::new().without_listed_part(2);
    let (result, _events) = run_upload(&store, UploadSource::text("abcdefghij"), 4).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.stage, UploadStage::Completion);
    assert_eq!(
        phase.message.as_deref(),
        Some("Part listing does not match uploaded parts")
    );
    assert!(phase.error.as_ref().unwrap().is_integrity_failure());
    assert!(phase
        .summary()
        .contains("Parts count mismatch: uploaded 3, listed 2"));
    assert_eq!(err.ledger().unwrap().phases().len(), 5);

    let calls = store.calls();
    assert!(!calls
        .iter()
        .any(|c| matches!(c, StoreCall::CompleteMultipartUpload { .. })));
    assert!(matches!(
        calls.last(),
        Some(StoreCall::AbortMultipartUpload { upload_id }) if upload_id == "upload-1"
    ));
}

#[tokio::test]
async fn test_listed_part_checksum_mismatch_aborts_before_completion() {
    let store = ScriptedStore::new().corrupt_listed_checksum(1, crc32(b"zzzz"));
    let (result, _events) = run_upload(&store, UploadSource::text("abcdefgh"), 4).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.stage, UploadStage::Completion);
    assert!(phase.summary().contains(&format!(
        "Checksum mismatch for part 1: expected {}, got {}",
        crc32(b"abcd"),
        crc32(b"zzzz")
    )));
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::CompleteMultipartUpload { .. })));
    assert_eq!(store.abort_count(), 1);
}

#[tokio::test]
async fn test_object_mismatch_aborts_and_tolerates_abort_failure() {
    let store = ScriptedStore::new()
        .with_object_checksum("AAAAAA==-1")
        .fail_abort(service_error("NoSuchUpload"));
    let (result, subscriber) = run_upload(&store, UploadSource::text("test data"), 1024).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.stage, UploadStage::Verification);
    assert_eq!(
        phase.message.as_deref(),
        Some("Object checksum verification failed")
    );
    assert!(phase
        .summary()
        .contains("Checksum mismatch (Calculated: Dl3bFA==, S3: AAAAAA==)"));
    assert!(store.body_drained());
    assert_eq!(store.abort_count(), 1);

    let events = subscriber.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        UploadEvent::AbortFailed { error, .. } if error.contains("NoSuchUpload")
    )));
}

#[tokio::test]
async fn test_verification_transport_error() {
    let store =
        ScriptedStore::new().fail_get_object(S3Error::Timeout("read timed out".to_string()));
    let (result, _events) = run_upload(&store, UploadSource::text("test data"), 1024).await;
    let err = result.unwrap_err();

    let phase = err.failed_phase().unwrap();
    assert_eq!(phase.stage, UploadStage::Verification);
    assert_eq!(phase.message.as_deref(), Some("Failed to verify upload"));
    assert!(phase
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .starts_with("Verification error:"));
    assert_eq!(store.abort_count(), 1);
}

#[tokio::test]
async fn test_missing_file_fails_before_store_calls() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScriptedStore::new();
    let (result, subscriber) =
        run_upload(&store, UploadSource::file(dir.path().join("absent.bin")), 4).await;

    assert!(matches!(result, Err(UploadError::SourceNotFound(_))));
    assert!(store.calls().is_empty());
    assert!(subscriber.drain().is_empty());
}

#[tokio::test]
async fn test_file_source_multiple_parts() {
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&content).unwrap();
    file.flush().unwrap();

    let store = ScriptedStore::new();
    let (result, _events) = run_upload(&store, UploadSource::file(file.path()), 3000).await;
    let report = result.expect("upload should succeed");

    let numbers: Vec<i32> = report
        .manifest
        .parts()
        .iter()
        .map(|p| p.part_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(report.manifest.total_bytes(), 10_000);
    assert_eq!(report.session.bytes_sent, 10_000);

    let expected = combine_multipart_crc32(content.chunks(3000).map(crc32)).unwrap();
    assert_eq!(report.final_checksum, expected);
    assert_eq!(store.object(BUCKET, KEY).unwrap(), content);
    assert!(report
        .ledger
        .summary_lines()
        .contains(&"✓ part upload (Part 4): Uploaded and verified (10000/10000 bytes)".to_string()));
}

#[tokio::test]
async fn test_store_without_checksum_echo_succeeds() {
    let store = ScriptedStore::new().without_checksum_echo();
    let (result, _events) = run_upload(&store, UploadSource::text("test data"), 4).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_completion_receives_parts_in_order() {
    let store = ScriptedStore::new();
    let (result, _events) = run_upload(&store, UploadSource::text("0123456789"), 3).await;
    result.unwrap();

    let completed = store
        .calls()
        .into_iter()
        .find_map(|c| match c {
            StoreCall::CompleteMultipartUpload { part_numbers, .. } => Some(part_numbers),
            _ => None,
        })
        .unwrap();
    assert_eq!(completed, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_verbose_responses_are_published() {
    let store = ScriptedStore::new();
    let (result, subscriber) = run_upload(&store, UploadSource::text("test data"), 1024).await;
    result.unwrap();

    let operations: Vec<&'static str> = subscriber
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            UploadEvent::StoreResponse { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(
        operations,
        vec![
            "CreateMultipartUpload",
            "UploadPart",
            "ListParts",
            "CompleteMultipartUpload"
        ]
    );
}
