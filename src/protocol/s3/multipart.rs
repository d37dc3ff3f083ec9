//! Integrity-verified multipart upload
//!
//! [`MultipartUploader`] drives one upload through
//! `Init -> PartUpload x N -> Completion -> Verification`. Completion first
//! audits the store's part listing against the local manifest. Every step is
//! recorded in a [`PhaseLedger`]. Once the store has issued an upload id, any
//! failure triggers `AbortMultipartUpload` before the error is returned.

use super::config::validate_bucket_name;
use super::error::S3Error;
use super::events::{UploadEvent, UploadObserver};
use super::ledger::{PhaseLedger, UploadStage};
use super::operations::MultipartStore;
use super::types::{CompleteUploadResponse, PartManifest, UploadPartInfo, UploadSession};
use super::verify::{verify_listed_parts, verify_part_checksum, verify_uploaded_object};
use crate::core::checksum::crc32;
use crate::core::source::{SourceReader, UploadSource};
use crate::error::UploadError;
use serde::Serialize;

/// Default part size: 8 MiB
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Tunables for a single upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Bytes per part; every part but the last is exactly this size
    pub part_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl UploadOptions {
    pub fn with_part_size(part_size: usize) -> Self {
        Self { part_size }
    }
}

/// Everything known about a completed and verified upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub ledger: PhaseLedger,
    pub manifest: PartManifest,
    pub session: UploadSession,
    pub completion: CompleteUploadResponse,
    /// Whole-object CRC32 reported by the store, suffix stripped
    pub final_checksum: String,
}

/// Sequential multipart upload with per-part and whole-object verification
pub struct MultipartUploader<'a, S: MultipartStore + ?Sized> {
    store: &'a S,
    observer: &'a dyn UploadObserver,
    options: UploadOptions,
}

impl<'a, S: MultipartStore + ?Sized> MultipartUploader<'a, S> {
    pub fn new(store: &'a S, observer: &'a dyn UploadObserver) -> Self {
        Self {
            store,
            observer,
            options: UploadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload `source` to `bucket/key` and verify it end to end
    ///
    /// Input problems (bad bucket name, unreadable source) are reported before
    /// any store call. Protocol failures come back as
    /// [`UploadError::PhaseFailed`] carrying the failing phase and the ledger.
    #[tracing::instrument(skip_all, fields(bucket = %bucket, key = %key))]
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        source: &UploadSource,
    ) -> Result<UploadReport, UploadError> {
        if self.options.part_size == 0 {
            return Err(UploadError::Config(
                "Part size must be at least 1 byte".to_string(),
            ));
        }
        validate_bucket_name(bucket)?;
        if key.is_empty() {
            return Err(UploadError::Input("Object key cannot be empty".to_string()));
        }

        let reader = source.open().await?;
        let mut ledger = PhaseLedger::new();

        self.start(&mut ledger, UploadStage::Init, None);
        let upload_id = match self.store.create_multipart_upload(bucket, key).await {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => {
                let err = S3Error::MultipartUpload("No upload ID returned".to_string());
                return Err(self.fail(&mut ledger, "Failed to initiate upload", err));
            }
            Err(e) => return Err(self.fail(&mut ledger, "Failed to initiate upload", e)),
        };
        self.report_response(
            "CreateMultipartUpload",
            &serde_json::json!({ "upload_id": upload_id }),
        );
        self.succeed(&mut ledger, "Upload initiated successfully");

        let mut session = UploadSession::new(upload_id, bucket, key, reader.total_size());

        match self.run_session(&mut ledger, &mut session, reader).await {
            Ok((manifest, completion, final_checksum)) => {
                self.observer.on_event(&UploadEvent::Completed {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source: source.describe(),
                });
                Ok(UploadReport {
                    ledger,
                    manifest,
                    session,
                    completion,
                    final_checksum,
                })
            }
            Err(err) => {
                self.abort(&session).await;
                Err(err)
            }
        }
    }

    async fn run_session(
        &self,
        ledger: &mut PhaseLedger,
        session: &mut UploadSession,
        reader: SourceReader,
    ) -> Result<(PartManifest, CompleteUploadResponse, String), UploadError> {
        let manifest = self.upload_parts(ledger, session, reader).await?;

        self.start(ledger, UploadStage::Completion, None);
        match verify_listed_parts(
            self.store,
            &session.bucket,
            &session.key,
            &session.upload_id,
            &manifest,
        )
        .await
        {
            Ok(listed) => self.report_response("ListParts", &listed),
            Err(e) => {
                let message = if e.is_integrity_failure() {
                    "Part listing does not match uploaded parts"
                } else {
                    "Failed to list parts"
                };
                return Err(self.fail(ledger, message, e));
            }
        }

        let completion = match self
            .store
            .complete_multipart_upload(
                &session.bucket,
                &session.key,
                &session.upload_id,
                manifest.parts(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail(ledger, "Failed to complete upload", e)),
        };
        self.report_response("CompleteMultipartUpload", &completion);
        self.succeed(ledger, "Upload completed successfully");

        self.start(ledger, UploadStage::Verification, None);
        let final_checksum =
            match verify_uploaded_object(self.store, &session.bucket, &session.key, &manifest)
                .await
            {
                Ok(checksum) => checksum,
                Err(e) => {
                    let message = if e.is_integrity_failure() {
                        "Object checksum verification failed"
                    } else {
                        "Failed to verify upload"
                    };
                    return Err(self.fail(ledger, message, e));
                }
            };
        self.succeed(ledger, "All checksums verified successfully");

        Ok((manifest, completion, final_checksum))
    }

    /// Upload every chunk of `reader`; the reader is dropped on return
    async fn upload_parts(
        &self,
        ledger: &mut PhaseLedger,
        session: &mut UploadSession,
        mut reader: SourceReader,
    ) -> Result<PartManifest, UploadError> {
        let mut manifest = PartManifest::new();

        loop {
            let part_number = manifest.next_part_number();
            let chunk = match reader.read_chunk(self.options.part_size).await {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.start(ledger, UploadStage::PartUpload, Some(part_number));
                    return Err(self.fail(ledger, "Failed to read source", e.into()));
                }
            };
            if chunk.is_empty() {
                break;
            }

            self.start(ledger, UploadStage::PartUpload, Some(part_number));
            let checksum = crc32(&chunk);
            let size = chunk.len();

            let response = match self
                .store
                .upload_part(
                    &session.bucket,
                    &session.key,
                    &session.upload_id,
                    part_number,
                    chunk.clone(),
                    &checksum,
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let message = if e.is_checksum_rejection() {
                        "Checksum validation failed"
                    } else {
                        "Upload failed"
                    };
                    return Err(self.fail(ledger, message, e));
                }
            };
            self.report_response("UploadPart", &response);

            if let Err(mismatch) = verify_part_checksum(&response, &chunk, &checksum) {
                return Err(self.fail(
                    ledger,
                    "Part checksum verification failed",
                    S3Error::Integrity(mismatch),
                ));
            }

            let Some(etag) = response.e_tag else {
                let err = S3Error::MultipartUpload(format!(
                    "No ETag returned for part {}",
                    part_number
                ));
                return Err(self.fail(ledger, "Upload failed", err));
            };

            let part = UploadPartInfo::new(part_number, etag, checksum, size);
            if let Err(e) = manifest.push(part) {
                return Err(self.fail(ledger, "Upload failed", e));
            }
            session.record_bytes(size);
            self.succeed(
                ledger,
                format!(
                    "Uploaded and verified ({}/{} bytes)",
                    session.bytes_sent, session.total_size
                ),
            );
        }

        Ok(manifest)
    }

    /// Abort the session; a failure here is published, never returned
    async fn abort(&self, session: &UploadSession) {
        self.observer.on_event(&UploadEvent::AbortIssued {
            upload_id: session.upload_id.clone(),
        });

        if let Err(e) = self
            .store
            .abort_multipart_upload(&session.bucket, &session.key, &session.upload_id)
            .await
        {
            self.observer.on_event(&UploadEvent::AbortFailed {
                upload_id: session.upload_id.clone(),
                error: e.to_string(),
            });
        }
    }

    fn start(&self, ledger: &mut PhaseLedger, stage: UploadStage, part_number: Option<i32>) {
        ledger.start_phase(stage, part_number);
        self.observer
            .on_event(&UploadEvent::PhaseStarted { stage, part_number });
    }

    fn succeed(&self, ledger: &mut PhaseLedger, message: impl Into<String>) {
        if let Some(phase) = ledger.succeed(message) {
            self.observer.on_event(&UploadEvent::PhaseEnded(phase.clone()));
        }
    }

    fn fail(&self, ledger: &mut PhaseLedger, message: &str, error: S3Error) -> UploadError {
        let phase = ledger.fail(message, Some(error));
        self.observer.on_event(&UploadEvent::PhaseEnded(phase.clone()));
        UploadError::phase_failed(phase, ledger.clone())
    }

    fn report_response<T: Serialize>(&self, operation: &'static str, response: &T) {
        if let Ok(detail) = serde_json::to_string_pretty(response) {
            self.observer
                .on_event(&UploadEvent::StoreResponse { operation, detail });
        }
    }
}
