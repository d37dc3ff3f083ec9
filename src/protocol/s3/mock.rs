//! Scripted in-memory multipart store for testing
//!
//! [`ScriptedStore`] keeps parts and assembled objects in memory, records
//! every call it receives and can be told to fail or corrupt specific calls.
//! Like S3 it rejects a part whose attached CRC32 does not match its body
//! with `InvalidChecksum`.

use super::error::{S3Error, S3Result};
use super::operations::MultipartStore;
use super::types::{
    CompleteUploadResponse, GetObjectResponse, ListedPart, UploadPartInfo, UploadPartResponse,
};
use crate::core::checksum::{combine_multipart_crc32, crc32, sha256_base64};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// A call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateMultipartUpload {
        bucket: String,
        key: String,
    },
    UploadPart {
        upload_id: String,
        part_number: i32,
        size: usize,
        checksum_crc32: String,
    },
    ListParts {
        upload_id: String,
    },
    CompleteMultipartUpload {
        upload_id: String,
        part_numbers: Vec<i32>,
    },
    AbortMultipartUpload {
        upload_id: String,
    },
    GetObject {
        bucket: String,
        key: String,
        checksum_mode: bool,
    },
}

#[derive(Debug, Clone, Default)]
struct Script {
    fail_create: Option<S3Error>,
    empty_upload_id: bool,
    part_failures: HashMap<i32, S3Error>,
    corrupt_part_checksums: HashMap<i32, String>,
    missing_etags: HashSet<i32>,
    no_checksum_echo: bool,
    sha256_echo: bool,
    fail_list_parts: Option<S3Error>,
    unlisted_parts: HashSet<i32>,
    corrupt_listed_checksums: HashMap<i32, String>,
    fail_complete: Option<S3Error>,
    fail_abort: Option<S3Error>,
    fail_get_object: Option<S3Error>,
    object_checksum: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    checksum_crc32: String,
    e_tag: String,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<StoreCall>,
    uploads: u32,
    parts: BTreeMap<i32, (Bytes, String)>,
    objects: HashMap<(String, String), StoredObject>,
}

/// In-memory [`MultipartStore`] with scripted failures
///
/// # Example
///
/// ```rust
/// use s3_integrity::protocol::s3::mock::ScriptedStore;
/// use s3_integrity::protocol::s3::S3Error;
///
/// let store = ScriptedStore::new().fail_part(
///     2,
///     S3Error::Network("connection reset".to_string()),
/// );
/// assert!(store.calls().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedStore {
    state: Arc<RwLock<State>>,
    script: Arc<Script>,
    drained: Arc<AtomicBool>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn script_mut(mut self, f: impl FnOnce(&mut Script)) -> Self {
        f(Arc::make_mut(&mut self.script));
        self
    }

    /// Fail `CreateMultipartUpload` with `error`
    pub fn fail_create(self, error: S3Error) -> Self {
        self.script_mut(|s| s.fail_create = Some(error))
    }

    /// Return an empty upload id from `CreateMultipartUpload`
    pub fn with_empty_upload_id(self) -> Self {
        self.script_mut(|s| s.empty_upload_id = true)
    }

    /// Fail the upload of `part_number` with `error`
    pub fn fail_part(self, part_number: i32, error: S3Error) -> Self {
        self.script_mut(|s| {
            s.part_failures.insert(part_number, error);
        })
    }

    /// Echo `checksum` instead of the real CRC32 for `part_number`
    pub fn corrupt_part_checksum(self, part_number: i32, checksum: impl Into<String>) -> Self {
        let checksum = checksum.into();
        self.script_mut(|s| {
            s.corrupt_part_checksums.insert(part_number, checksum);
        })
    }

    /// Omit the ETag from the response for `part_number`
    pub fn without_etag(self, part_number: i32) -> Self {
        self.script_mut(|s| {
            s.missing_etags.insert(part_number);
        })
    }

    /// Return no checksums from `UploadPart`
    pub fn without_checksum_echo(self) -> Self {
        self.script_mut(|s| s.no_checksum_echo = true)
    }

    /// Also return the part's SHA-256 from `UploadPart`
    pub fn with_sha256_echo(self) -> Self {
        self.script_mut(|s| s.sha256_echo = true)
    }

    pub fn fail_list_parts(self, error: S3Error) -> Self {
        self.script_mut(|s| s.fail_list_parts = Some(error))
    }

    /// Leave `part_number` out of `ListParts`
    pub fn without_listed_part(self, part_number: i32) -> Self {
        self.script_mut(|s| {
            s.unlisted_parts.insert(part_number);
        })
    }

    /// List `checksum` instead of the stored CRC32 for `part_number`
    pub fn corrupt_listed_checksum(self, part_number: i32, checksum: impl Into<String>) -> Self {
        let checksum = checksum.into();
        self.script_mut(|s| {
            s.corrupt_listed_checksums.insert(part_number, checksum);
        })
    }

    pub fn fail_complete(self, error: S3Error) -> Self {
        self.script_mut(|s| s.fail_complete = Some(error))
    }

    pub fn fail_abort(self, error: S3Error) -> Self {
        self.script_mut(|s| s.fail_abort = Some(error))
    }

    pub fn fail_get_object(self, error: S3Error) -> Self {
        self.script_mut(|s| s.fail_get_object = Some(error))
    }

    /// Report `checksum` from `GetObject` instead of the assembled object's
    pub fn with_object_checksum(self, checksum: impl Into<String>) -> Self {
        let checksum = checksum.into();
        self.script_mut(|s| s.object_checksum = Some(checksum))
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.read().unwrap().calls.clone()
    }

    pub fn abort_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::AbortMultipartUpload { .. }))
            .count()
    }

    /// Part numbers accepted by `UploadPart`, ascending
    pub fn stored_part_numbers(&self) -> Vec<i32> {
        self.state.read().unwrap().parts.keys().copied().collect()
    }

    /// Content of an assembled object
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// Whether the last `GetObject` body was read to the end
    pub fn body_drained(&self) -> bool {
        self.drained.load(Ordering::SeqCst)
    }

    fn record(&self, call: StoreCall) {
        self.state.write().unwrap().calls.push(call);
    }
}

#[async_trait]
impl MultipartStore for ScriptedStore {
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> S3Result<String> {
        self.record(StoreCall::CreateMultipartUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if let Some(err) = &self.script.fail_create {
            return Err(err.clone());
        }
        if self.script.empty_upload_id {
            return Ok(String::new());
        }

        let mut state = self.state.write().unwrap();
        state.uploads += 1;
        state.parts.clear();
        Ok(format!("upload-{}", state.uploads))
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
        checksum_crc32: &str,
    ) -> S3Result<UploadPartResponse> {
        self.record(StoreCall::UploadPart {
            upload_id: upload_id.to_string(),
            part_number,
            size: body.len(),
            checksum_crc32: checksum_crc32.to_string(),
        });
        if let Some(err) = self.script.part_failures.get(&part_number) {
            return Err(err.clone());
        }

        let actual = crc32(&body);
        if actual != checksum_crc32 {
            return Err(S3Error::Service {
                code: "InvalidChecksum".to_string(),
                message: "Value for x-amz-checksum-crc32 header is invalid.".to_string(),
            });
        }

        let echoed = match self.script.corrupt_part_checksums.get(&part_number) {
            Some(corrupt) => Some(corrupt.clone()),
            None if self.script.no_checksum_echo => None,
            None => Some(actual.clone()),
        };
        let sha256 = (self.script.sha256_echo && !self.script.no_checksum_echo)
            .then(|| sha256_base64(&body));
        let e_tag = (!self.script.missing_etags.contains(&part_number))
            .then(|| format!("\"etag-{}\"", part_number));

        self.state
            .write()
            .unwrap()
            .parts
            .insert(part_number, (body, actual));

        Ok(UploadPartResponse {
            e_tag,
            checksum_crc32: echoed,
            checksum_sha256: sha256,
        })
    }

    async fn list_parts(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> S3Result<Vec<ListedPart>> {
        self.record(StoreCall::ListParts {
            upload_id: upload_id.to_string(),
        });
        if let Some(err) = &self.script.fail_list_parts {
            return Err(err.clone());
        }

        let state = self.state.read().unwrap();
        Ok(state
            .parts
            .iter()
            .filter(|(number, _)| !self.script.unlisted_parts.contains(*number))
            .map(|(&part_number, (body, checksum))| ListedPart {
                part_number,
                size: Some(body.len() as i64),
                e_tag: Some(format!("\"etag-{}\"", part_number)),
                checksum_crc32: Some(
                    self.script
                        .corrupt_listed_checksums
                        .get(&part_number)
                        .unwrap_or(checksum)
                        .clone(),
                ),
            })
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadPartInfo],
    ) -> S3Result<CompleteUploadResponse> {
        self.record(StoreCall::CompleteMultipartUpload {
            upload_id: upload_id.to_string(),
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });
        if let Some(err) = &self.script.fail_complete {
            return Err(err.clone());
        }

        let mut state = self.state.write().unwrap();
        let mut data = Vec::new();
        let mut checksums = Vec::with_capacity(parts.len());
        for part in parts {
            let (bytes, checksum) = state.parts.get(&part.part_number).ok_or_else(|| {
                S3Error::Service {
                    code: "InvalidPart".to_string(),
                    message: format!("Part {} was not uploaded", part.part_number),
                }
            })?;
            data.extend_from_slice(bytes);
            checksums.push(checksum.clone());
        }

        let combined = combine_multipart_crc32(&checksums)
            .map_err(|e| S3Error::MultipartUpload(e.to_string()))?;
        let object = StoredObject {
            data,
            checksum_crc32: format!("{}-{}", combined, parts.len()),
            e_tag: format!("\"{}-{}\"", upload_id, parts.len()),
        };
        let response = CompleteUploadResponse {
            e_tag: Some(object.e_tag.clone()),
            location: Some(format!("http://mock/{}/{}", bucket, key)),
            checksum_crc32: Some(object.checksum_crc32.clone()),
            version_id: None,
        };
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), object);

        Ok(response)
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> S3Result<()> {
        self.record(StoreCall::AbortMultipartUpload {
            upload_id: upload_id.to_string(),
        });
        if let Some(err) = &self.script.fail_abort {
            return Err(err.clone());
        }
        self.state.write().unwrap().parts.clear();
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        checksum_mode: bool,
    ) -> S3Result<GetObjectResponse> {
        self.record(StoreCall::GetObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            checksum_mode,
        });
        if let Some(err) = &self.script.fail_get_object {
            return Err(err.clone());
        }

        let object = self
            .state
            .read()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| S3Error::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        let checksum = self
            .script
            .object_checksum
            .clone()
            .unwrap_or(object.checksum_crc32);
        self.drained.store(false, Ordering::SeqCst);

        Ok(GetObjectResponse {
            content_length: Some(object.data.len() as i64),
            body: Box::pin(TrackedBody {
                inner: Cursor::new(object.data),
                drained: Arc::clone(&self.drained),
            }),
            checksum_crc32: checksum_mode.then_some(checksum),
            checksum_sha256: None,
            e_tag: Some(object.e_tag),
        })
    }
}

/// Object body that flags when it has been read to EOF
struct TrackedBody {
    inner: Cursor<Vec<u8>>,
    drained: Arc<AtomicBool>,
}

impl AsyncRead for TrackedBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            if buf.filled().len() == before && buf.remaining() > 0 {
                self.drained.store(true, Ordering::SeqCst);
            }
        }
        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_rejects_wrong_attached_checksum() {
        let store = ScriptedStore::new();
        let id = store.create_multipart_upload("bucket", "key").await.unwrap();
        let err = store
            .upload_part("bucket", "key", &id, 1, Bytes::from_static(b"data"), "AAAAAA==")
            .await
            .unwrap_err();
        assert!(err.is_checksum_rejection());
    }

    #[tokio::test]
    async fn test_assembles_object_and_tracks_drain() {
        let store = ScriptedStore::new();
        let id = store.create_multipart_upload("bucket", "key").await.unwrap();
        let sum = crc32(b"test data");
        let response = store
            .upload_part("bucket", "key", &id, 1, Bytes::from_static(b"test data"), &sum)
            .await
            .unwrap();
        assert_eq!(response.checksum_crc32.as_deref(), Some(sum.as_str()));

        let parts = vec![UploadPartInfo::new(1, "\"etag-1\"".to_string(), sum, 9)];
        let done = store
            .complete_multipart_upload("bucket", "key", &id, &parts)
            .await
            .unwrap();
        assert_eq!(done.checksum_crc32.as_deref(), Some("Dl3bFA==-1"));
        assert_eq!(store.object("bucket", "key").unwrap(), b"test data");

        let mut object = store.get_object("bucket", "key", true).await.unwrap();
        assert!(!store.body_drained());
        let mut content = Vec::new();
        object.body.read_to_end(&mut content).await.unwrap();
        assert!(store.body_drained());
        assert_eq!(content, b"test data");
    }

    #[tokio::test]
    async fn test_scripted_failures_are_recorded() {
        let store = ScriptedStore::new()
            .fail_abort(S3Error::Network("down".to_string()))
            .fail_get_object(S3Error::Timeout("slow".to_string()));

        assert!(store.abort_multipart_upload("b", "k", "id").await.is_err());
        assert!(store.list_parts("b", "k", "id").await.is_ok());
        assert!(store.get_object("b", "k", true).await.is_err());
        assert_eq!(store.abort_count(), 1);
        assert_eq!(store.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_list_parts_reflects_stored_parts() {
        let store = ScriptedStore::new()
            .without_listed_part(2)
            .corrupt_listed_checksum(3, "AAAAAA==");
        let id = store.create_multipart_upload("bucket", "key").await.unwrap();
        for (number, body) in [(1, "aaaa"), (2, "bbbb"), (3, "cc")] {
            store
                .upload_part("bucket", "key", &id, number, Bytes::from(body), &crc32(body.as_bytes()))
                .await
                .unwrap();
        }
        assert_eq!(store.stored_part_numbers(), vec![1, 2, 3]);

        let listed = store.list_parts("bucket", "key", &id).await.unwrap();
        let numbers: Vec<i32> = listed.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(listed[0].checksum_crc32.as_deref(), Some(crc32(b"aaaa").as_str()));
        assert_eq!(listed[0].size, Some(4));
        assert_eq!(listed[1].checksum_crc32.as_deref(), Some("AAAAAA=="));
    }
}
