//! Multipart store trait and its `aws-sdk-s3` implementation

use super::client::S3Client;
use super::error::{S3Error, S3Result};
use super::types::{
    CompleteUploadResponse, GetObjectResponse, ListedPart, UploadPartInfo, UploadPartResponse,
};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    ChecksumAlgorithm, ChecksumMode, CompletedMultipartUpload, CompletedPart,
};
use bytes::Bytes;

/// The object-store calls a verified multipart upload needs
#[async_trait]
pub trait MultipartStore: Send + Sync {
    /// Start a multipart upload that records CRC32 part checksums
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> S3Result<String>;

    /// Upload one part with its base64 CRC32 attached
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
        checksum_crc32: &str,
    ) -> S3Result<UploadPartResponse>;

    /// Every part the store holds for `upload_id`, ascending by part number
    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> S3Result<Vec<ListedPart>>;

    /// Assemble the object from `parts`, which must be in ascending order
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadPartInfo],
    ) -> S3Result<CompleteUploadResponse>;

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> S3Result<()>;

    /// Fetch an object; with `checksum_mode` the store reports its checksums
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        checksum_mode: bool,
    ) -> S3Result<GetObjectResponse>;
}

#[async_trait]
impl MultipartStore for S3Client {
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> S3Result<String> {
        let response = self
            .aws_client()
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .checksum_algorithm(ChecksumAlgorithm::Crc32)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(response.upload_id().unwrap_or_default().to_string())
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
        checksum_crc32: &str,
    ) -> S3Result<UploadPartResponse> {
        let response = self
            .aws_client()
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .checksum_crc32(checksum_crc32)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(UploadPartResponse {
            e_tag: response.e_tag().map(str::to_string),
            checksum_crc32: response.checksum_crc32().map(str::to_string),
            checksum_sha256: response.checksum_sha256().map(str::to_string),
        })
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> S3Result<Vec<ListedPart>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;

        // ListParts pages at 1000 parts
        loop {
            let response = self
                .aws_client()
                .list_parts()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .set_part_number_marker(marker.take())
                .send()
                .await
                .map_err(S3Error::from)?;

            parts.extend(response.parts().iter().map(|p| ListedPart {
                part_number: p.part_number().unwrap_or_default(),
                size: p.size(),
                e_tag: p.e_tag().map(str::to_string),
                checksum_crc32: p.checksum_crc32().map(str::to_string),
            }));

            match response.next_part_number_marker() {
                Some(next) if response.is_truncated().unwrap_or(false) => {
                    marker = Some(next.to_string());
                }
                _ => break,
            }
        }

        Ok(parts)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadPartInfo],
    ) -> S3Result<CompleteUploadResponse> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .checksum_crc32(&p.checksum_crc32)
                    .build()
            })
            .collect();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let response = self
            .aws_client()
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(CompleteUploadResponse {
            e_tag: response.e_tag().map(str::to_string),
            location: response.location().map(str::to_string),
            checksum_crc32: response.checksum_crc32().map(str::to_string),
            version_id: response.version_id().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> S3Result<()> {
        self.aws_client()
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        checksum_mode: bool,
    ) -> S3Result<GetObjectResponse> {
        let mut request = self.aws_client().get_object().bucket(bucket).key(key);
        if checksum_mode {
            request = request.checksum_mode(ChecksumMode::Enabled);
        }

        let response = request.send().await.map_err(|e| {
            let err = S3Error::from(e);
            if err.code() == Some("NoSuchKey") {
                S3Error::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                err
            }
        })?;

        let checksum_crc32 = response.checksum_crc32().map(str::to_string);
        let checksum_sha256 = response.checksum_sha256().map(str::to_string);
        let e_tag = response.e_tag().map(str::to_string);
        let content_length = response.content_length();

        Ok(GetObjectResponse {
            body: Box::pin(response.body.into_async_read()),
            checksum_crc32,
            checksum_sha256,
            e_tag,
            content_length,
        })
    }
}
