//! Multipart upload support
//!
//! Large objects are sent as sequential parts read straight from the source
//! stream. A failed or cancelled upload is aborted so no orphaned parts stay
//! behind.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use tokio::io::AsyncReadExt;

use nav_core::{CancelToken, Error, ObjectReader, Result, StoreErrorKind};

use crate::error::store_error;

/// Default part size: 5 MiB
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Multipart upload configuration
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Part size in bytes; objects up to this size go in a single request
    pub part_size: u64,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    /// Whether an object of `size` bytes needs a multipart upload
    pub fn is_multipart(&self, size: u64) -> bool {
        size > self.part_size
    }

    /// Calculate appropriate part size for a file
    pub fn calculate_part_size(&self, file_size: u64) -> u64 {
        if file_size <= MIN_PART_SIZE {
            return MIN_PART_SIZE;
        }

        let parts = file_size.div_ceil(self.part_size);

        if parts <= MAX_PARTS as u64 {
            self.part_size
        } else {
            // Need larger parts to fit within 10,000 limit
            let required_size = file_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> usize {
    file_size.div_ceil(part_size) as usize
}

/// Upload `body` as a multipart object
#[allow(clippy::too_many_arguments)]
pub(crate) async fn upload(
    client: &Client,
    bucket: &str,
    key: &str,
    body: &mut ObjectReader,
    part_size: u64,
    content_type: Option<&str>,
    progress: &mut (dyn FnMut(u64) + Send),
    cancel: &CancelToken,
) -> Result<()> {
    let created = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .set_content_type(content_type.map(str::to_string))
        .send()
        .await
        .map_err(|e| store_error("CreateMultipartUpload", e))?;
    let upload_id = created.upload_id().ok_or_else(|| {
        Error::store(
            "CreateMultipartUpload",
            StoreErrorKind::Unknown,
            "response carried no upload id",
        )
    })?;
    tracing::debug!(bucket, key, upload_id, part_size, "multipart upload started");

    let uploaded =
        upload_parts(client, bucket, key, upload_id, body, part_size, progress, cancel).await;
    let parts = match uploaded {
        Ok(parts) => parts,
        Err(e) => {
            abort(client, bucket, key, upload_id).await;
            return Err(e);
        }
    };

    let completed = CompletedMultipartUpload::builder()
        .set_parts(Some(parts))
        .build();
    client
        .complete_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .multipart_upload(completed)
        .send()
        .await
        .map_err(|e| store_error("CompleteMultipartUpload", e))?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn upload_parts(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    body: &mut ObjectReader,
    part_size: u64,
    progress: &mut (dyn FnMut(u64) + Send),
    cancel: &CancelToken,
) -> Result<Vec<CompletedPart>> {
    let mut parts = Vec::new();
    let mut sent = 0u64;

    for part_number in 1..=MAX_PARTS as i32 {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut buf = Vec::with_capacity(part_size as usize);
        (&mut *body).take(part_size).read_to_end(&mut buf).await?;
        if buf.is_empty() && part_number > 1 {
            break;
        }
        let len = buf.len() as u64;

        let request = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(buf))
            .send();
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            output = request => output.map_err(|e| store_error("UploadPart", e))?,
        };

        parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(output.e_tag().map(str::to_string))
                .build(),
        );
        sent += len;
        progress(sent);

        if len < part_size {
            break;
        }
    }

    Ok(parts)
}

async fn abort(client: &Client, bucket: &str, key: &str, upload_id: &str) {
    let result = client
        .abort_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .send()
        .await;
    match result {
        Ok(_) => tracing::debug!(bucket, key, upload_id, "multipart upload aborted"),
        Err(e) => tracing::warn!(
            bucket,
            key,
            upload_id,
            error = %store_error("AbortMultipartUpload", e),
            "could not abort multipart upload"
        ),
    }
}
