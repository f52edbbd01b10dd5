//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from nav-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use nav_core::profile::DEFAULT_REGION;
use nav_core::{
    CancelToken, Entry, Error, ListPage, ListRequest, ObjectReader, ObjectRecord, ObjectStore,
    Profile, Result, StoreErrorKind,
};

use crate::error::store_error;
use crate::multipart::{self, MultipartConfig};

/// S3 client wrapper
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    region: String,
    multipart: MultipartConfig,
}

impl S3Client {
    /// Create a new S3 client from a profile
    pub async fn new(profile: &Profile) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
            None, // session token
            None, // expiry
            "s3nav-static-credentials",
        );

        let region = if profile.region.is_empty() {
            DEFAULT_REGION.to_string()
        } else {
            profile.region.clone()
        };

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region.clone()));
        if !profile.endpoint.is_empty() {
            loader = loader.endpoint_url(&profile.endpoint);
        }
        let config = loader.load().await;

        if !profile.verify_tls {
            tracing::warn!(
                profile = %profile.name,
                "verify_tls = false is not supported by this client; certificates are still verified"
            );
        }

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.path_style)
            .build();

        tracing::debug!(
            profile = %profile.name,
            endpoint = %profile.endpoint,
            %region,
            "S3 client created"
        );
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            region,
            multipart: MultipartConfig::default(),
        })
    }

    /// Use `config` for uploads larger than one part
    pub fn with_multipart(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Region requests are signed for
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Client signing for `region`
    pub fn with_region(&self, region: &str) -> Self {
        if region == self.region {
            return self.clone();
        }
        let config = self
            .inner
            .config()
            .to_builder()
            .region(aws_config::Region::new(region.to_string()))
            .build();
        Self {
            inner: aws_sdk_s3::Client::from_conf(config),
            region: region.to_string(),
            multipart: self.multipart.clone(),
        }
    }

    /// Client signing for the region `bucket` lives in
    ///
    /// Falls back to this client when the region cannot be resolved.
    pub async fn for_bucket(&self, bucket: &str) -> Self {
        match self.resolve_bucket_region(bucket).await {
            Ok(region) => {
                if region != self.region {
                    tracing::debug!(bucket, from = %self.region, to = %region, "switching region");
                }
                self.with_region(&region)
            }
            Err(e) => {
                tracing::warn!(
                    bucket,
                    region = %self.region,
                    error = %e,
                    "could not resolve bucket region, keeping profile region"
                );
                self.clone()
            }
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    #[allow(clippy::too_many_arguments)]
    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        mut body: ObjectReader,
        size: u64,
        content_type: Option<String>,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut data = Vec::with_capacity(size as usize);
        body.read_to_end(&mut data).await?;
        let len = data.len() as u64;

        let request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type)
            .body(ByteStream::from(data))
            .send();
        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            output = request => {
                output.map_err(|e| store_error("PutObject", e))?;
            }
        }

        progress(len);
        Ok(())
    }
}

/// Content type for an object key, guessed from its extension
fn content_type_for(key: &str) -> Option<String> {
    if key.ends_with('/') {
        return None;
    }
    mime_guess::from_path(Path::new(key))
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Region name for a bucket location constraint
///
/// No constraint means us-east-1 and `EU` is the legacy name of eu-west-1.
pub fn normalize_region(constraint: Option<&str>) -> String {
    match constraint {
        None | Some("") => DEFAULT_REGION.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

/// Bucket policy granting anonymous read access to every object
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
    .to_string()
}

fn timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(value.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<Entry>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| store_error("ListBuckets", e))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                Entry::bucket(
                    b.name().unwrap_or_default(),
                    b.creation_date().and_then(timestamp),
                )
            })
            .collect();

        Ok(buckets)
    }

    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<ListPage> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.clone())
            .set_max_keys(request.max_keys)
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(|e| store_error("ListObjectsV2", e))?;

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        let objects = response
            .contents()
            .iter()
            .map(|object| {
                let mut record = ObjectRecord::new(
                    object.key().unwrap_or_default(),
                    object.size().unwrap_or(0).max(0) as u64,
                );
                record.etag = object.e_tag().map(|e| e.trim_matches('"').to_string());
                record.last_modified = object.last_modified().and_then(timestamp);
                record.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
                record
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            common_prefixes,
            objects,
            next_token,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<u64> {
        let request = self.inner.get_object().bucket(bucket).key(key).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request => response.map_err(|e| store_error("GetObject", e))?,
        };

        let mut body = response.body;
        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = body.try_next() => chunk.map_err(|e| {
                    Error::store("GetObject", StoreErrorKind::Network, e.to_string())
                })?,
            };
            let Some(bytes) = chunk else {
                break;
            };
            sink.write_all(&bytes).await?;
            written += bytes.len() as u64;
            progress(written);
        }
        sink.flush().await?;

        Ok(written)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ObjectReader,
        size: u64,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let content_type = content_type_for(key);
        if self.multipart.is_multipart(size) {
            let part_size = self.multipart.calculate_part_size(size);
            multipart::upload(
                &self.inner,
                bucket,
                key,
                &mut body,
                part_size,
                content_type.as_deref(),
                progress,
                cancel,
            )
            .await
        } else {
            self.put_single(bucket, key, body, size, content_type, progress, cancel)
                .await
        }
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::General(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| store_error("DeleteObjects", e))?;

        if let Some(first) = response.errors().first() {
            tracing::warn!(
                bucket,
                failed = response.errors().len(),
                "some objects could not be deleted"
            );
            return Err(Error::DeleteFailed {
                key: first.key().unwrap_or_default().to_string(),
                message: first
                    .message()
                    .or(first.code())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        Ok(())
    }

    async fn create_bucket(
        &self,
        name: &str,
        region_hint: Option<&str>,
        make_public: bool,
    ) -> Result<()> {
        let region = region_hint.unwrap_or(&self.region);
        let client = self.with_region(region);

        let mut request = client
            .inner
            .create_bucket()
            .bucket(name)
            .acl(BucketCannedAcl::Private);
        if !region.is_empty() && region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| store_error("CreateBucket", e))?;
        tracing::info!(bucket = name, region, "bucket created");

        if make_public {
            client
                .inner
                .put_bucket_policy()
                .bucket(name)
                .policy(public_read_policy(name))
                .send()
                .await
                .map_err(|e| match store_error("PutBucketPolicy", e) {
                    Error::Store {
                        operation,
                        kind,
                        message,
                    } => Error::Store {
                        operation,
                        kind,
                        message: format!("bucket created, but failed to make it public: {message}"),
                    },
                    other => other,
                })?;
        }

        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.inner
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| store_error("DeleteBucket", e))?;
        Ok(())
    }

    async fn resolve_bucket_region(&self, bucket: &str) -> Result<String> {
        let response = self
            .inner
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| store_error("GetBucketLocation", e))?;

        Ok(normalize_region(
            response.location_constraint().map(|c| c.as_str()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region(None), "us-east-1");
        assert_eq!(normalize_region(Some("")), "us-east-1");
        assert_eq!(normalize_region(Some("EU")), "eu-west-1");
        assert_eq!(normalize_region(Some("ap-south-1")), "ap-south-1");
    }

    #[test]
    fn test_public_read_policy() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("site")).unwrap();
        let statement = &policy["Statement"][0];
        assert_eq!(statement["Sid"], "PublicReadGetObject");
        assert_eq!(statement["Principal"], "*");
        assert_eq!(statement["Action"], "s3:GetObject");
        assert_eq!(statement["Resource"], "arn:aws:s3:::site/*");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/b.json").as_deref(), Some("application/json"));
        assert_eq!(content_type_for("folder/"), None);
        assert_eq!(content_type_for("no-extension"), None);
    }

    #[tokio::test]
    async fn test_client_from_profile() {
        let mut profile = Profile::new("local", "http://localhost:9000", "key", "secret");
        profile.region = String::new();
        let client = S3Client::new(&profile).await.unwrap();
        assert_eq!(client.region(), "us-east-1");

        let moved = client.with_region("eu-west-1");
        assert_eq!(moved.region(), "eu-west-1");
        assert_eq!(client.with_region("us-east-1").region(), "us-east-1");
    }
}
