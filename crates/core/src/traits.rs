//! ObjectStore trait definition
//!
//! This trait is the narrow capability surface the engine needs from an
//! S3-compatible store. It keeps the namespace mapper and the transfer
//! orchestrator decoupled from the SDK that implements it.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::cancel::CancelToken;
use crate::error::Result;

/// Kind of a node in the virtual namespace
///
/// The declaration order is the listing order: folders sort before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Bucket,
    Folder,
    File,
}

/// A node in the virtual namespace
///
/// Entries are built fresh by every listing call. Use the constructors so that
/// `size` is present exactly when the entry is a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Name relative to the listed prefix (bucket name for buckets)
    pub key: String,

    pub kind: EntryKind,

    /// Size in bytes (files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// ETag without surrounding quotes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Last modified timestamp (creation date for buckets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Absolute key from the bucket root (None for buckets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
}

impl Entry {
    /// Create a bucket entry
    pub fn bucket(name: impl Into<String>, created: Option<Timestamp>) -> Self {
        Self {
            key: name.into(),
            kind: EntryKind::Bucket,
            size: None,
            etag: None,
            last_modified: created,
            storage_class: None,
            full_path: None,
        }
    }

    /// Create a folder entry from its display name and full prefix
    pub fn folder(key: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: EntryKind::Folder,
            size: None,
            etag: None,
            last_modified: None,
            storage_class: None,
            full_path: Some(full_path.into()),
        }
    }

    /// Create a file entry from a listing record
    pub fn file(key: impl Into<String>, record: &ObjectRecord) -> Self {
        Self {
            key: key.into(),
            kind: EntryKind::File,
            size: Some(record.size),
            etag: record.etag.clone(),
            last_modified: record.last_modified,
            storage_class: record.storage_class.clone(),
            full_path: Some(record.key.clone()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_bucket(&self) -> bool {
        self.kind == EntryKind::Bucket
    }

    /// Human-readable size, if this is a file
    pub fn size_human(&self) -> Option<String> {
        self.size.map(|s| humansize::format_size(s, humansize::BINARY))
    }
}

/// One object as reported by a listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Full key from the bucket root
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: Option<Timestamp>,
    pub storage_class: Option<String>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            etag: None,
            last_modified: None,
            storage_class: None,
        }
    }
}

/// Parameters of a single listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Key prefix to filter by (empty for the bucket root)
    pub prefix: String,

    /// Delimiter for grouping; None lists every key under the prefix
    pub delimiter: Option<String>,

    /// Continuation token from the previous page
    pub continuation_token: Option<String>,

    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub common_prefixes: Vec<String>,
    pub objects: Vec<ObjectRecord>,

    /// Token for the next page, None on the last page
    pub next_token: Option<String>,
}

/// All pages of a listing, concatenated in the order the store returned them
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub common_prefixes: Vec<String>,
    pub objects: Vec<ObjectRecord>,
}

/// Boxed byte source handed to [`ObjectStore::put_object`]
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Trait for S3-compatible storage operations
///
/// Implementations must be safe to share between concurrent listing and
/// transfer calls. Streaming calls report bytes through `progress` as they go
/// and must return [`crate::Error::Cancelled`] when `cancel` fires mid-stream.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<Entry>>;

    /// Fetch one page of keys under a prefix
    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<ListPage>;

    /// Stream an object into `sink`, returning the number of bytes written
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<u64>;

    /// Upload `size` bytes from `body`, splitting into parts when large
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectReader,
        size: u64,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<()>;

    /// Delete at most 1000 keys in one request
    ///
    /// Object-level failures surface as [`crate::Error::DeleteFailed`] naming
    /// the first failing key.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<()>;

    /// Create a bucket, optionally in a region and with a public read policy
    async fn create_bucket(
        &self,
        name: &str,
        region_hint: Option<&str>,
        make_public: bool,
    ) -> Result<()>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, name: &str) -> Result<()>;

    /// Region the bucket lives in; "us-east-1" when the store reports none
    async fn resolve_bucket_region(&self, bucket: &str) -> Result<String>;

    /// Put a zero-byte object at a key ending in `/`
    async fn create_folder_marker(&self, bucket: &str, key: &str) -> Result<()> {
        let key = if key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        };
        let mut ignore = |_: u64| {};
        self.put_object(
            bucket,
            &key,
            Box::new(tokio::io::empty()),
            0,
            &mut ignore,
            &CancelToken::new(),
        )
        .await
    }

    /// List every page under a prefix, following continuation tokens
    async fn list_all(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut request = ListRequest {
            prefix: prefix.to_string(),
            delimiter: delimiter.map(str::to_string),
            ..Default::default()
        };

        loop {
            let page = self.list_page(bucket, &request).await?;
            listing.common_prefixes.extend(page.common_prefixes);
            listing.objects.extend(page.objects);

            match page.next_token {
                Some(token) if !token.is_empty() => request.continuation_token = Some(token),
                _ => break,
            }
        }

        Ok(listing)
    }
}
