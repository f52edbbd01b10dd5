//! In-memory ObjectStore used by the engine tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cancel::CancelToken;
use crate::error::{Error, Result, StoreErrorKind};
use crate::traits::{Entry, ListPage, ListRequest, ObjectReader, ObjectRecord, ObjectStore};

type KeyHook = Box<dyn Fn(&str) + Send + Sync>;

enum Item {
    Prefix(String),
    Object(ObjectRecord),
}

/// Store backed by ordered maps, with knobs for injecting failures
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    regions: Mutex<HashMap<String, String>>,
    page_size: usize,
    chunk_size: usize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_calls: Mutex<Vec<Vec<String>>>,
    fail_delete_key: Option<String>,
    fail_get_key: Option<String>,
    fail_put_key: Option<String>,
    stall_get_key: Option<String>,
    stall_put_key: Option<String>,
    after_get: Option<KeyHook>,
    after_put: Option<KeyHook>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            regions: Mutex::new(HashMap::new()),
            page_size: 1000,
            chunk_size: 64,
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            delete_calls: Mutex::new(Vec::new()),
            fail_delete_key: None,
            fail_get_key: None,
            fail_put_key: None,
            stall_get_key: None,
            stall_put_key: None,
            after_get: None,
            after_put: None,
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    pub fn failing_delete(mut self, key: &str) -> Self {
        self.fail_delete_key = Some(key.to_string());
        self
    }

    pub fn failing_get(mut self, key: &str) -> Self {
        self.fail_get_key = Some(key.to_string());
        self
    }

    pub fn failing_put(mut self, key: &str) -> Self {
        self.fail_put_key = Some(key.to_string());
        self
    }

    /// Make downloads of `key` hang after the first chunk until cancelled
    pub fn stalling_get(mut self, key: &str) -> Self {
        self.stall_get_key = Some(key.to_string());
        self
    }

    /// Make uploads of `key` hang after reading the body until cancelled
    pub fn stalling_put(mut self, key: &str) -> Self {
        self.stall_put_key = Some(key.to_string());
        self
    }

    /// Run `hook` with the key once a download has been fully written
    pub fn after_get(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.after_get = Some(Box::new(hook));
        self
    }

    /// Run `hook` with the key once an upload has been stored
    pub fn after_put(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.after_put = Some(Box::new(hook));
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(key).cloned())
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains_key(bucket)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.delete_calls.lock().unwrap().clone()
    }

    fn items(&self, bucket: &str, request: &ListRequest) -> Result<Vec<Item>> {
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets.get(bucket).ok_or_else(|| {
            Error::store("ListObjectsV2", StoreErrorKind::NotFound, bucket.to_string())
        })?;

        let mut items = Vec::new();
        for (key, data) in objects.range(request.prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&request.prefix) else {
                break;
            };
            let grouped = request
                .delimiter
                .as_deref()
                .and_then(|d| rest.find(d).map(|i| (i, d.len())));
            match grouped {
                Some((i, len)) => {
                    let prefix = format!("{}{}", request.prefix, &rest[..i + len]);
                    let seen = matches!(items.last(), Some(Item::Prefix(p)) if *p == prefix);
                    if !seen {
                        items.push(Item::Prefix(prefix));
                    }
                }
                None => {
                    let mut record = ObjectRecord::new(key.clone(), data.len() as u64);
                    record.etag = Some(format!("etag-{}", data.len()));
                    items.push(Item::Object(record));
                }
            }
        }
        Ok(items)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<Entry>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .rev()
            .map(|name| Entry::bucket(name.clone(), None))
            .collect())
    }

    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let items = self.items(bucket, request)?;

        let start: usize = request
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let end = (start + self.page_size).min(items.len());

        let mut page = ListPage::default();
        for item in items.into_iter().skip(start).take(end - start) {
            match item {
                Item::Prefix(p) => page.common_prefixes.push(p),
                Item::Object(o) => page.objects.push(o),
            }
        }
        page.next_token = (end < self.items(bucket, request)?.len()).then(|| end.to_string());
        Ok(page)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<u64> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_key.as_deref() == Some(key) {
            return Err(Error::store(
                "GetObject",
                StoreErrorKind::Network,
                "connection reset",
            ));
        }

        let data = self.object(bucket, key).ok_or_else(|| {
            Error::store("GetObject", StoreErrorKind::NotFound, key.to_string())
        })?;

        let mut written = 0u64;
        for chunk in data.chunks(self.chunk_size) {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            sink.write_all(chunk).await?;
            written += chunk.len() as u64;
            progress(written);

            if self.stall_get_key.as_deref() == Some(key) {
                cancel.cancelled().await;
                return Err(Error::Cancelled);
            }
        }
        sink.flush().await?;
        if let Some(hook) = &self.after_get {
            hook(key);
        }
        Ok(written)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ObjectReader,
        _size: u64,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancelToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.fail_put_key.as_deref() == Some(key) {
            return Err(Error::store(
                "PutObject",
                StoreErrorKind::AccessDenied,
                "write not allowed",
            ));
        }

        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        progress(data.len() as u64);
        if self.stall_put_key.as_deref() == Some(key) {
            cancel.cancelled().await;
            return Err(Error::Cancelled);
        }
        self.insert(bucket, key, data);
        if let Some(hook) = &self.after_put {
            hook(key);
        }
        Ok(())
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<()> {
        self.delete_calls.lock().unwrap().push(keys.to_vec());

        if let Some(bad) = &self.fail_delete_key {
            if keys.contains(bad) {
                return Err(Error::DeleteFailed {
                    key: bad.clone(),
                    message: "AccessDenied".to_string(),
                });
            }
        }

        let mut buckets = self.buckets.lock().unwrap();
        if let Some(objects) = buckets.get_mut(bucket) {
            for key in keys {
                objects.remove(key);
            }
        }
        Ok(())
    }

    async fn create_bucket(
        &self,
        name: &str,
        region_hint: Option<&str>,
        _make_public: bool,
    ) -> Result<()> {
        self.buckets
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
        if let Some(region) = region_hint {
            self.regions
                .lock()
                .unwrap()
                .insert(name.to_string(), region.to_string());
        }
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.buckets
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::store("DeleteBucket", StoreErrorKind::NotFound, name.to_string()))
    }

    async fn resolve_bucket_region(&self, bucket: &str) -> Result<String> {
        Ok(self
            .regions
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .unwrap_or_else(|| "us-east-1".to_string()))
    }
}
