//! Batched deletion
//!
//! Keys are deleted in batches of at most [`MAX_DELETE_BATCH`]. The first
//! failing batch stops the run; batches already sent stay deleted.

use crate::error::{Error, Result};
use crate::namespace::folder_prefix;
use crate::path::Location;
use crate::traits::{Entry, EntryKind, ObjectStore};

/// Largest number of keys one delete request may carry
pub const MAX_DELETE_BATCH: usize = 1000;

/// Delete `keys` from `bucket`, returning how many were deleted
pub async fn delete_keys(store: &dyn ObjectStore, bucket: &str, keys: &[String]) -> Result<usize> {
    let mut deleted = 0;
    for batch in keys.chunks(MAX_DELETE_BATCH) {
        tracing::debug!(bucket, count = batch.len(), "deleting batch");
        store.delete_batch(bucket, batch).await?;
        deleted += batch.len();
    }
    Ok(deleted)
}

/// Delete whatever a listed entry stands for
///
/// A bucket is removed as a whole (it must be empty), a file is a single key
/// and a folder is every key under its prefix, marker included.
pub async fn delete_entry(
    store: &dyn ObjectStore,
    location: &Location,
    entry: &Entry,
) -> Result<usize> {
    if entry.kind == EntryKind::Bucket {
        store.delete_bucket(&entry.key).await?;
        tracing::info!(bucket = %entry.key, "bucket deleted");
        return Ok(1);
    }

    let bucket = location
        .bucket
        .as_deref()
        .ok_or_else(|| Error::InvalidPath("open a bucket before deleting objects".into()))?;
    let key = entry
        .full_path
        .clone()
        .unwrap_or_else(|| location.child_key(&entry.key));

    let keys = match entry.kind {
        EntryKind::Folder => {
            let listing = store.list_all(bucket, &folder_prefix(&key), None).await?;
            listing.objects.into_iter().map(|o| o.key).collect()
        }
        _ => vec![key],
    };

    let deleted = delete_keys(store, bucket, &keys).await?;
    tracing::info!(bucket, deleted, "objects deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{i:05}")).collect()
    }

    #[tokio::test]
    async fn test_delete_keys_batches_by_thousand() {
        let store = MemoryStore::new();
        for key in keys(2500) {
            store.insert("b", &key, Vec::new());
        }

        let deleted = delete_keys(&store, "b", &keys(2500)).await.unwrap();
        assert_eq!(deleted, 2500);

        let sizes: Vec<_> = store.delete_calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, [1000, 1000, 500]);
        assert!(store.keys("b").is_empty());
    }

    #[tokio::test]
    async fn test_failing_batch_stops_the_run() {
        let all = keys(2500);
        let store = MemoryStore::new().failing_delete(&all[1500]);
        for key in &all {
            store.insert("b", key, Vec::new());
        }

        let err = delete_keys(&store, "b", &all).await.unwrap_err();
        assert_eq!(err.to_string(), "delete failed for k01500: AccessDenied");
        assert_eq!(store.delete_calls().len(), 2);
        // The first batch stays deleted.
        assert_eq!(store.keys("b").len(), 1500);
        assert!(store.object("b", "k00999").is_none());
    }

    #[tokio::test]
    async fn test_delete_no_keys() {
        let store = MemoryStore::new();
        assert_eq!(delete_keys(&store, "b", &[]).await.unwrap(), 0);
        assert!(store.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_folder_entry() {
        let store = MemoryStore::new();
        store.insert("b", "logs/", Vec::new());
        store.insert("b", "logs/a", vec![1]);
        store.insert("b", "logs/old/b", vec![2]);
        store.insert("b", "logsheet", vec![3]);

        let location = Location::in_bucket("b");
        let deleted = delete_entry(&store, &location, &Entry::folder("logs", "logs/"))
            .await
            .unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(store.keys("b"), ["logsheet"]);
    }

    #[tokio::test]
    async fn test_delete_file_entry() {
        let store = MemoryStore::new();
        store.insert("b", "a/x.txt", vec![1]);
        store.insert("b", "a/y.txt", vec![1]);

        let location = Location {
            bucket: Some("b".into()),
            prefix: "a/".into(),
        };
        let record = crate::traits::ObjectRecord::new("a/x.txt", 1);
        delete_entry(&store, &location, &Entry::file("x.txt", &record))
            .await
            .unwrap();
        assert_eq!(store.keys("b"), ["a/y.txt"]);
    }

    #[tokio::test]
    async fn test_delete_bucket_entry() {
        let store = MemoryStore::new();
        store.insert("gone", "k", Vec::new());

        delete_entry(&store, &Location::root(), &Entry::bucket("gone", None))
            .await
            .unwrap();
        assert!(!store.has_bucket("gone"));

        let err = delete_entry(&store, &Location::root(), &Entry::bucket("gone", None))
            .await
            .unwrap_err();
        assert_eq!(err.store_kind(), Some(crate::StoreErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_created_bucket_with_folder_removed_in_steps() {
        let store = MemoryStore::new();
        store.create_bucket("made", Some("eu-west-3"), false).await.unwrap();
        store.create_bucket("plain", None, false).await.unwrap();
        assert_eq!(store.resolve_bucket_region("made").await.unwrap(), "eu-west-3");
        assert_eq!(store.resolve_bucket_region("plain").await.unwrap(), "us-east-1");

        store.create_folder_marker("made", "reports").await.unwrap();
        assert_eq!(store.keys("made"), ["reports/"]);

        let location = Location::in_bucket("made");
        let deleted = delete_entry(&store, &location, &Entry::folder("reports", "reports/"))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        delete_entry(&store, &Location::root(), &Entry::bucket("made", None))
            .await
            .unwrap();
        assert!(!store.has_bucket("made"));
        assert!(store.has_bucket("plain"));
    }

    #[tokio::test]
    async fn test_delete_object_outside_bucket_fails() {
        let store = MemoryStore::new();
        let err = delete_entry(&store, &Location::root(), &Entry::folder("x", "x/"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }
}
