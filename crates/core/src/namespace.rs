//! Namespace mapping
//!
//! Presents the store's flat, delimiter-based key space as a tree of
//! Bucket/Folder/File entries and maps keys to and from local paths.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result, StoreErrorKind};
use crate::path::Location;
use crate::traits::{Entry, Listing, ObjectStore};

/// Delimiter used to emulate folders
pub const DELIMITER: &str = "/";

/// Upper bound for a bucket listing round trip
pub const BUCKET_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// List the entries visible at `location`
///
/// At the root this lists buckets, otherwise the folders and files directly
/// under the location's prefix.
pub async fn list_location(store: &dyn ObjectStore, location: &Location) -> Result<Vec<Entry>> {
    match &location.bucket {
        None => list_buckets(store).await,
        Some(bucket) => list(store, bucket, &location.prefix).await,
    }
}

/// List buckets, bounded by [`BUCKET_LIST_TIMEOUT`]
pub async fn list_buckets(store: &dyn ObjectStore) -> Result<Vec<Entry>> {
    let mut buckets = tokio::time::timeout(BUCKET_LIST_TIMEOUT, store.list_buckets())
        .await
        .map_err(|_| {
            Error::store(
                "ListBuckets",
                StoreErrorKind::Timeout,
                format!("no response within {}s", BUCKET_LIST_TIMEOUT.as_secs()),
            )
        })??;
    buckets.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(buckets)
}

/// List folders and files directly under `prefix`, all pages included
pub async fn list(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> Result<Vec<Entry>> {
    let listing = store.list_all(bucket, prefix, Some(DELIMITER)).await?;
    tracing::debug!(
        bucket,
        prefix,
        prefixes = listing.common_prefixes.len(),
        objects = listing.objects.len(),
        "listed prefix"
    );
    Ok(entries_from_listing(prefix, &listing))
}

/// Convert a delimiter listing into sorted entries
///
/// An object whose key equals `prefix` is the folder's own marker and is
/// left out.
pub fn entries_from_listing(prefix: &str, listing: &Listing) -> Vec<Entry> {
    let folders = listing
        .common_prefixes
        .iter()
        .map(|p| Entry::folder(last_segment(p), p.clone()));

    let files = listing
        .objects
        .iter()
        .filter(|o| o.key != prefix)
        .map(|o| Entry::file(last_segment(&o.key), o));

    let mut entries: Vec<Entry> = folders.chain(files).collect();
    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.key.cmp(&b.key)));
    entries
}

/// Last non-empty `/`-separated segment of a key or prefix
///
/// A value without any non-empty segment (such as `"/"`) maps to `"/"`.
pub fn last_segment(key: &str) -> String {
    key.trim()
        .split('/')
        .rfind(|s| !s.is_empty())
        .unwrap_or(DELIMITER)
        .to_string()
}

/// Force a non-empty prefix to end with `/`
pub fn folder_prefix(prefix: &str) -> String {
    let prefix = to_slash(prefix);
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix
    } else {
        format!("{prefix}/")
    }
}

/// Local path a remote key downloads to
///
/// The key is taken relative to `current_prefix` when it lives under it;
/// otherwise the whole key is used. Every segment must be a plain name, so a
/// key with `.` or `..` segments never resolves outside `dest_root`.
pub fn local_download_path(
    current_prefix: &str,
    dest_root: &Path,
    remote_key: &str,
) -> Result<PathBuf> {
    let key = to_slash(remote_key);
    let prefix = folder_prefix(current_prefix);
    let relative = key.strip_prefix(prefix.as_str()).unwrap_or(&key);

    let mut path = dest_root.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => path.push(name),
            _ => {
                return Err(Error::InvalidPath(format!(
                    "object key {remote_key} does not map to a path inside {}",
                    dest_root.display()
                )));
            }
        }
    }
    Ok(path)
}

/// Remote key for a local file given its path relative to the upload root
pub fn remote_key_for_local_file(remote_prefix: &str, relative_path: &Path) -> String {
    let relative = relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}{}", folder_prefix(remote_prefix), relative)
}

fn to_slash(value: &str) -> String {
    value.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;
    use crate::traits::{EntryKind, ObjectRecord};

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new().with_page_size(2);
        store.insert("b", "fileY.txt", vec![0; 20]);
        store.insert("b", "fileX.txt", vec![0; 10]);
        store.insert("b", "folderB/one", vec![0; 1]);
        store.insert("b", "folderA/", Vec::new());
        store.insert("b", "folderA/two", vec![0; 2]);
        store.insert("b", "folderA/sub/three", vec![0; 3]);
        store
    }

    #[tokio::test]
    async fn test_folders_sort_before_files() {
        let store = seeded_store();
        let entries = list(&store, "b", "").await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(names, ["folderA", "folderB", "fileX.txt", "fileY.txt"]);
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[0].full_path.as_deref(), Some("folderA/"));
        assert_eq!(entries[2].size, Some(10));
        assert_eq!(entries[2].full_path.as_deref(), Some("fileX.txt"));
    }

    #[tokio::test]
    async fn test_listing_exhausts_pagination() {
        let store = seeded_store();
        let entries = list(&store, "b", "").await.unwrap();
        assert_eq!(entries.len(), 4);
        assert!(store.list_calls() > 1);
    }

    #[tokio::test]
    async fn test_folder_self_marker_is_suppressed() {
        let store = seeded_store();
        let entries = list(&store, "b", "folderA/").await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(names, ["sub", "two"]);
        assert_eq!(entries[0].full_path.as_deref(), Some("folderA/sub/"));
    }

    #[tokio::test]
    async fn test_listing_is_repeatable() {
        let store = seeded_store();
        let first = list(&store, "b", "").await.unwrap();
        let second = list(&store, "b", "").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_location_root_sorts_buckets() {
        let store = MemoryStore::new();
        store.insert("zeta", "k", Vec::new());
        store.insert("alpha", "k", Vec::new());

        let entries = list_location(&store, &Location::root()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert!(entries.iter().all(Entry::is_bucket));
    }

    #[tokio::test]
    async fn test_list_missing_bucket_fails() {
        let store = MemoryStore::new();
        let err = list(&store, "nope", "").await.unwrap_err();
        assert_eq!(err.store_kind(), Some(StoreErrorKind::NotFound));
    }

    #[test]
    fn test_entries_from_mixed_listing() {
        let listing = Listing {
            common_prefixes: vec!["b/".into(), "a/".into()],
            objects: vec![ObjectRecord::new("y", 2), ObjectRecord::new("x", 1)],
        };
        let entries = entries_from_listing("", &listing);
        let names: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(names, ["a", "b", "x", "y"]);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("a/b/"), "b");
        assert_eq!(last_segment("a/b/c.txt"), "c.txt");
        assert_eq!(last_segment("top"), "top");
        assert_eq!(last_segment("/"), "/");
        assert_eq!(last_segment("//"), "/");
    }

    #[test]
    fn test_local_download_path_strips_prefix() {
        assert_eq!(
            local_download_path("a/b/", Path::new("/tmp/x"), "a/b/c.txt").unwrap(),
            PathBuf::from("/tmp/x/c.txt")
        );
        assert_eq!(
            local_download_path("a/b", Path::new("/tmp/x"), "a/b/c/d.txt").unwrap(),
            Path::new("/tmp/x").join("c").join("d.txt")
        );
    }

    #[test]
    fn test_local_download_path_bucket_root() {
        assert_eq!(
            local_download_path("", Path::new("/tmp/x"), "file.txt").unwrap(),
            PathBuf::from("/tmp/x/file.txt")
        );
    }

    #[test]
    fn test_local_download_path_outside_prefix() {
        assert_eq!(
            local_download_path("a/", Path::new("/tmp/x"), "z/file.txt").unwrap(),
            Path::new("/tmp/x").join("z").join("file.txt")
        );
    }

    #[test]
    fn test_local_download_path_normalizes_backslashes() {
        assert_eq!(
            local_download_path("a\\b\\", Path::new("/tmp/x"), "a/b/c.txt").unwrap(),
            PathBuf::from("/tmp/x/c.txt")
        );
    }

    #[test]
    fn test_local_download_path_rejects_dot_segments() {
        let root = Path::new("/tmp/x");
        for key in ["docs/../../escaped.txt", "docs/./a.txt", "../a.txt", "a\\..\\..\\b"] {
            let err = local_download_path("docs/", root, key).unwrap_err();
            assert!(matches!(err, Error::InvalidPath(_)), "{key}: {err}");
        }
        assert_eq!(
            local_download_path("", root, "a..b/c.").unwrap(),
            root.join("a..b").join("c.")
        );
    }

    #[test]
    fn test_remote_key_for_local_file() {
        assert_eq!(
            remote_key_for_local_file("docs", Path::new("site/index.html")),
            "docs/site/index.html"
        );
        assert_eq!(
            remote_key_for_local_file("docs/", Path::new("a.txt")),
            "docs/a.txt"
        );
        assert_eq!(remote_key_for_local_file("", Path::new("a.txt")), "a.txt");
    }

    #[test]
    fn test_folder_prefix() {
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("a"), "a/");
        assert_eq!(folder_prefix("a/"), "a/");
    }
}
