//! Path parsing and navigation state
//!
//! Remote arguments have the format `profile/bucket[/key]`. A [`Location`] is
//! the bucket and prefix a caller is looking at; it is passed explicitly into
//! every listing and transfer call instead of living in a global cursor.

use crate::error::{Error, Result};
use crate::traits::{Entry, EntryKind};

/// A parsed remote path pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Profile name
    pub profile: String,
    /// Bucket name (empty when only the profile was given)
    pub bucket: String,
    /// Object key or prefix (empty for bucket root)
    pub key: String,
}

impl RemotePath {
    pub fn new(
        profile: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            profile: profile.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether the key has directory semantics
    pub fn is_dir(&self) -> bool {
        self.key.is_empty() || self.key.ends_with('/')
    }

    /// Location of the folder this path points into
    ///
    /// For `p/b/a/c.txt` that is `(b)/a/`; for `p/b/a/` it is the folder itself.
    pub fn location(&self) -> Location {
        if self.bucket.is_empty() {
            return Location::root();
        }
        let prefix = if self.is_dir() {
            self.key.clone()
        } else {
            match self.key.rfind('/') {
                Some(pos) => self.key[..=pos].to_string(),
                None => String::new(),
            }
        };
        Location {
            bucket: Some(self.bucket.clone()),
            prefix,
        }
    }

    /// Last segment of the key, without a trailing slash
    pub fn name(&self) -> &str {
        self.key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.bucket.is_empty(), self.key.is_empty()) {
            (true, _) => write!(f, "{}/", self.profile),
            (false, true) => write!(f, "{}/{}", self.profile, self.bucket),
            (false, false) => write!(f, "{}/{}/{}", self.profile, self.bucket, self.key),
        }
    }
}

/// Parse a `profile[/bucket[/key]]` argument
pub fn parse_remote(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let parts: Vec<&str> = path.splitn(3, '/').collect();
    let profile = parts[0];
    if !is_valid_profile_name(profile) {
        return Err(Error::InvalidPath(format!(
            "'{path}' does not start with a profile name. Use format: profile/bucket[/key]"
        )));
    }

    let bucket = parts.get(1).copied().unwrap_or_default();
    let key = parts.get(2).copied().unwrap_or_default();
    if bucket.is_empty() && !key.is_empty() {
        return Err(Error::InvalidPath("Bucket name cannot be empty".into()));
    }

    Ok(RemotePath::new(profile, bucket, key))
}

/// Check if a string is a valid profile name
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Where a caller currently is in the namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Bucket being browsed; None at the bucket list
    pub bucket: Option<String>,
    /// Folder prefix inside the bucket, empty or ending in `/`
    pub prefix: String,
}

impl Location {
    /// The bucket list
    pub fn root() -> Self {
        Self::default()
    }

    /// Root folder of a bucket
    pub fn in_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            prefix: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.bucket.is_none()
    }

    /// Descend into a bucket or folder entry
    ///
    /// Files are not navigable and leave the location unchanged.
    pub fn enter(&self, entry: &Entry) -> Self {
        match entry.kind {
            EntryKind::Bucket => Self::in_bucket(entry.key.clone()),
            EntryKind::Folder => Self {
                bucket: self.bucket.clone(),
                prefix: entry
                    .full_path
                    .clone()
                    .unwrap_or_else(|| format!("{}{}/", self.prefix, entry.key)),
            },
            EntryKind::File => self.clone(),
        }
    }

    /// One level up; a bucket root goes back to the bucket list
    pub fn up(&self) -> Self {
        if self.prefix.is_empty() {
            return Self::root();
        }
        let trimmed = self.prefix.trim_end_matches('/');
        let prefix = match trimmed.rfind('/') {
            Some(pos) => trimmed[..=pos].to_string(),
            None => String::new(),
        };
        Self {
            bucket: self.bucket.clone(),
            prefix,
        }
    }

    /// Full key of a child named `name` in this location
    pub fn child_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bucket {
            None => write!(f, "(buckets)"),
            Some(bucket) => write!(f, "({bucket})/{}", self.prefix),
        }
    }
}
