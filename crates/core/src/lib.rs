//! nav-core: namespace and transfer engine for s3nav
//!
//! This crate provides:
//! - Namespace mapping between flat object keys and a Bucket/Folder/File tree
//! - The `ObjectStore` trait every storage backend implements
//! - Download and upload jobs with progress, conflict prompts and cancellation
//! - Profile and configuration management
//!
//! Nothing here depends on a specific S3 SDK; `nav-s3` provides the AWS SDK
//! backend.

pub mod cancel;
pub mod config;
pub mod conflict;
pub mod error;
pub mod namespace;
pub mod path;
pub mod profile;
pub mod remove;
pub mod traits;
pub mod transfer;

#[cfg(test)]
mod test_support;

pub use cancel::CancelToken;
pub use config::{Config, ConfigManager, Defaults};
pub use conflict::{ConflictAction, ConflictDecision, ConflictMode, ConflictPolicy};
pub use error::{Error, Result, StoreErrorKind};
pub use path::{Location, RemotePath, parse_remote};
pub use profile::{Profile, ProfileManager};
pub use remove::{MAX_DELETE_BATCH, delete_entry, delete_keys};
pub use traits::{
    Entry, EntryKind, ListPage, ListRequest, Listing, ObjectReader, ObjectRecord, ObjectStore,
};
pub use transfer::{
    DownloadPlan, JobHandle, JobOptions, JobReport, JobState, Progress, TransferEvent,
    TransferTarget, UploadPlan, UploadTarget, spawn_download, spawn_upload,
};
