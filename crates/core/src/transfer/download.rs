//! Download jobs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{JobContext, JobReport, JobState, Progress, Throttle, TransferEvent, TransferTarget};
use crate::conflict::{ConflictAction, ConflictMode, ConflictPolicy};
use crate::error::{Error, Result};
use crate::namespace::{folder_prefix, local_download_path};
use crate::path::Location;
use crate::traits::{Entry, EntryKind, ObjectStore};

/// Everything a download job needs, resolved before it starts
///
/// `total_bytes` and `object_count` are meant for a confirmation step.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub bucket: String,
    /// Prefix the local paths are made relative to
    pub base_prefix: String,
    pub dest_root: PathBuf,
    pub targets: Vec<TransferTarget>,
}

impl DownloadPlan {
    /// Resolve the objects behind a listed entry at `location`
    pub async fn resolve(
        store: &dyn ObjectStore,
        location: &Location,
        entry: &Entry,
        dest_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let bucket = location
            .bucket
            .clone()
            .ok_or_else(|| Error::InvalidPath("open a bucket before downloading".into()))?;
        let key = entry
            .full_path
            .clone()
            .unwrap_or_else(|| location.child_key(&entry.key));
        let targets = resolve_targets(store, &bucket, &key, entry.kind, entry.size).await?;

        Ok(Self {
            bucket,
            base_prefix: location.prefix.clone(),
            dest_root: dest_root.into(),
            targets,
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.targets.iter().map(|t| t.size).sum()
    }

    pub fn object_count(&self) -> usize {
        self.targets.len()
    }
}

/// Objects a selection expands to
///
/// A file is one target; a folder is every key under its prefix, in listing
/// order.
pub async fn resolve_targets(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    kind: EntryKind,
    size: Option<u64>,
) -> Result<Vec<TransferTarget>> {
    match kind {
        EntryKind::File => {
            let size = size
                .ok_or_else(|| Error::General(format!("file size is unknown for object {key}")))?;
            Ok(vec![TransferTarget::new(key, size)])
        }
        EntryKind::Folder => {
            let prefix = folder_prefix(key);
            let listing = store.list_all(bucket, &prefix, None).await?;
            Ok(listing
                .objects
                .into_iter()
                .map(|o| TransferTarget::new(o.key, o.size))
                .collect())
        }
        EntryKind::Bucket => Err(Error::InvalidPath(format!(
            "bucket {key} cannot be downloaded as a whole; open it and pick a folder"
        ))),
    }
}

enum Step {
    Transferred(u64),
    Directory,
    Skipped,
    Aborted,
}

pub(crate) async fn run(
    store: Arc<dyn ObjectStore>,
    plan: DownloadPlan,
    mode: ConflictMode,
    mut ctx: JobContext,
) -> JobReport {
    let mut report = JobReport::new(plan.total_bytes());
    let mut policy = ConflictPolicy::new(mode);
    let count = plan.object_count();

    report.state = JobState::Running;
    tracing::info!(
        bucket = %plan.bucket,
        objects = count,
        total = report.total_bytes,
        dest = %plan.dest_root.display(),
        "download started"
    );
    ctx.emit(TransferEvent::Started {
        total_bytes: report.total_bytes,
        object_count: count,
    })
    .await;

    for (i, target) in plan.targets.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return ctx.finish(report, JobState::Cancelled).await;
        }

        let resolved = local_download_path(&plan.base_prefix, &plan.dest_root, &target.remote_key);
        let path = match resolved {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(key = %target.remote_key, error = %e, "unsafe object key");
                report.error = Some(Error::transfer(target.remote_key.clone(), e));
                return ctx.finish(report, JobState::Failed).await;
            }
        };
        tracing::debug!(key = %target.remote_key, path = %path.display(), "downloading");

        let step = download_one(
            store.as_ref(),
            &plan.bucket,
            target,
            &path,
            (i + 1, count),
            &report,
            &mut policy,
            &mut ctx,
        )
        .await;

        match step {
            Ok(Step::Transferred(bytes)) => {
                report.transferred_bytes += bytes;
                report.completed += 1;
                ctx.emit(TransferEvent::Progress(Progress {
                    transferred_bytes: report.transferred_bytes,
                    total_bytes: report.total_bytes,
                    index: i + 1,
                    count,
                    remote_key: target.remote_key.clone(),
                    local_path: path,
                }))
                .await;
            }
            Ok(Step::Directory) => {}
            Ok(Step::Skipped) => {
                tracing::debug!(path = %path.display(), "existing file skipped");
                report.skipped += 1;
                ctx.emit(TransferEvent::Skipped {
                    remote_key: target.remote_key.clone(),
                    local_path: path,
                })
                .await;
            }
            Ok(Step::Aborted) => return ctx.finish(report, JobState::Cancelled).await,
            Err(e) if e.is_cancelled() => {
                return ctx.finish(report, JobState::Cancelled).await;
            }
            Err(e) => {
                tracing::warn!(key = %target.remote_key, error = %e, "download failed");
                report.error = Some(Error::transfer(target.remote_key.clone(), e));
                return ctx.finish(report, JobState::Failed).await;
            }
        }
    }

    ctx.finish(report, JobState::Completed).await
}

#[allow(clippy::too_many_arguments)]
async fn download_one(
    store: &dyn ObjectStore,
    bucket: &str,
    target: &TransferTarget,
    path: &Path,
    (index, count): (usize, usize),
    report: &JobReport,
    policy: &mut ConflictPolicy,
    ctx: &mut JobContext,
) -> Result<Step> {
    if target.is_folder_marker() {
        fs::create_dir_all(path)
            .await
            .map_err(|e| Error::local(path, e))?;
        return Ok(Step::Directory);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::local(parent, e))?;
    }

    let file = match create_exclusive(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let action = match policy.automatic() {
                Some(action) => action,
                None => {
                    let decision = ctx.ask(&target.remote_key, path).await;
                    policy.apply(decision)
                }
            };
            match action {
                ConflictAction::Skip => return Ok(Step::Skipped),
                ConflictAction::Abort => return Ok(Step::Aborted),
                ConflictAction::Overwrite => {
                    fs::remove_file(path)
                        .await
                        .map_err(|e| Error::local(path, e))?;
                    create_exclusive(path)
                        .await
                        .map_err(|e| Error::local(path, e))?
                }
            }
        }
        Err(e) => return Err(Error::local(path, e)),
    };

    let base = report.transferred_bytes;
    let total = report.total_bytes;
    let events = ctx.events.clone();
    let mut throttle = Throttle::new(ctx.progress_interval);
    let mut on_bytes = |written: u64| {
        if throttle.ready() {
            let _ = events.try_send(TransferEvent::Progress(Progress {
                transferred_bytes: base + written,
                total_bytes: total,
                index,
                count,
                remote_key: target.remote_key.clone(),
                local_path: path.to_path_buf(),
            }));
        }
    };

    let mut writer = BufWriter::new(file);
    let result = match store
        .get_object(bucket, &target.remote_key, &mut writer, &mut on_bytes, &ctx.cancel)
        .await
    {
        Ok(written) => writer
            .flush()
            .await
            .map(|_| written)
            .map_err(|e| Error::local(path, e)),
        Err(e) => Err(e),
    };
    drop(writer);

    match result {
        Ok(written) => Ok(Step::Transferred(written)),
        Err(e) => {
            // The partial file of the interrupted object never survives.
            if let Err(rm) = fs::remove_file(path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %rm,
                    "could not remove partial download"
                );
            }
            Err(e)
        }
    }
}

/// Create a file, failing if anything already exists at `path`
async fn create_exclusive(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}
