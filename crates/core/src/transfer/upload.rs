//! Upload jobs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::{JobContext, JobReport, JobState, Progress, Throttle, TransferEvent};
use crate::error::{Error, Result};
use crate::namespace::{folder_prefix, remote_key_for_local_file};
use crate::traits::ObjectStore;

/// One local file and the key it uploads to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size: u64,
}

/// Files and folder markers an upload creates, in upload order
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub bucket: String,
    pub files: Vec<UploadTarget>,
    /// Keys (ending in `/`) for directories without any file below them
    pub folder_markers: Vec<String>,
}

impl UploadPlan {
    /// Walk `source` and map it under `prefix` in `bucket`
    ///
    /// A file uploads to `prefix + name`. A directory keeps its own name, so
    /// `photos/` uploaded to `backup/` lands under `backup/photos/`. Local
    /// paths in the plan are absolute.
    pub fn resolve(bucket: impl Into<String>, source: &Path, prefix: &str) -> Result<Self> {
        let source = &fs::canonicalize(source).map_err(|e| Error::local(source, e))?;
        let meta = fs::metadata(source).map_err(|e| Error::local(source, e))?;
        let mut plan = Self {
            bucket: bucket.into(),
            files: Vec::new(),
            folder_markers: Vec::new(),
        };

        let base = source.parent().unwrap_or_else(|| Path::new(""));
        if meta.is_file() {
            let name = source.file_name().ok_or_else(|| {
                Error::InvalidPath(format!("{} has no file name", source.display()))
            })?;
            plan.files.push(UploadTarget {
                local_path: source.to_path_buf(),
                remote_key: remote_key_for_local_file(prefix, Path::new(name)),
                size: meta.len(),
            });
        } else if meta.is_dir() {
            walk_dir(source, base, prefix, &mut plan)?;
        } else {
            return Err(Error::InvalidPath(format!(
                "{} is neither a file nor a directory",
                source.display()
            )));
        }

        Ok(plan)
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Number of files, folder markers excluded
    pub fn object_count(&self) -> usize {
        self.files.len()
    }
}

/// Collect files under `dir` in name order
///
/// Returns whether any file was found; directories without one get a folder
/// marker.
fn walk_dir(dir: &Path, base: &Path, prefix: &str, plan: &mut UploadPlan) -> Result<bool> {
    let mut children = fs::read_dir(dir)
        .map_err(|e| Error::local(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::local(dir, e))?;
    children.sort();

    let mut has_files = false;
    for path in children {
        let meta = fs::metadata(&path).map_err(|e| Error::local(&path, e))?;
        if meta.is_dir() {
            has_files |= walk_dir(&path, base, prefix, plan)?;
        } else if meta.is_file() {
            has_files = true;
            plan.files.push(UploadTarget {
                remote_key: remote_key_for_local_file(prefix, relative(&path, base)),
                local_path: path,
                size: meta.len(),
            });
        }
    }

    if !has_files {
        let key = folder_prefix(&remote_key_for_local_file(prefix, relative(dir, base)));
        plan.folder_markers.push(key);
    }
    Ok(has_files)
}

fn relative<'a>(path: &'a Path, base: &Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}

pub(crate) async fn run(
    store: Arc<dyn ObjectStore>,
    plan: UploadPlan,
    ctx: JobContext,
) -> JobReport {
    let mut report = JobReport::new(plan.total_bytes());
    let count = plan.object_count();

    report.state = JobState::Running;
    tracing::info!(
        bucket = %plan.bucket,
        files = count,
        markers = plan.folder_markers.len(),
        total = report.total_bytes,
        "upload started"
    );
    ctx.emit(TransferEvent::Started {
        total_bytes: report.total_bytes,
        object_count: count,
    })
    .await;

    for key in &plan.folder_markers {
        if ctx.cancel.is_cancelled() {
            return ctx.finish(report, JobState::Cancelled).await;
        }
        tracing::debug!(key = %key, "creating folder marker");
        if let Err(e) = store.create_folder_marker(&plan.bucket, key).await {
            report.error = Some(Error::transfer(key.clone(), e));
            return ctx.finish(report, JobState::Failed).await;
        }
    }

    for (i, file) in plan.files.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return ctx.finish(report, JobState::Cancelled).await;
        }
        tracing::debug!(path = %file.local_path.display(), key = %file.remote_key, "uploading");

        match upload_one(store.as_ref(), &plan.bucket, file, (i + 1, count), &report, &ctx).await {
            Ok(()) => {
                report.transferred_bytes += file.size;
                report.completed += 1;
                ctx.emit(TransferEvent::Progress(Progress {
                    transferred_bytes: report.transferred_bytes,
                    total_bytes: report.total_bytes,
                    index: i + 1,
                    count,
                    remote_key: file.remote_key.clone(),
                    local_path: file.local_path.clone(),
                }))
                .await;
            }
            Err(e) if e.is_cancelled() => {
                return ctx.finish(report, JobState::Cancelled).await;
            }
            Err(e) => {
                tracing::warn!(path = %file.local_path.display(), error = %e, "upload failed");
                report.error = Some(Error::transfer(file.local_path.display().to_string(), e));
                return ctx.finish(report, JobState::Failed).await;
            }
        }
    }

    ctx.finish(report, JobState::Completed).await
}

async fn upload_one(
    store: &dyn ObjectStore,
    bucket: &str,
    file: &UploadTarget,
    (index, count): (usize, usize),
    report: &JobReport,
    ctx: &JobContext,
) -> Result<()> {
    let body = tokio::fs::File::open(&file.local_path)
        .await
        .map_err(|e| Error::local(&file.local_path, e))?;

    let base = report.transferred_bytes;
    let total = report.total_bytes;
    let events = ctx.events.clone();
    let mut throttle = Throttle::new(ctx.progress_interval);
    let mut on_bytes = |sent: u64| {
        if throttle.ready() {
            let _ = events.try_send(TransferEvent::Progress(Progress {
                transferred_bytes: base + sent.min(file.size),
                total_bytes: total,
                index,
                count,
                remote_key: file.remote_key.clone(),
                local_path: file.local_path.clone(),
            }));
        }
    };

    store
        .put_object(
            bucket,
            &file.remote_key,
            Box::new(body),
            file.size,
            &mut on_bytes,
            &ctx.cancel,
        )
        .await
}
