//! Transfer jobs
//!
//! A job moves a resolved set of objects between the store and local disk,
//! one object at a time, on its own task. Callers drive it through a
//! [`JobHandle`]: they read [`TransferEvent`]s, answer conflict prompts and
//! may cancel at any point.

mod download;
mod handle;
mod upload;


use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::cancel::CancelToken;
use crate::conflict::{ConflictDecision, ConflictMode};
use crate::error::Error;

pub use download::{DownloadPlan, resolve_targets};
pub use handle::{JobHandle, spawn_download, spawn_upload};
pub use upload::{UploadPlan, UploadTarget};

/// Default spacing between progress events for one object
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Cancelled,
    Failed,
    Completed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Failed | JobState::Completed
        )
    }
}

/// One object resolved for a download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferTarget {
    /// Full key from the bucket root
    pub remote_key: String,
    pub size: u64,
}

impl TransferTarget {
    pub fn new(remote_key: impl Into<String>, size: u64) -> Self {
        Self {
            remote_key: remote_key.into(),
            size,
        }
    }

    /// Zero-byte object standing in for a folder
    pub fn is_folder_marker(&self) -> bool {
        self.remote_key.ends_with('/')
    }
}

/// Snapshot of a running job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Bytes moved so far across the whole job
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    /// 1-based position of the current object
    pub index: usize,
    pub count: usize,
    pub remote_key: String,
    pub local_path: PathBuf,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.transferred_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// Events a job reports to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    Started {
        total_bytes: u64,
        object_count: usize,
    },
    Progress(Progress),
    /// The destination exists; the job waits for [`JobHandle::decide`]
    DecisionNeeded {
        remote_key: String,
        local_path: PathBuf,
    },
    Skipped {
        remote_key: String,
        local_path: PathBuf,
    },
    Completed {
        transferred_bytes: u64,
    },
    Cancelled {
        transferred_bytes: u64,
    },
    Failed {
        target: String,
        message: String,
    },
}

/// Knobs for a single job
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Initial conflict policy (downloads only)
    pub conflict_mode: ConflictMode,
    pub progress_interval: Duration,
    pub event_capacity: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            conflict_mode: ConflictMode::Ask,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl JobOptions {
    pub fn conflict_mode(mut self, mode: ConflictMode) -> Self {
        self.conflict_mode = mode;
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Final account of a job
#[derive(Debug)]
pub struct JobReport {
    pub state: JobState,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Objects written (downloads) or uploaded, folder markers excluded
    pub completed: usize,
    pub skipped: usize,
    pub error: Option<Error>,
}

impl JobReport {
    fn new(total_bytes: u64) -> Self {
        Self {
            state: JobState::Pending,
            total_bytes,
            transferred_bytes: 0,
            completed: 0,
            skipped: 0,
            error: None,
        }
    }
}

/// Job-side end of the caller channels
pub(crate) struct JobContext {
    events: mpsc::Sender<TransferEvent>,
    decisions: mpsc::UnboundedReceiver<ConflictDecision>,
    cancel: CancelToken,
    progress_interval: Duration,
}

impl JobContext {
    /// Deliver a lifecycle event, waiting for channel capacity
    ///
    /// Gives up once the job is cancelled or the caller dropped the stream.
    async fn emit(&self, event: TransferEvent) {
        tokio::select! {
            biased;
            _ = self.events.send(event) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Suspend until the caller answers a collision prompt
    ///
    /// Cancellation or a dropped handle count as [`ConflictDecision::Cancel`].
    async fn ask(&mut self, remote_key: &str, local_path: &std::path::Path) -> ConflictDecision {
        self.emit(TransferEvent::DecisionNeeded {
            remote_key: remote_key.to_string(),
            local_path: local_path.to_path_buf(),
        })
        .await;

        tokio::select! {
            _ = self.cancel.cancelled() => ConflictDecision::Cancel,
            decision = self.decisions.recv() => decision.unwrap_or(ConflictDecision::Cancel),
        }
    }

    /// Record a terminal state and announce it
    async fn finish(&self, mut report: JobReport, state: JobState) -> JobReport {
        report.state = state;
        let transferred_bytes = report.transferred_bytes;
        let event = match state {
            JobState::Completed => TransferEvent::Completed { transferred_bytes },
            JobState::Cancelled => TransferEvent::Cancelled { transferred_bytes },
            _ => {
                let (target, message) = match &report.error {
                    Some(Error::Transfer { target, source }) => {
                        (target.clone(), source.to_string())
                    }
                    Some(other) => (String::new(), other.to_string()),
                    None => (String::new(), "unknown failure".to_string()),
                };
                TransferEvent::Failed { target, message }
            }
        };
        // The terminal event goes out even after a cancel request.
        let _ = self.events.send(event).await;
        tracing::info!(
            ?state,
            transferred = report.transferred_bytes,
            total = report.total_bytes,
            completed = report.completed,
            skipped = report.skipped,
            "transfer job finished"
        );
        report
    }
}

/// Rate limiter for progress events
struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
