//! Caller side of a running job

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{DownloadPlan, JobContext, JobOptions, JobReport, TransferEvent, UploadPlan};
use crate::cancel::CancelToken;
use crate::conflict::ConflictDecision;
use crate::error::{Error, Result};
use crate::traits::ObjectStore;

/// Handle to a job running on its own task
///
/// Dropping the handle does not stop the job; call [`JobHandle::cancel`] for
/// that. A job waiting on a conflict prompt treats a dropped handle as
/// [`ConflictDecision::Cancel`].
pub struct JobHandle {
    events: mpsc::Receiver<TransferEvent>,
    decisions: mpsc::UnboundedSender<ConflictDecision>,
    cancel: CancelToken,
    task: JoinHandle<JobReport>,
}

impl JobHandle {
    fn spawn<F, Fut>(options: &JobOptions, run: F) -> Self
    where
        F: FnOnce(JobContext) -> Fut,
        Fut: std::future::Future<Output = JobReport> + Send + 'static,
    {
        let (event_tx, events) = mpsc::channel(options.event_capacity.max(1));
        let (decisions, decision_rx) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();

        let ctx = JobContext {
            events: event_tx,
            decisions: decision_rx,
            cancel: cancel.clone(),
            progress_interval: options.progress_interval,
        };
        let task = tokio::spawn(run(ctx));

        Self {
            events,
            decisions,
            cancel,
            task,
        }
    }

    /// Next event, or None once the job has finished and the stream drained
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// Answer the pending [`TransferEvent::DecisionNeeded`]
    pub fn decide(&self, decision: ConflictDecision) -> Result<()> {
        self.decisions
            .send(decision)
            .map_err(|_| Error::General("transfer job is no longer running".into()))
    }

    /// Request cancellation; the job stops at its next check point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this job, for wiring into signal handlers
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the job to finish, discarding any unread events
    pub async fn wait(self) -> Result<JobReport> {
        let Self {
            events,
            decisions,
            task,
            ..
        } = self;
        drop(events);
        drop(decisions);
        task.await
            .map_err(|e| Error::General(format!("transfer task failed: {e}")))
    }
}

/// Start downloading `plan` from `store`
pub fn spawn_download(
    store: Arc<dyn ObjectStore>,
    plan: DownloadPlan,
    options: JobOptions,
) -> JobHandle {
    let mode = options.conflict_mode;
    JobHandle::spawn(&options, move |ctx| super::download::run(store, plan, mode, ctx))
}

/// Start uploading `plan` to `store`
pub fn spawn_upload(
    store: Arc<dyn ObjectStore>,
    plan: UploadPlan,
    options: JobOptions,
) -> JobHandle {
    JobHandle::spawn(&options, move |ctx| super::upload::run(store, plan, ctx))
}
