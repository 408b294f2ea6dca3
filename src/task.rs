//! Background work with cancellation and progress
//!
//! Scans and batches run on tokio's blocking pool. Progress flows back to
//! the caller over a channel, so the caller's thread is the only one that
//! observes it.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Sending half of a task's progress channel
#[derive(Debug, Clone)]
pub struct ProgressSink<P> {
    tx: UnboundedSender<P>,
}

impl<P> ProgressSink<P> {
    /// Report progress. A caller that stopped listening is not an error.
    pub fn send(&self, update: P) {
        let _ = self.tx.send(update);
    }
}

/// Handle to an in-flight background job
#[derive(Debug)]
pub struct TaskHandle<P, T> {
    cancel: CancellationToken,
    progress: UnboundedReceiver<P>,
    join: JoinHandle<T>,
}

impl<P, T> TaskHandle<P, T> {
    /// Ask the job to stop before its next file
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress update, or `None` once the job has finished
    pub async fn next_progress(&mut self) -> Option<P> {
        self.progress.recv().await
    }

    /// Wait for the job's result
    pub async fn finish(self) -> Result<T, TaskError> {
        self.join
            .await
            .map_err(|e| TaskError::Join(e.to_string()))
    }
}

/// Spawn `job` on the blocking pool. `cancel` is handed to the job and kept
/// by the returned handle.
///
/// Must be called from within a tokio runtime.
pub fn spawn<P, T, F>(cancel: CancellationToken, job: F) -> TaskHandle<P, T>
where
    F: FnOnce(CancellationToken, ProgressSink<P>) -> T + Send + 'static,
    P: Send + 'static,
    T: Send + 'static,
{
    let (tx, progress) = mpsc::unbounded_channel();
    let token = cancel.clone();

    let join = tokio::task::spawn_blocking(move || job(token, ProgressSink { tx }));

    TaskHandle {
        cancel,
        progress,
        join,
    }
}
