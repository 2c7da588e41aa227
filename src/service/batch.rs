//! Handle on a background batch of provider calls.

use tokio::task::JoinHandle;

use crate::domain::RequestId;
use crate::error::SpawnerError;

/// Tally of a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Cards that ended `ready`.
    pub ready: usize,
    /// Cards that ended `error` or could not be recorded.
    pub failed: usize,
}

/// Background batch dispatched for one request.
///
/// Dropping the handle detaches the batch; it keeps running.
#[derive(Debug)]
pub struct BatchHandle {
    request_id: RequestId,
    task: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    pub(crate) const fn new(request_id: RequestId, task: JoinHandle<BatchOutcome>) -> Self {
        Self { request_id, task }
    }

    /// Request the batch works on.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns `true` once every card of the batch has resolved.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for every card of the batch to resolve.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Internal`] if the batch task panicked.
    pub async fn wait(self) -> Result<BatchOutcome, SpawnerError> {
        self.task
            .await
            .map_err(|e| SpawnerError::Internal(format!("batch for {} aborted: {e}", self.request_id)))
    }
}
