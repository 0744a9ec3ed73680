use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A one-shot delayed action that can be cancelled before it fires.
///
/// Dropping the handle detaches the task rather than cancelling it; call
/// [`ReshieldHandle::cancel`] to stop it.
#[derive(Debug)]
pub struct ReshieldHandle {
    task: JoinHandle<()>,
}

impl ReshieldHandle {
    /// Run `action` after `delay` on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn schedule<F>(delay: Duration, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
