use parking_lot::Mutex;
use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;

/// Single-slot delayed job. Scheduling aborts whatever the slot held before,
/// including a job that has already started running.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` after `delay` unless rescheduled or cancelled first.
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }

    /// Abort the pending job. Returns whether one was still running.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.slot.get_mut().take() {
            handle.abort();
        }
    }
}
