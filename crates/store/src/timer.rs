//! Cancellable scheduled tasks
//!
//! A [`ScheduledTask`] owns at most one pending tokio task. Scheduling again
//! aborts the previous task, and dropping the handle aborts it too, so a
//! timer can never fire into a disposed owner.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Single active timer for one role (e.g. form debounce, autosave delay)
#[derive(Debug)]
pub struct ScheduledTask {
    role: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn new(role: &'static str) -> Self {
        Self { role, handle: None }
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    /// Deliver `event` on `sender` after `delay`, replacing any pending task
    pub fn schedule<E>(&mut self, delay: Duration, sender: UnboundedSender<E>, event: E)
    where
        E: Send + 'static,
    {
        self.cancel();
        tracing::trace!(role = self.role, delay_ms = delay.as_millis() as u64, "timer armed");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once the owner shut down.
            let _ = sender.send(event);
        }));
    }

    /// Abort the pending task, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                tracing::trace!(role = self.role, "timer cancelled");
            }
            handle.abort();
        }
    }

    /// Whether a task is scheduled and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
