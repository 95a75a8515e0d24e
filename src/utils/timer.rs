//! Cancellable timer handles
//!
//! The duration cap and the grant countdown are independent timers that must
//! be disarmed on every terminal transition. Wrapping the spawned task in a
//! handle that aborts on disarm (and on drop) keeps teardown deterministic.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a spawned timer task. Aborting the handle disarms the timer;
/// dropping it does the same.
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Arm a one-shot timer that runs `action` after `delay`.
    pub fn once<F>(delay: Duration, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        Self { handle }
    }

    /// Arm a repeating timer that runs `tick` every `period` until the
    /// callback returns `false` or the handle is disarmed.
    ///
    /// The first tick fires one full period after arming.
    pub fn repeating<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // interval's first tick completes immediately; skip it
            interval.tick().await;
            loop {
                interval.tick().await;
                if !tick().await {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Disarm the timer. Safe to call after the timer has fired.
    pub fn disarm(&self) {
        self.handle.abort();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
