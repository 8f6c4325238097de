//! Pause and cancellation signals shared with in-flight tasks
//!
//! The session controller owns a [`RunControl`] and is the only writer. Every
//! task receives a [`RunSignals`] clone, which can observe but never change the
//! flags.
//!
//! Pause is a `watch` channel so a waiting task wakes the moment the run is
//! resumed. Cancellation is a `CancellationToken`; every wait races it and the
//! token always wins, including in the middle of a pause.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Writer side of the run signals, held by the session controller
#[derive(Debug)]
pub struct RunControl {
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl RunControl {
    /// Fresh signals: not paused, not cancelled
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            paused,
            cancel: CancellationToken::new(),
        }
    }

    /// Read-only handle for the scheduler and its tasks
    pub fn signals(&self) -> RunSignals {
        RunSignals {
            paused: self.paused.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    /// Set or clear the global pause flag
    pub fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }

    /// Flag cancellation; irreversible for this run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the run signals
#[derive(Debug, Clone)]
pub struct RunSignals {
    paused: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl RunSignals {
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for `delay` unless cancelled first
    ///
    /// Returns `true` when the full delay elapsed and the run is still live.
    pub async fn sleep(&self, delay: std::time::Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.is_cancelled(),
        }
    }

    /// Wait while the run is paused
    ///
    /// Returns immediately when not paused. Returns `false` as soon as
    /// cancellation is flagged, whether or not the run was paused.
    pub async fn wait_while_paused(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            resumed = self.paused.wait_for(|paused| !*paused) => {
                // A closed channel means the controller is gone; treat as cancelled.
                resumed.is_ok() && !cancel.is_cancelled()
            }
        }
    }
}
