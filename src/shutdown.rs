//! Cooperative shutdown signal for the control loops

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Receiving side of the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending side of the shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a connected trigger/receiver pair
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `period` unless shutdown is requested first.
    ///
    /// Returns `true` when the sleep was cut short by a shutdown request.
    pub async fn sleep(&mut self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        loop {
            if self.is_requested() {
                return true;
            }
            tokio::select! {
                _ = sleep_until(deadline) => return false,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // Trigger is gone; nothing can interrupt us any more
                        sleep_until(deadline).await;
                        return false;
                    }
                }
            }
        }
    }
}
