//! One-shot gate releasing waiting sessions once the match is full

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{error::Elapsed, timeout};

/// Opens exactly once and never closes again.
///
/// Backed by a `watch` channel so any number of sessions can suspend on it
/// and all of them observe the single transition to open.
#[derive(Debug)]
pub struct MatchGate {
    open_tx: watch::Sender<bool>,
}

impl MatchGate {
    pub fn new() -> Self {
        let (open_tx, _) = watch::channel(false);
        Self { open_tx }
    }

    /// Opens the gate. Returns true only for the call that actually opened it.
    pub fn open(&self) -> bool {
        self.open_tx.send_if_modified(|open| {
            if *open {
                false
            } else {
                *open = true;
                true
            }
        })
    }

    pub fn is_open(&self) -> bool {
        *self.open_tx.borrow()
    }

    /// Suspends until the gate is open. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut open_rx = self.open_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = open_rx.wait_for(|open| *open).await;
    }

    /// Like [`MatchGate::wait`], bounded by `limit` when one is given.
    pub async fn wait_timeout(&self, limit: Option<Duration>) -> Result<(), Elapsed> {
        match limit {
            Some(limit) => timeout(limit, self.wait()).await,
            None => {
                self.wait().await;
                Ok(())
            }
        }
    }
}

impl Default for MatchGate {
    fn default() -> Self {
        Self::new()
    }
}
