//! Store-side disconnect detector
//!
//! Periodically reaps lapsed connection leases so that clients which
//! vanished without an explicit release still converge to offline. Runs
//! independently of any client's liveness.

use std::sync::Arc;
use std::time::Duration;

use discourse_core::PresenceStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic sweep task over a presence store
pub struct PresenceSweeper {
    store: Arc<dyn PresenceStore>,
    interval: Duration,
}

impl PresenceSweeper {
    /// Create a sweeper over the given store
    #[must_use]
    pub fn new(store: Arc<dyn PresenceStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Spawn the sweep loop as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                match self.store.sweep_expired().await {
                    Ok(users) if users.is_empty() => {}
                    Ok(users) => {
                        tracing::info!(
                            count = users.len(),
                            "Converged users with lapsed connections to offline"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Presence sweep failed");
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for PresenceSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSweeper")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
