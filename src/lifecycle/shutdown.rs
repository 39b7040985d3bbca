//! Shutdown coordination for the gateway.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Coordinator for graceful shutdown.
///
/// Holds a watch channel that flips from "armed" to "fired" exactly once and
/// remembers the instant it fired. Observers that subscribe or check after
/// the fact still see the fired state.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<Option<Instant>>,
}

impl Shutdown {
    /// Create a new, armed shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Get an observer handle for the shutdown signal.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    ///
    /// Only the first call has an effect; returns `true` for that call.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|fired_at| {
            if fired_at.is_some() {
                return false;
            }
            *fired_at = Some(Instant::now());
            true
        })
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// When shutdown was requested, if it has been.
    pub fn fired_at(&self) -> Option<Instant> {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of [`Shutdown`].
///
/// Cheap to clone; every clone sees the same state.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<Instant>>,
}

impl ShutdownSignal {
    /// Non-blocking check.
    pub fn is_fired(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The instant shutdown was requested, if it has been.
    pub fn fired_at(&self) -> Option<Instant> {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested and return when it happened.
    ///
    /// Resolves immediately if it already fired. If the coordinator is
    /// dropped without firing, this never resolves.
    pub async fn fired(&self) -> Instant {
        let mut rx = self.rx.clone();
        let fired_at = match rx.wait_for(Option::is_some).await {
            Ok(fired_at) => *fired_at,
            Err(_) => None,
        };
        match fired_at {
            Some(at) => at,
            None => std::future::pending().await,
        }
    }

    /// Wait until `grace` has elapsed since shutdown was requested.
    pub async fn deadline(&self, grace: Duration) {
        let fired_at = self.fired().await;
        tokio::time::sleep_until(fired_at + grace).await;
    }
}
