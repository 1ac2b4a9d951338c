//! In-process shutdown trigger.

use tokio::sync::broadcast;

/// Broadcasts a single shutdown signal to every subscribed server.
///
/// Ctrl+C is handled by the server itself; this exists so embedding code and
/// tests can stop a server without signals.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. No-op when nothing is subscribed.
    pub fn trigger(&self) {
        let receivers = self.tx.send(()).unwrap_or(0);
        tracing::debug!(receivers, "Shutdown triggered");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
