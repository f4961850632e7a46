//! Session lifecycle events.
//!
//! The networking layer never talks to the router. It publishes here, and
//! `app::AppShell` turns events into navigation requests.

use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login completed and the session now holds credentials.
    SignedIn { username: String },
    /// The user asked to sign out.
    SignedOut,
    /// The backend rejected our credentials (HTTP 401).
    Invalidated,
}

#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionEvents {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Publishing with nobody listening is
    /// not an error.
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;
