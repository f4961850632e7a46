//! Router: owns the current location and applies guard verdicts.

use std::sync::{Mutex, PoisonError};

use super::NavigationSink;
use super::guard::{NavigationGuard, Verdict};
use super::routes::normalize_path;

/// Result of one navigation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Moved to the requested path.
    Committed(String),
    /// The guard sent us somewhere else.
    Redirected { requested: String, to: String },
    /// Already there; nothing happened.
    Unchanged(String),
}

impl Navigation {
    /// Where the app ended up.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Committed(path) | Self::Unchanged(path) => path,
            Self::Redirected { to, .. } => to,
        }
    }
}

#[derive(Debug, Default)]
struct RouterState {
    current: Option<String>,
    history: Vec<String>,
}

#[derive(Debug)]
pub struct Router {
    guard: NavigationGuard,
    state: Mutex<RouterState>,
}

impl Router {
    #[must_use]
    pub fn new(guard: NavigationGuard) -> Self {
        Self { guard, state: Mutex::new(RouterState::default()) }
    }

    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Current location; `None` before the first navigation.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).current.clone()
    }

    /// Every committed location, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).history.clone()
    }

    /// Run the guard for `to` and move to wherever it allows.
    pub fn navigate(&self, to: &str) -> Navigation {
        let requested = normalize_path(to);
        let destination = match self.guard.evaluate(&requested) {
            Verdict::Proceed => requested.clone(),
            Verdict::Redirect(target) => target,
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.current.as_deref() == Some(destination.as_str()) {
            return Navigation::Unchanged(destination);
        }
        state.current = Some(destination.clone());
        state.history.push(destination.clone());
        drop(state);

        if destination == requested {
            tracing::debug!(to = %destination, "navigation committed");
            Navigation::Committed(destination)
        } else {
            tracing::info!(%requested, to = %destination, "navigation redirected");
            Navigation::Redirected { requested, to: destination }
        }
    }
}

impl NavigationSink for Router {
    fn request_navigation(&self, route: &str) {
        let _ = self.navigate(route);
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;
