//! Navigation guard.
//!
//! One verdict per navigation attempt: proceed, or redirect to login when a
//! protected route is requested without a session. The login route itself
//! always proceeds so a cleared session can never loop on it.

use std::sync::Arc;

use super::routes::{RouteMatch, RouteTable, normalize_path};
use crate::session::SessionStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Redirect(String),
}

#[derive(Clone, Debug)]
pub struct NavigationGuard {
    session: SessionStore,
    routes: Arc<RouteTable>,
    login_route: String,
}

impl NavigationGuard {
    pub fn new(session: SessionStore, routes: Arc<RouteTable>, login_route: &str) -> Self {
        Self { session, routes, login_route: normalize_path(login_route) }
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide whether navigating to `to` may proceed.
    #[must_use]
    pub fn evaluate(&self, to: &str) -> Verdict {
        let path = normalize_path(to);
        if path == self.login_route {
            return Verdict::Proceed;
        }
        match self.routes.resolve(&path) {
            Some(target) => self.evaluate_match(&target),
            None => Verdict::Proceed,
        }
    }

    /// Same as [`Self::evaluate`] for an already resolved route.
    #[must_use]
    pub fn evaluate_match(&self, target: &RouteMatch) -> Verdict {
        if target.path == self.login_route || !target.requires_auth {
            return Verdict::Proceed;
        }
        if self.session.is_authenticated() {
            return Verdict::Proceed;
        }
        tracing::debug!(path = %target.path, "protected route without session; redirecting to login");
        Verdict::Redirect(self.login_route.clone())
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;
