//! Client-side navigation: route table, guard and router.
//!
//! SYSTEM CONTEXT
//! ==============
//! `routes` resolves a path to its record and effective `requires_auth`,
//! `guard` decides proceed vs redirect against the session, and `router`
//! owns the current location and is the app's [`NavigationSink`].

pub mod guard;
pub mod router;
pub mod routes;

/// Something that can be asked to move the app to `route`.
///
/// Requesting the route the app is already on must be a no-op.
pub trait NavigationSink: Send + Sync {
    fn request_navigation(&self, route: &str);
}
