//! Application wiring.
//!
//! SYSTEM CONTEXT
//! ==============
//! `App` builds the object graph once: session store over the durable
//! mirror, HTTP pipeline, route table, guard, router and auth client.
//! `AppShell` is the only place that connects session events to navigation,
//! so the networking layer never holds a router handle.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::auth::AuthClient;
use crate::config::ClientConfig;
use crate::events::{SessionEvent, SessionEvents};
use crate::nav::NavigationSink;
use crate::nav::guard::NavigationGuard;
use crate::nav::router::Router;
use crate::nav::routes::RouteTable;
use crate::net::classify::ErrorClassifier;
use crate::net::messages::Notifier;
use crate::net::pipeline::HttpPipeline;
use crate::net::transport::{HttpTransport, Transport, TransportError};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;

// =============================================================================
// SHELL
// =============================================================================

/// Turns session events into navigation requests.
pub struct AppShell {
    sink: Arc<dyn NavigationSink>,
    session: SessionStore,
    login_route: String,
    home_route: String,
    rx: broadcast::Receiver<SessionEvent>,
}

impl std::fmt::Debug for AppShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppShell")
            .field("login_route", &self.login_route)
            .field("home_route", &self.home_route)
            .finish_non_exhaustive()
    }
}

impl AppShell {
    #[must_use]
    pub fn new(
        sink: Arc<dyn NavigationSink>,
        session: SessionStore,
        events: &SessionEvents,
        login_route: &str,
        home_route: &str,
    ) -> Self {
        Self {
            sink,
            session,
            login_route: login_route.to_owned(),
            home_route: home_route.to_owned(),
            rx: events.subscribe(),
        }
    }

    pub fn handle(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Invalidated | SessionEvent::SignedOut => {
                self.sink.request_navigation(&self.login_route);
            }
            SessionEvent::SignedIn { username } => {
                tracing::debug!(%username, "signed in; going home");
                self.sink.request_navigation(&self.home_route);
            }
        }
    }

    /// Handle every event already queued without waiting. Returns how many
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.handle(&event);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => self.resync(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return handled,
            }
        }
    }

    /// Handle events until every publisher is gone.
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(event) => self.handle(&event),
                Err(RecvError::Lagged(skipped)) => self.resync(skipped),
                Err(RecvError::Closed) => {
                    tracing::debug!("session event channel closed; shell stopping");
                    return;
                }
            }
        }
    }

    // Missed events can only be reconstructed from current state.
    fn resync(&self, skipped: u64) {
        tracing::warn!(skipped, "session events lagged; resyncing from session state");
        if !self.session.is_authenticated() {
            self.sink.request_navigation(&self.login_route);
        }
    }
}

// =============================================================================
// APP
// =============================================================================

#[derive(Debug, Clone)]
pub struct App {
    config: ClientConfig,
    session: SessionStore,
    events: SessionEvents,
    pipeline: HttpPipeline,
    router: Arc<Router>,
    auth: AuthClient,
}

impl App {
    /// Wire the client over `transport` and restore any persisted session.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        mirror: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = SessionStore::new(mirror);
        session.init();

        let events = SessionEvents::default();
        let classifier = ErrorClassifier::new(config.locale, config.success_code);
        let pipeline = HttpPipeline::new(transport, session.clone(), classifier, notifier, events.clone());

        let guard = NavigationGuard::new(session.clone(), Arc::new(RouteTable::document_manager()), &config.login_route);
        let router = Arc::new(Router::new(guard));
        let auth = AuthClient::new(pipeline.clone(), events.clone());

        tracing::info!(
            base_url = %config.api_base_url,
            locale = ?config.locale,
            authenticated = session.is_authenticated(),
            "client initialized"
        );
        Self { config, session, events, pipeline, router, auth }
    }

    /// [`Self::new`] over a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be built.
    pub fn connect(
        config: ClientConfig,
        mirror: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.api_base_url, config.timeout)?;
        Ok(Self::new(config, Arc::new(transport), mirror, notifier))
    }

    /// A shell that drives this app's router. Only events published after
    /// this call are seen.
    #[must_use]
    pub fn shell(&self) -> AppShell {
        AppShell::new(
            self.router.clone(),
            self.session.clone(),
            &self.events,
            self.router.guard().login_route(),
            &self.config.home_route,
        )
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    #[must_use]
    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }
}

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;
