//! Session store: the single source of truth for who is signed in.
//!
//! ARCHITECTURE
//! ============
//! One `SessionStore` is built at process start and handed (cloned) to the
//! pipeline, the guard and the auth client. The value lives in a
//! `tokio::sync::watch` channel: every mutation is a synchronous whole-value
//! replacement, and UI code can `subscribe()` to react to changes.
//!
//! Memory is authoritative. Mirror write failures are logged and never roll
//! back the in-memory state.

pub mod mirror;
pub mod types;

use std::sync::Arc;

use tokio::sync::watch;

use crate::storage::KeyValueStore;
use types::{Session, User, UserPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session token must not be empty")]
    EmptyToken,
    #[error("no active session")]
    NotAuthenticated,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<Session>,
    mirror: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("authenticated", &state.is_authenticated())
            .field("user", &state.user.as_ref().map(|u| u.username.as_str()))
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an empty (signed-out) store over `mirror`. Call [`Self::init`]
    /// to bootstrap from previously persisted values.
    pub fn new(mirror: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self { inner: Arc::new(Inner { state, mirror }) }
    }

    /// Load the session from the durable mirror. A no-op once memory holds a
    /// session; malformed mirror data is treated as absent.
    pub fn init(&self) {
        if self.is_authenticated() {
            tracing::debug!("session already initialized; skipping mirror load");
            return;
        }
        let loaded = mirror::load(self.inner.mirror.as_ref());
        if !loaded.is_authenticated() {
            return;
        }
        let restored = self.inner.state.send_if_modified(|current| {
            if current.is_authenticated() {
                return false;
            }
            *current = loaded;
            true
        });
        if restored {
            tracing::info!(user = ?self.username(), "session restored from mirror");
        }
    }

    /// Replace token, refresh token and user in one step.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] if `token` is empty; the session
    /// is left unchanged.
    pub fn set_session(&self, token: &str, refresh_token: Option<&str>, user: User) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let session = Session {
            token: token.to_owned(),
            refresh_token: refresh_token.unwrap_or_default().to_owned(),
            user: Some(user),
        };
        tracing::info!(user = ?session.user.as_ref().map(|u| &u.username), "session established");
        if let Err(e) = mirror::save(self.inner.mirror.as_ref(), &session) {
            tracing::warn!(error = %e, "failed to mirror session");
        }
        self.inner.state.send_replace(session);
        Ok(())
    }

    /// Shallow-merge `patch` into the current user. Tokens are untouched.
    /// Does nothing while signed out so a user never exists without a token.
    /// A signed-in session missing its user (e.g. restored from a mirror
    /// whose user entry was unreadable) merges into an empty user.
    pub fn update_user(&self, patch: UserPatch) {
        let mut merged = None;
        self.inner.state.send_if_modified(|session| {
            if session.token.is_empty() {
                return false;
            }
            let before = session.user.clone();
            let user = session.user.get_or_insert_with(User::default);
            user.apply(patch);
            merged = Some(user.clone());
            session.user != before
        });
        match merged {
            Some(user) => {
                if let Err(e) = mirror::save_user(self.inner.mirror.as_ref(), &user) {
                    tracing::warn!(error = %e, "failed to mirror user update");
                }
            }
            None => tracing::debug!("update_user ignored while signed out"),
        }
    }

    /// Silent refresh: swap in new tokens while keeping the user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] if `token` is empty and
    /// [`SessionError::NotAuthenticated`] if nobody is signed in.
    pub fn rotate_tokens(&self, token: &str, refresh_token: Option<&str>) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let mut snapshot = None;
        self.inner.state.send_if_modified(|session| {
            if !session.is_authenticated() {
                return false;
            }
            session.token = token.to_owned();
            if let Some(refresh) = refresh_token {
                session.refresh_token = refresh.to_owned();
            }
            snapshot = Some(session.clone());
            true
        });
        let Some(snapshot) = snapshot else {
            return Err(SessionError::NotAuthenticated);
        };
        tracing::debug!("session tokens rotated");
        if let Err(e) = mirror::save(self.inner.mirror.as_ref(), &snapshot) {
            tracing::warn!(error = %e, "failed to mirror rotated tokens");
        }
        Ok(())
    }

    /// Reset to signed-out and erase the mirror. Idempotent; returns whether
    /// this call is the one that signed the user out.
    pub fn clear(&self) -> bool {
        let cleared = self.inner.state.send_if_modified(|session| {
            if session.is_empty() {
                return false;
            }
            *session = Session::default();
            true
        });
        if let Err(e) = mirror::erase(self.inner.mirror.as_ref()) {
            tracing::warn!(error = %e, "failed to erase session mirror");
        }
        if cleared {
            tracing::info!("session cleared");
        }
        cleared
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Current token; empty when signed out.
    #[must_use]
    pub fn token(&self) -> String {
        self.inner.state.borrow().token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> String {
        self.inner.state.borrow().refresh_token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.inner.state.borrow().user.as_ref().map(|u| u.username.clone())
    }

    /// Copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every change to the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }
}
