//! Request/response interceptor pipeline.
//!
//! ARCHITECTURE
//! ============
//! Outbound: read the token once, at dispatch, and add
//! `Authorization: Bearer <token>` when it is non-empty. No endpoint is
//! special-cased.
//!
//! Inbound: `ErrorClassifier` produces an `Outcome`; the pipeline applies the
//! class's side effect (notice, or session clear + `SessionEvent::Invalidated`)
//! and hands the same outcome to the caller.
//!
//! Concurrent 401s converge: `SessionStore::clear` is idempotent and the
//! router ignores a navigation to where it already is.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::classify::{ApiError, Effect, ErrorClassifier, FailureClass, Outcome};
use super::messages::{Notice, Notifier};
use super::transport::Transport;
use super::types::{AUTHORIZATION, RequestDescriptor};
use crate::events::{SessionEvent, SessionEvents};
use crate::session::SessionStore;

#[derive(Clone)]
pub struct HttpPipeline {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    classifier: ErrorClassifier,
    notifier: Arc<dyn Notifier>,
    events: SessionEvents,
}

impl std::fmt::Debug for HttpPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPipeline")
            .field("session", &self.session)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// Add the bearer header for `token`, or leave `request` as-is when empty.
#[must_use]
pub fn inject_credentials(mut request: RequestDescriptor, token: &str) -> RequestDescriptor {
    if token.is_empty() {
        return request;
    }
    request.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
    request.headers.insert(AUTHORIZATION.to_owned(), format!("Bearer {token}"));
    request
}

impl HttpPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: SessionStore,
        classifier: ErrorClassifier,
        notifier: Arc<dyn Notifier>,
        events: SessionEvents,
    ) -> Self {
        Self { transport, session, classifier, notifier, events }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Outbound phase on its own: the request as it would be sent now.
    #[must_use]
    pub fn authorize(&self, request: RequestDescriptor) -> RequestDescriptor {
        inject_credentials(request, &self.session.token())
    }

    /// Send `request`, classify the result and run its side effect.
    pub async fn dispatch(&self, request: RequestDescriptor) -> Outcome {
        let request_id = Uuid::new_v4();
        let method = request.method;
        let url = request.url.clone();
        let request = self.authorize(request);
        let authenticated = request.header_value(AUTHORIZATION).is_some();
        tracing::debug!(%request_id, %method, %url, authenticated, "dispatching request");

        let result = self.transport.execute(request).await;
        let outcome = self.classifier.classify(result);
        match &outcome {
            Outcome::Success { .. } => {
                tracing::debug!(%request_id, %method, %url, "request succeeded");
            }
            Outcome::Failure(err) => {
                tracing::warn!(%request_id, %method, %url, class = %err.class, status = ?err.status, "request failed");
                self.apply_effect(err, authenticated);
            }
        }
        outcome
    }

    /// [`Self::dispatch`] as a `Result` of the payload.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`]; its side effect already ran.
    pub async fn send(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        self.dispatch(request).await.into_result()
    }

    /// [`Self::send`] and decode the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`], or a `BusinessError` when the
    /// payload does not match `T` (the user is notified in both cases).
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T, ApiError> {
        let url = request.url.clone();
        let payload = self.send(request).await?;
        serde_json::from_value(payload).map_err(|e| {
            tracing::warn!(%url, error = %e, "unexpected response shape");
            self.reject(FailureClass::BusinessError, Some(200), None)
        })
    }

    /// Fail a call that transported fine but cannot be used, running the
    /// same side effect a classified failure of `class` would.
    pub fn reject(&self, class: FailureClass, status: Option<u16>, message: Option<String>) -> ApiError {
        let err = self.classifier.failure(class, status, message);
        self.apply_effect(&err, false);
        err
    }

    /// `sent_with_token` is whether the failed request carried credentials.
    fn apply_effect(&self, err: &ApiError, sent_with_token: bool) {
        match err.class.effect() {
            Effect::InvalidateSession => {
                let signed_out = self.session.clear();
                // A credentialed 401 arriving after another call already
                // ended the session stays quiet; concurrent 401s produce
                // one notice. Anonymous 401s (bad login) always notify.
                if signed_out || !sent_with_token {
                    self.notifier.notify(Notice::error(err.message.clone(), err.class));
                }
                self.events.emit(SessionEvent::Invalidated);
            }
            Effect::Notify => {
                self.notifier.notify(Notice::error(err.message.clone(), err.class));
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
