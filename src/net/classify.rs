//! Response classification.
//!
//! DESIGN
//! ======
//! Two backend conventions coexist: status-canonical (non-2xx means failure,
//! body may carry `message`) and envelope-canonical (`{code, message, data}`
//! at 200). Status wins for anything outside 2xx; the envelope `code` is only
//! consulted on 2xx responses. Evaluation order:
//!
//! 1. no response            -> `Network`
//! 2. 401                    -> `AuthExpired`
//! 3. 403 / 404 / >=500      -> `Forbidden` / `NotFound` / `ServerError`
//! 4. 2xx, envelope code bad -> `BusinessError` (envelope message)
//! 5. 2xx otherwise          -> success (envelope `data` or raw body)
//! 6. anything else          -> `BusinessError` (body `message` or generic)

use serde_json::Value;

use super::messages::{self, Locale};
use super::transport::TransportError;
use super::types::RawResponse;

/// Business code that marks an envelope as successful.
pub const DEFAULT_SUCCESS_CODE: i64 = 200;

// =============================================================================
// TAXONOMY
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Network,
    AuthExpired,
    Forbidden,
    NotFound,
    ServerError,
    BusinessError,
}

impl FailureClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
            Self::BusinessError => "BUSINESS_ERROR",
        }
    }

    /// The side effect every failure of this class requires.
    #[must_use]
    pub fn effect(self) -> Effect {
        match self {
            Self::AuthExpired => Effect::InvalidateSession,
            Self::Network | Self::Forbidden | Self::NotFound | Self::ServerError | Self::BusinessError => {
                Effect::Notify
            }
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Clear the session and announce that it was invalidated.
    InvalidateSession,
    /// Show the error text to the user; the session is kept.
    Notify,
}

/// A classified failure, returned to the caller after side effects ran.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{class}: {message}")]
pub struct ApiError {
    pub class: FailureClass,
    /// Localized, user-presentable text.
    pub message: String,
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    /// Whether `message` came from the server rather than a default text.
    pub server_supplied: bool,
}

impl ApiError {
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        self.class == FailureClass::AuthExpired
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success { payload: Value },
    Failure(ApiError),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// # Errors
    ///
    /// Returns the [`ApiError`] of a `Failure` outcome.
    pub fn into_result(self) -> Result<Value, ApiError> {
        match self {
            Self::Success { payload } => Ok(payload),
            Self::Failure(err) => Err(err),
        }
    }
}

// =============================================================================
// CLASSIFIER
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorClassifier {
    locale: Locale,
    success_code: i64,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(Locale::default(), DEFAULT_SUCCESS_CODE)
    }
}

impl ErrorClassifier {
    #[must_use]
    pub fn new(locale: Locale, success_code: i64) -> Self {
        Self { locale, success_code }
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Map a transport result onto an [`Outcome`]. Pure: side effects are
    /// the pipeline's job, driven by [`FailureClass::effect`].
    #[must_use]
    pub fn classify(&self, result: Result<RawResponse, TransportError>) -> Outcome {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "no response received");
                return Outcome::Failure(self.failure(FailureClass::Network, None, None));
            }
        };

        let status = response.status;
        let body = response.json_body();
        let class = match status {
            401 => FailureClass::AuthExpired,
            403 => FailureClass::Forbidden,
            404 => FailureClass::NotFound,
            s if s >= 500 => FailureClass::ServerError,
            s if (200..300).contains(&s) => return self.classify_success(status, body),
            _ => FailureClass::BusinessError,
        };
        let message = body_message(&body);
        Outcome::Failure(self.failure(class, Some(status), message))
    }

    /// A failure of `class` with the server text if any, else the default.
    #[must_use]
    pub fn failure(&self, class: FailureClass, status: Option<u16>, server_message: Option<String>) -> ApiError {
        // Transport errors are never shown verbatim.
        let server_message = server_message.filter(|_| class != FailureClass::Network);
        match server_message {
            Some(message) => ApiError { class, message, status, server_supplied: true },
            None => ApiError {
                class,
                message: messages::default_text(self.locale, class).to_owned(),
                status,
                server_supplied: false,
            },
        }
    }

    fn classify_success(&self, status: u16, body: Value) -> Outcome {
        let Some(envelope) = Envelope::detect(&body) else {
            return Outcome::Success { payload: body };
        };
        if envelope.is_success(self.success_code) {
            return Outcome::Success { payload: envelope.data.cloned().unwrap_or(Value::Null) };
        }
        tracing::debug!(code = %envelope.code, "envelope reported business failure");
        Outcome::Failure(self.failure(FailureClass::BusinessError, Some(status), envelope.message()))
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// View over a `{code, message, data}` body.
#[derive(Debug)]
struct Envelope<'a> {
    code: &'a Value,
    message: Option<&'a Value>,
    data: Option<&'a Value>,
}

impl<'a> Envelope<'a> {
    /// A body is an envelope when it is an object carrying `code` plus at
    /// least one of `message` / `data`.
    fn detect(body: &'a Value) -> Option<Self> {
        let obj = body.as_object()?;
        let code = obj.get("code")?;
        let message = obj.get("message");
        let data = obj.get("data");
        if message.is_none() && data.is_none() {
            return None;
        }
        Some(Self { code, message, data })
    }

    fn is_success(&self, success_code: i64) -> bool {
        match self.code {
            Value::Number(n) => n.as_i64() == Some(success_code),
            Value::String(s) => s.trim().parse::<i64>().ok() == Some(success_code),
            _ => false,
        }
    }

    fn message(&self) -> Option<String> {
        non_empty_text(self.message?)
    }
}

fn body_message(body: &Value) -> Option<String> {
    non_empty_text(body.get("message")?)
}

fn non_empty_text(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod classify_test;
