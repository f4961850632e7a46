//! Account calls that shape the session: login, register, profile, logout.
//!
//! ERROR HANDLING
//! ==============
//! Everything goes through `HttpPipeline`, so failures arrive already
//! classified and the user has already been notified. This module only adds
//! what the session needs on success.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{SessionEvent, SessionEvents};
use crate::net::classify::{ApiError, FailureClass};
use crate::net::pipeline::HttpPipeline;
use crate::net::types::RequestDescriptor;
use crate::session::types::{User, UserPatch};
use crate::session::{SessionError, SessionStore};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const CURRENT_USER_PATH: &str = "/users/current";

fn user_stats_path(user_id: i64) -> String {
    format!("/users/{user_id}/stats")
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Account payload returned by login, register and the current-user calls.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(alias = "userId", alias = "id")]
    userid: Option<i64>,
    token: Option<String>,
    #[serde(rename = "refresh_token", alias = "refreshToken")]
    refresh_token: Option<String>,
    username: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    roles: Option<BTreeSet<String>>,
    created_at: Option<NaiveDateTime>,
}

impl AccountResponse {
    fn patch(&self) -> UserPatch {
        UserPatch {
            id: self.userid,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            roles: self.roles.clone(),
            created_at: self.created_at,
        }
    }

    fn user(&self) -> User {
        let mut user = User::default();
        user.apply(self.patch());
        user
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    pipeline: HttpPipeline,
    events: SessionEvents,
}

impl AuthClient {
    pub fn new(pipeline: HttpPipeline, events: SessionEvents) -> Self {
        Self { pipeline, events }
    }

    fn session(&self) -> &SessionStore {
        self.pipeline.session()
    }

    /// Sign in and establish the session.
    ///
    /// Tokens missing from the response keep their current values; a login
    /// that leaves no token at all is rejected as a business error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Api`] for any classified failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        tracing::info!(username = %credentials.username, "login attempt");
        let account: AccountResponse =
            self.pipeline.send_json(RequestDescriptor::post(LOGIN_PATH).json(credentials)).await?;

        let session = self.session();
        let Some(token) = non_empty(account.token.clone()).or_else(|| non_empty(Some(session.token()))) else {
            tracing::warn!(username = %credentials.username, "login response carried no token");
            return Err(self.pipeline.reject(FailureClass::BusinessError, Some(200), None).into());
        };
        let refresh_token = non_empty(account.refresh_token.clone()).or_else(|| non_empty(Some(session.refresh_token())));

        let user = account.user();
        session.set_session(&token, refresh_token.as_deref(), user.clone())?;
        self.events.emit(SessionEvent::SignedIn { username: user.username.clone() });
        Ok(user)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let account: AccountResponse =
            self.pipeline.send_json(RequestDescriptor::post(REGISTER_PATH).json(request)).await?;
        Ok(account.user())
    }

    /// Fetch the signed-in user and merge it into the session.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let account: AccountResponse = self.pipeline.send_json(RequestDescriptor::get(CURRENT_USER_PATH)).await?;
        self.session().update_user(account.patch());
        Ok(self.session().user().unwrap_or_else(|| account.user()))
    }

    /// Update the signed-in user's profile, then merge the server's view
    /// when the response carries one. An empty patch returns the current
    /// user without a request.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        if patch.is_empty() {
            if let Some(user) = self.session().user() {
                tracing::debug!("empty profile patch; nothing to send");
                return Ok(user);
            }
        }
        let account: Option<AccountResponse> =
            self.pipeline.send_json(RequestDescriptor::put(CURRENT_USER_PATH).json(patch)).await?;
        self.session().update_user(patch.clone());
        if let Some(account) = &account {
            self.session().update_user(account.patch());
        }
        let fallback = || account.as_ref().map_or_else(User::default, AccountResponse::user);
        Ok(self.session().user().unwrap_or_else(fallback))
    }

    /// Usage statistics for `user_id`, passed through untyped.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn user_stats(&self, user_id: i64) -> Result<Value, ApiError> {
        self.pipeline.send(RequestDescriptor::get(user_stats_path(user_id))).await
    }

    /// Sign out locally. The backend keeps no session state to revoke.
    pub fn logout(&self) {
        let username = self.session().username();
        self.session().clear();
        tracing::info!(user = ?username, "logged out");
        self.events.emit(SessionEvent::SignedOut);
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;
