//! Session value types shared by the store, the mirror and the auth client.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Profile of the signed-in user as kept in the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Numeric account id. Older mirrors wrote it as `userId`.
    #[serde(alias = "userId", alias = "userid")]
    pub id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Backends send `null` for unset collections and strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl User {
    /// Shallow merge: every field present in `patch` replaces ours.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(full_name) = patch.full_name {
            self.full_name = full_name;
        }
        if let Some(roles) = patch.roles {
            self.roles = roles;
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = Some(created_at);
        }
    }
}

/// Partial user update; absent fields are left untouched by [`User::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, alias = "userId", alias = "userid", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<User> for UserPatch {
    fn from(user: User) -> Self {
        Self {
            id: Some(user.id),
            username: Some(user.username),
            email: Some(user.email),
            full_name: Some(user.full_name),
            roles: Some(user.roles),
            created_at: user.created_at,
        }
    }
}

/// The current authentication state.
///
/// `token` is empty exactly when nobody is signed in, and `user` is only
/// `Some` alongside a non-empty token. `SessionStore` upholds both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// True when every field is at its signed-out value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.refresh_token.is_empty() && self.user.is_none()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
