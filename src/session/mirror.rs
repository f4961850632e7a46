//! Durable mirror of the session: three fixed keys, JSON-encoded values.
//!
//! The mirror only bootstraps memory on start. Reads are forgiving (anything
//! malformed counts as absent); writes go one key at a time.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{Session, User};
use crate::storage::{KeyValueStore, StorageError};

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Read the mirrored session. Storage and decode failures are logged and
/// treated as missing values.
pub fn load(store: &dyn KeyValueStore) -> Session {
    let token: String = load_json(store, TOKEN_KEY).unwrap_or_default();
    if token.is_empty() {
        return Session::default();
    }
    let refresh_token: String = load_json(store, REFRESH_TOKEN_KEY).unwrap_or_default();
    let user: Option<User> = load_json(store, USER_KEY);
    Session { token, refresh_token, user }
}

/// Write all three keys. An empty refresh token or missing user removes the
/// corresponding key instead of storing an empty value.
///
/// # Errors
///
/// Returns the first [`StorageError`]; keys before it are already written.
pub fn save(store: &dyn KeyValueStore, session: &Session) -> Result<(), StorageError> {
    save_json(store, TOKEN_KEY, &session.token)?;
    if session.refresh_token.is_empty() {
        store.delete(REFRESH_TOKEN_KEY)?;
    } else {
        save_json(store, REFRESH_TOKEN_KEY, &session.refresh_token)?;
    }
    match &session.user {
        Some(user) => save_json(store, USER_KEY, user),
        None => store.delete(USER_KEY),
    }
}

/// Write only the user key.
///
/// # Errors
///
/// Returns [`StorageError`] if the store rejects the write.
pub fn save_user(store: &dyn KeyValueStore, user: &User) -> Result<(), StorageError> {
    save_json(store, USER_KEY, user)
}

/// Remove all three keys. Every key is attempted even if an earlier delete
/// fails; the first error is returned.
///
/// # Errors
///
/// Returns the first [`StorageError`] seen.
pub fn erase(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    let mut first_err = None;
    for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
        if let Err(e) = store.delete(key) {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(key, error = %e, "session mirror read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed session mirror value");
            None
        }
    }
}

fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
#[path = "mirror_test.rs"]
mod mirror_test;
