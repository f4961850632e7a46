//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::net::classify::DEFAULT_SUCCESS_CODE;
use crate::net::messages::Locale;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api/v1";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SESSION_FILE: &str = ".session.json";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_HOME_ROUTE: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout: Duration,
    pub session_file: PathBuf,
    pub locale: Locale,
    pub login_route: String,
    pub home_route: String,
    /// Envelope `code` that means success.
    pub success_code: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout: Duration::from_millis(DEFAULT_API_TIMEOUT_MS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            locale: Locale::default(),
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            home_route: DEFAULT_HOME_ROUTE.to_owned(),
            success_code: DEFAULT_SUCCESS_CODE,
        }
    }
}

impl ClientConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `API_BASE_URL`: default `http://127.0.0.1:8080/api/v1`
    /// - `API_TIMEOUT_MS`: default 15000
    /// - `API_SUCCESS_CODE`: envelope success code, default 200
    /// - `SESSION_FILE`: durable session mirror, default `.session.json`
    /// - `UI_LOCALE`: `en` (default) or `zh-CN`
    /// - `LOGIN_ROUTE`: default `/login`
    /// - `HOME_ROUTE`: default `/`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for an unsupported locale or an empty
    /// base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`Self::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();
        if api_base_url.is_empty() {
            return Err(ConfigError::Parse("API_BASE_URL must not be empty".to_owned()));
        }

        let locale = match lookup("UI_LOCALE") {
            Some(raw) => raw.parse::<Locale>().map_err(ConfigError::Parse)?,
            None => Locale::default(),
        };

        Ok(Self {
            api_base_url,
            timeout: Duration::from_millis(parse_or(&lookup, "API_TIMEOUT_MS", DEFAULT_API_TIMEOUT_MS)),
            session_file: lookup("SESSION_FILE").map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from),
            locale,
            login_route: lookup("LOGIN_ROUTE").unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_owned()),
            home_route: lookup("HOME_ROUTE").unwrap_or_else(|| DEFAULT_HOME_ROUTE.to_owned()),
            success_code: parse_or(&lookup, "API_SUCCESS_CODE", DEFAULT_SUCCESS_CODE),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
