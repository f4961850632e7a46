//! User-facing notices and their localized default texts.
//!
//! The core decides *that* a message is shown and *what* it says; rendering
//! belongs to whatever implements [`Notifier`].

use std::str::FromStr;
use std::time::Duration;

use super::classify::FailureClass;

/// How long an error toast stays up.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    ZhCn,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh" | "zh-cn" | "zh-hans" => Ok(Self::ZhCn),
            other => Err(format!("unsupported locale '{other}' (expected 'en' or 'zh-CN')")),
        }
    }
}

/// Default text for `class` when the server supplied none.
#[must_use]
pub fn default_text(locale: Locale, class: FailureClass) -> &'static str {
    match (locale, class) {
        (Locale::En, FailureClass::Network) => "Network error, please check your connection",
        (Locale::En, FailureClass::AuthExpired) => "Your session has expired, please sign in again",
        (Locale::En, FailureClass::Forbidden) => "You do not have permission to perform this action",
        (Locale::En, FailureClass::NotFound) => "The requested resource does not exist",
        (Locale::En, FailureClass::ServerError) => "Server error, please try again later",
        (Locale::En, FailureClass::BusinessError) => "Request failed",
        (Locale::ZhCn, FailureClass::Network) => "网络错误，请检查您的网络连接",
        (Locale::ZhCn, FailureClass::AuthExpired) => "登录已过期，请重新登录",
        (Locale::ZhCn, FailureClass::Forbidden) => "没有权限执行此操作",
        (Locale::ZhCn, FailureClass::NotFound) => "请求的资源不存在",
        (Locale::ZhCn, FailureClass::ServerError) => "服务器错误，请稍后再试",
        (Locale::ZhCn, FailureClass::BusinessError) => "请求失败",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Failure class that produced the notice, if any.
    pub class: Option<FailureClass>,
    pub duration: Duration,
}

impl Notice {
    #[must_use]
    pub fn error(text: impl Into<String>, class: FailureClass) -> Self {
        Self { level: NoticeLevel::Error, text: text.into(), class: Some(class), duration: DEFAULT_NOTICE_DURATION }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, text: text.into(), class: None, duration: DEFAULT_NOTICE_DURATION }
    }
}

/// Sink for user-visible messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs. Useful headless and as a default.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let class = notice.class.map(FailureClass::as_str);
        match notice.level {
            NoticeLevel::Error => tracing::error!(class, text = %notice.text, "notice"),
            NoticeLevel::Warning => tracing::warn!(class, text = %notice.text, "notice"),
            NoticeLevel::Info => tracing::info!(class, text = %notice.text, "notice"),
        }
    }
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod messages_test;
