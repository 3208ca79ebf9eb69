//! UI collaborators
//!
//! The pipeline reports to the user through [`Notifier`], moves the user
//! through [`Navigator`] and looks up texts through [`Translate`]. A host
//! application plugs its own implementations in; the defaults write to the
//! tracing log.

use std::collections::HashMap;

/// Toast-style user notification surface
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Moves the user to another route (used for the login redirect)
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Localized string lookup with `{name}` placeholders
pub trait Translate: Send + Sync {
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "hm_client::notify", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "hm_client::notify", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "hm_client::notify", "{message}");
    }
}

/// Navigator that only logs the requested route
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, path: &str) {
        tracing::info!(path, "Redirect requested");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl Locale {
    /// Parse `zh`, `zh-CN`, `en_US`...; anything else is Chinese
    pub fn parse(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("en") {
            Self::En
        } else {
            Self::Zh
        }
    }
}

pub mod keys {
    pub const SESSION_EXPIRED: &str = "request.sessionExpired";
    pub const REQUEST_FAILED: &str = "request.failed";
    pub const STATUS_ERROR: &str = "request.statusError";
    pub const NETWORK_ERROR: &str = "request.networkError";
    pub const LOGIN_SUCCESS: &str = "login.success";
    pub const LOGOUT_SUCCESS: &str = "logout.success";
}

const ZH: &[(&str, &str)] = &[
    (keys::SESSION_EXPIRED, "登录已过期，请重新登录"),
    (keys::REQUEST_FAILED, "请求失败"),
    (keys::STATUS_ERROR, "请求错误({status})"),
    (keys::NETWORK_ERROR, "网络异常，请检查连接"),
    (keys::LOGIN_SUCCESS, "登录成功"),
    (keys::LOGOUT_SUCCESS, "已退出登录"),
];

const EN: &[(&str, &str)] = &[
    (keys::SESSION_EXPIRED, "Session expired, please log in again"),
    (keys::REQUEST_FAILED, "Request failed"),
    (keys::STATUS_ERROR, "Request error ({status})"),
    (keys::NETWORK_ERROR, "Network error, please check your connection"),
    (keys::LOGIN_SUCCESS, "Logged in"),
    (keys::LOGOUT_SUCCESS, "Logged out"),
];

/// Built-in zh/en message table for the texts the pipeline itself shows.
///
/// Unknown keys render as the key.
#[derive(Debug, Clone)]
pub struct BuiltinMessages {
    locale: Locale,
    overrides: HashMap<String, String>,
}

impl BuiltinMessages {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            overrides: HashMap::new(),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Override or add a text
    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), text.into());
        self
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        if let Some(text) = self.overrides.get(key) {
            return Some(text.as_str());
        }
        let table = match self.locale {
            Locale::Zh => ZH,
            Locale::En => EN,
        };
        table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

impl Default for BuiltinMessages {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl Translate for BuiltinMessages {
    fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut text = self.lookup(key).unwrap_or(key).to_string();
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}
