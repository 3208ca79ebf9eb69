//! Client configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `APP_BASE_API` | `http://localhost:8080` | backend base URL |
//! | `APP_CLIENT_ID` | `hmdp-react-ui` | sent as the `clientid` header |
//! | `APP_RSA_PUBLIC_KEY` | - | wraps request AES keys |
//! | `APP_PUBLIC_PATH` | `/` | prefix of the login route |
//! | `REQUEST_TIMEOUT_MS` | `30000` | default per-request timeout |
//! | `RELOGIN_DELAY_MS` | `1500` | delay before redirecting to login |

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CLIENT_ID: &str = "hmdp-react-ui";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RELOGIN_DELAY: Duration = Duration::from_millis(1500);

/// Client configuration for talking to the console backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "http://localhost:8080/api")
    pub base_url: String,

    /// Value of the `clientid` header and the login form's `clientId`
    pub client_id: String,

    /// Default request timeout
    pub timeout: Duration,

    /// RSA public key (PEM or bare base64 DER) for request encryption
    pub rsa_public_key: Option<String>,

    /// Route prefix; the login route is `{public_path}login`
    pub public_path: String,

    /// Delay between the session-expired notice and the redirect
    pub relogin_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
            rsa_public_key: None,
            public_path: "/".to_string(),
            relogin_delay: DEFAULT_RELOGIN_DELAY,
        }
    }

    /// Build from environment variables, defaults for anything missing
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("APP_BASE_API").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
        );
        if let Ok(id) = std::env::var("APP_CLIENT_ID") {
            config.client_id = id;
        }
        config.rsa_public_key = non_empty_env("APP_RSA_PUBLIC_KEY");
        if let Ok(path) = std::env::var("APP_PUBLIC_PATH") {
            config.public_path = path;
        }
        if let Some(ms) = env_millis("REQUEST_TIMEOUT_MS") {
            config.timeout = ms;
        }
        if let Some(ms) = env_millis("RELOGIN_DELAY_MS") {
            config.relogin_delay = ms;
        }
        config
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.rsa_public_key = Some(key.into());
        self
    }

    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = path.into();
        self
    }

    pub fn with_relogin_delay(mut self, delay: Duration) -> Self {
        self.relogin_delay = delay;
        self
    }

    /// Login route: public path plus the fixed `login` suffix
    pub fn login_path(&self) -> String {
        if self.public_path.ends_with('/') {
            format!("{}login", self.public_path)
        } else {
            format!("{}/login", self.public_path)
        }
    }

    /// Join a request path onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_path() {
        assert_eq!(ClientConfig::default().login_path(), "/login");
        let config = ClientConfig::default().with_public_path("/admin/");
        assert_eq!(config.login_path(), "/admin/login");
        let config = ClientConfig::default().with_public_path("/admin");
        assert_eq!(config.login_path(), "/admin/login");
    }

    #[test]
    fn test_url_for() {
        let config = ClientConfig::new("http://localhost:8080/api/");
        assert_eq!(
            config.url_for("/auth/login"),
            "http://localhost:8080/api/auth/login"
        );
        assert_eq!(config.url_for("auth/code"), "http://localhost:8080/api/auth/code");
        assert_eq!(config.url_for("https://cdn/x"), "https://cdn/x");
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.client_id, "hmdp-react-ui");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.relogin_delay, Duration::from_millis(1500));
        assert!(config.rsa_public_key.is_none());
    }
}
