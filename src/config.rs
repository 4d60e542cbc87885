use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// How [`SessionStore::check_auth`](crate::SessionStore::check_auth) treats a
/// snapshot restored from durable storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestorePolicy {
    /// Adopt the snapshot immediately and revert if revalidation fails.
    #[default]
    Optimistic,
    /// Stay loading until revalidation confirms the snapshot.
    Strict,
}

impl std::str::FromStr for RestorePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "strict" => Ok(Self::Strict),
            other => Err(Error::Config(format!(
                "SESSION_RESTORE: expected `optimistic` or `strict`, got `{other}`"
            ))),
        }
    }
}

/// Client configuration.
///
/// Use [`from_env()`](ClientConfig::from_env) for convention-based setup,
/// or [`new()`](ClientConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) timeout: Option<Duration>,
    pub(crate) restore_policy: RestorePolicy,
    pub(crate) login_path: String,
    pub(crate) landing_path: String,
    pub(crate) credential_cookie: String,
}

impl ClientConfig {
    /// Create a configuration for the backend at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
            restore_policy: RestorePolicy::default(),
            login_path: "/login".into(),
            landing_path: "/dashboard".into(),
            credential_cookie: "auth_token".into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `API_BASE_URL`: backend base address (default `http://localhost:8000/api`)
    /// - `API_TIMEOUT_SECS`: per-request timeout in seconds
    /// - `SESSION_RESTORE`: `optimistic` (default) or `strict`
    /// - `LOGIN_PATH`: client path of the login view (default `/login`)
    /// - `LANDING_PATH`: default authenticated view (default `/dashboard`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let base_url: Url = base_url
            .parse()
            .map_err(|e| Error::Config(format!("API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(secs) = std::env::var("API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("API_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Ok(policy) = std::env::var("SESSION_RESTORE") {
            config = config.with_restore_policy(policy.parse()?);
        }
        if let Ok(path) = std::env::var("LOGIN_PATH") {
            config = config.with_login_path(path);
        }
        if let Ok(path) = std::env::var("LANDING_PATH") {
            config = config.with_landing_path(path);
        }

        Ok(config)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// How a persisted session is restored at start.
    #[must_use]
    pub fn with_restore_policy(mut self, policy: RestorePolicy) -> Self {
        self.restore_policy = policy;
        self
    }

    /// Client path of the login view.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Default view for authenticated users.
    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    /// Name of the cookie read as a fallback credential source.
    #[must_use]
    pub fn with_credential_cookie(mut self, name: impl Into<String>) -> Self {
        self.credential_cookie = name.into();
        self
    }

    /// Backend base address.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Session restore policy.
    #[must_use]
    pub fn restore_policy(&self) -> RestorePolicy {
        self.restore_policy
    }

    /// Client path of the login view.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Default view for authenticated users.
    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Name of the cookie that may carry the credential.
    #[must_use]
    pub fn credential_cookie(&self) -> &str {
        &self.credential_cookie
    }
}
