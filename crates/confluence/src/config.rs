//! Connection settings.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the site URL.
pub const ENV_URL: &str = "CONFLUENCE_URL";
/// Environment variable holding the account email.
pub const ENV_EMAIL: &str = "CONFLUENCE_EMAIL";
/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "CONFLUENCE_API_TOKEN";

/// Default global request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Root of the REST API below the site URL.
const API_ROOT: &str = "/wiki/rest/api";

/// Credentials and endpoint for a Confluence Cloud site.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Site URL without a trailing slash, e.g. `https://acme.atlassian.net`.
    pub base_url: String,
    /// Account email used for basic authentication.
    pub email: String,
    /// API token used for basic authentication.
    pub api_token: String,
    /// Global timeout for a single request.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] for empty values and
    /// [`Error::InvalidUrl`] when the URL is not http(s).
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let email = email.into().trim().to_string();
        let api_token = api_token.into().trim().to_string();

        if base_url.is_empty() {
            return Err(Error::MissingConfig(ENV_URL));
        }
        if email.is_empty() {
            return Err(Error::MissingConfig(ENV_EMAIL));
        }
        if api_token.is_empty() {
            return Err(Error::MissingConfig(ENV_API_TOKEN));
        }
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(Error::InvalidUrl(base_url));
        }

        Ok(Self {
            base_url,
            email,
            api_token,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read the configuration from `CONFLUENCE_URL`, `CONFLUENCE_EMAIL` and
    /// `CONFLUENCE_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] naming the first absent variable.
    pub fn from_env() -> Result<Self> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| Error::MissingConfig(name));
        Self::new(var(ENV_URL)?, var(ENV_EMAIL)?, var(ENV_API_TOKEN)?)
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL of an endpoint below the REST API root.
    #[must_use]
    pub fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            API_ROOT,
            endpoint.trim_start_matches('/')
        )
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.email, self.api_token);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
