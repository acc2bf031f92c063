//! Client configuration and builder.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chatstream::config::{ApiStyle, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url("http://localhost:11434")
//!     .api_style(ApiStyle::Ollama)
//!     .timeout(Duration::from_secs(120))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.endpoint_url().as_str(), "http://localhost:11434/api/chat");
//! ```

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Url;

use super::options::ApiStyle;
use crate::{Error, Result};

/// Default connect timeout for the streaming request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default overall timeout; long generations from large local models need
/// minutes, not seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the streaming client.
///
/// Use [`ClientConfig::builder()`] to create a new configuration.
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) api_style: ApiStyle,
    pub(crate) endpoint_path: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) timeout: Duration,
}

impl ClientConfig {
    /// Create a new builder for ClientConfig.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Get the backend API family.
    pub fn api_style(&self) -> ApiStyle {
        self.api_style
    }

    /// Full URL the streaming request is sent to.
    pub fn endpoint_url(&self) -> Url {
        let path = self
            .endpoint_path
            .as_deref()
            .unwrap_or_else(|| self.api_style.default_path());
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    /// Get the API key, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Get the extra request headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get the overall request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_style", &self.api_style)
            .field("endpoint_path", &self.endpoint_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where the API key comes from.
#[derive(Debug, Clone, Default)]
enum KeySource {
    #[default]
    None,
    Value(String),
    Env(String),
}

/// Builder for [`ClientConfig`].
///
/// Validation happens in [`build()`](ClientConfigBuilder::build).
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_style: ApiStyle,
    endpoint_path: Option<String>,
    key: KeySource,
    headers: HashMap<String, String>,
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_style: ApiStyle::default(),
            endpoint_path: None,
            key: KeySource::None,
            headers: HashMap::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfigBuilder {
    // -------------------------------------------------------------------------
    // Endpoint
    // -------------------------------------------------------------------------

    /// Base URL of the backend, e.g. `http://localhost:11434`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Backend API family.
    pub fn api_style(mut self, style: impl Into<ApiStyle>) -> Self {
        self.api_style = style.into();
        self
    }

    /// Override the request path appended to the base URL.
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = Some(path.into());
        self
    }

    // -------------------------------------------------------------------------
    // Credentials and headers
    // -------------------------------------------------------------------------

    /// Send this key as a bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.key = KeySource::Value(key.into());
        self
    }

    /// Read the bearer token from an environment variable at build time.
    pub fn api_key_from_env(mut self, var: impl Into<String>) -> Self {
        self.key = KeySource::Env(var.into());
        self
    }

    /// Add/override a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------

    /// Timeout for establishing the connection.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Timeout for the whole request, body included.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The base URL is present and uses http or https
    /// - The API key environment variable exists, if one was named
    /// - Timeouts are non-zero
    pub fn build(self) -> Result<ClientConfig> {
        let raw_url = self
            .base_url
            .ok_or_else(|| Error::InvalidConfig("base_url is required".into()))?;
        let base_url = Url::parse(raw_url.trim())
            .map_err(|e| Error::InvalidConfig(format!("invalid base_url {raw_url:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "base_url must use http or https, got {}",
                base_url.scheme()
            )));
        }

        let api_key = match self.key {
            KeySource::None => None,
            KeySource::Value(key) => Some(key),
            KeySource::Env(var) => match std::env::var(&var) {
                Ok(key) if !key.trim().is_empty() => Some(key),
                _ => return Err(Error::EnvVarNotFound { var }),
            },
        };

        if self.timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }

        Ok(ClientConfig {
            base_url,
            api_style: self.api_style,
            endpoint_path: self.endpoint_path,
            api_key,
            headers: self.headers,
            connect_timeout: self.connect_timeout,
            timeout: self.timeout,
        })
    }
}
