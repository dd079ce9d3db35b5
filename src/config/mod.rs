//! Client configuration.
//!
//! A [`ClientConfig`] is produced once by [`resolve`] from up to three [`ConfigLayer`]s
//! (file, environment, explicit overrides) and is immutable for the lifetime of the client
//! that owns it.
//!
//! | Section   | Keys                                           |
//! |-----------|------------------------------------------------|
//! | `URI`     | `Base` (required)                              |
//! | `Auth`    | `Username`, `Password`, `Header`, `Token`      |
//! | `Proxy`   | `URI`, `Port`, `Username`, `Password`          |
//! | `Options` | `VerifySSL`, `CAPath`, `SEM`, `Timeout`, `Debug` |

mod layer;
mod resolve;

pub use layer::{AuthSection, ConfigLayer, OptionsSection, ProxySection, UriSection, DEFAULT_ENV_PREFIX};
pub use resolve::resolve;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

/// Default number of parallel in-flight requests.
pub const DEFAULT_CONCURRENCY: usize = 15;

/// Default per-request transport timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials attached to every call.
///
/// Basic credentials and a static header token may both be present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthConfig {
    pub basic: Option<BasicCredentials>,
    pub header: Option<HeaderToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderToken {
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub uri: String,
    pub port: Option<u16>,
    pub credentials: Option<BasicCredentials>,
}

impl ProxyConfig {
    /// Proxy address as handed to the transport: `"{uri}:{port}"`.
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.uri, port),
            None => self.uri.clone(),
        }
    }
}

/// How server certificates are verified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    #[default]
    Verify,
    /// Trust the PEM certificate(s) at this path in addition to the system roots.
    /// A directory loads every `.pem` / `.crt` file inside it.
    CustomCa(PathBuf),
    Disabled,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_uri: String,
    pub auth: Option<AuthConfig>,
    pub proxy: Option<ProxyConfig>,
    pub tls: TlsPolicy,
    pub concurrency: NonZeroUsize,
    pub timeout: Duration,
    pub debug: bool,
}

impl ClientConfig {
    /// Configuration with defaults for everything except the base URI.
    pub fn new(base_uri: impl Into<String>) -> Result<Self> {
        let base_uri = base_uri.into();
        if base_uri.trim().is_empty() {
            return Err(missing_base_uri());
        }
        Ok(Self {
            base_uri,
            auth: None,
            proxy: None,
            tls: TlsPolicy::Verify,
            concurrency: default_concurrency(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
        })
    }

    pub fn with_concurrency(mut self, n: NonZeroUsize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Target URL for an endpoint. The caller controls separators; nothing is normalized.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_uri, endpoint)
    }
}

pub(crate) fn default_concurrency() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN)
}

pub(crate) fn missing_base_uri() -> Error {
    Error::configuration_with_context(
        "base URI is required",
        ErrorContext::new()
            .with_field_path("URI.Base")
            .with_source("config_resolver"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_base_uri() {
        assert!(ClientConfig::new("").is_err());
        assert!(ClientConfig::new("   ").is_err());
    }

    #[test]
    fn test_url_for_concatenates_verbatim() {
        let cfg = ClientConfig::new("https://api.example.com").unwrap();
        assert_eq!(cfg.url_for("/v1/items"), "https://api.example.com/v1/items");
        assert_eq!(cfg.url_for("v1"), "https://api.example.comv1");
    }

    #[test]
    fn test_proxy_url() {
        let proxy = ProxyConfig {
            uri: "http://proxy.local".into(),
            port: Some(8080),
            credentials: None,
        };
        assert_eq!(proxy.url(), "http://proxy.local:8080");
    }

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::new("http://x").unwrap();
        assert_eq!(cfg.concurrency.get(), DEFAULT_CONCURRENCY);
        assert_eq!(cfg.tls, TlsPolicy::Verify);
        assert!(!cfg.debug);
    }
}
