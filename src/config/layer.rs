//! Partially-filled configuration sources.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::{Error, ErrorContext, Result};

/// Prefix used by [`ConfigLayer::from_env`].
pub const DEFAULT_ENV_PREFIX: &str = "BASE_API";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriSection {
    #[serde(rename = "Base", default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySection {
    #[serde(rename = "URI", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "Port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "Username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "Password", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsSection {
    #[serde(rename = "VerifySSL", default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    #[serde(rename = "CAPath", default, skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<PathBuf>,
    #[serde(rename = "SEM", default, skip_serializing_if = "Option::is_none")]
    pub sem: Option<usize>,
    /// Transport timeout in seconds.
    #[serde(rename = "Timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(rename = "Debug", default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// One configuration source. Every field is optional; [`crate::config::resolve`] merges
/// layers field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(rename = "URI", default)]
    pub uri: UriSection,
    #[serde(rename = "Auth", default)]
    pub auth: AuthSection,
    #[serde(rename = "Proxy", default)]
    pub proxy: ProxySection,
    #[serde(rename = "Options", default)]
    pub options: OptionsSection,
}

impl ConfigLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a layer from a `.toml`, `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read configuration file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        Self::parse(&raw, ext.as_deref().unwrap_or(""))
    }

    /// Parse file contents given the file extension (without the dot).
    pub fn parse(raw: &str, extension: &str) -> Result<Self> {
        match extension {
            "toml" => Ok(toml::from_str(raw)?),
            "json" => Ok(serde_json::from_str(raw)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
            other => Err(Error::configuration_with_context(
                format!("unknown configuration file type '{}'", other),
                ErrorContext::new()
                    .with_details("valid types: .toml | .json | .yaml")
                    .with_source("config_loader"),
            )),
        }
    }

    /// Read `BASE_API_*` variables from the process environment. Variables whose name or
    /// value is not valid UTF-8 are skipped.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(DEFAULT_ENV_PREFIX, utf8_vars(std::env::vars_os()))
    }

    /// Build a layer from `{prefix}_{SECTION}_{KEY}` pairs. Unrelated names are ignored.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut layer = Self::default();
        let head = format!("{}_", prefix.to_ascii_uppercase());

        for (key, value) in vars {
            let key = key.as_ref().to_ascii_uppercase();
            let Some(name) = key.strip_prefix(&head) else {
                continue;
            };
            let value: String = value.into();
            match name {
                "URI_BASE" => layer.uri.base = Some(value),
                "AUTH_USERNAME" => layer.auth.username = Some(value),
                "AUTH_PASSWORD" => layer.auth.password = Some(value),
                "AUTH_HEADER" => layer.auth.header = Some(value),
                "AUTH_TOKEN" => layer.auth.token = Some(value),
                "PROXY_URI" => layer.proxy.uri = Some(value),
                "PROXY_PORT" => layer.proxy.port = Some(parse_number(&key, &value)?),
                "PROXY_USERNAME" => layer.proxy.username = Some(value),
                "PROXY_PASSWORD" => layer.proxy.password = Some(value),
                "OPTIONS_VERIFYSSL" => layer.options.verify_ssl = Some(parse_flag(&key, &value)?),
                "OPTIONS_CAPATH" => layer.options.ca_path = Some(PathBuf::from(value)),
                "OPTIONS_SEM" => layer.options.sem = Some(parse_number(&key, &value)?),
                "OPTIONS_TIMEOUT" => layer.options.timeout = Some(parse_number(&key, &value)?),
                "OPTIONS_DEBUG" => layer.options.debug = Some(parse_flag(&key, &value)?),
                _ => {}
            }
        }

        Ok(layer)
    }

    pub fn with_base_uri(mut self, base: impl Into<String>) -> Self {
        self.uri.base = Some(base.into());
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth.username = Some(username.into());
        self.auth.password = Some(password.into());
        self
    }

    pub fn with_header_token(mut self, header: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth.header = Some(header.into());
        self.auth.token = Some(token.into());
        self
    }

    pub fn with_concurrency(mut self, sem: usize) -> Self {
        self.options.sem = Some(sem);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.options.debug = Some(debug);
        self
    }

    /// Field-wise overlay: values present in `higher` win.
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            uri: UriSection {
                base: higher.uri.base.or(self.uri.base),
            },
            auth: AuthSection {
                username: higher.auth.username.or(self.auth.username),
                password: higher.auth.password.or(self.auth.password),
                header: higher.auth.header.or(self.auth.header),
                token: higher.auth.token.or(self.auth.token),
            },
            proxy: ProxySection {
                uri: higher.proxy.uri.or(self.proxy.uri),
                port: higher.proxy.port.or(self.proxy.port),
                username: higher.proxy.username.or(self.proxy.username),
                password: higher.proxy.password.or(self.proxy.password),
            },
            options: OptionsSection {
                verify_ssl: higher.options.verify_ssl.or(self.options.verify_ssl),
                ca_path: higher.options.ca_path.or(self.options.ca_path),
                sem: higher.options.sem.or(self.options.sem),
                timeout: higher.options.timeout.or(self.options.timeout),
                debug: higher.options.debug.or(self.options.debug),
            },
        }
    }
}

fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid_env(key, value, "expected a boolean")),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid_env(key, value, "expected a non-negative integer"))
}

fn invalid_env(key: &str, value: &str, expected: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid value '{}'", value),
        ErrorContext::new()
            .with_field_path(key)
            .with_details(expected)
            .with_source("env_loader"),
    )
}
