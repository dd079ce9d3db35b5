use std::num::NonZeroUsize;
use std::time::Duration;

use super::layer::ConfigLayer;
use super::{
    default_concurrency, missing_base_uri, AuthConfig, BasicCredentials, ClientConfig,
    HeaderToken, ProxyConfig, TlsPolicy, DEFAULT_TIMEOUT_SECS,
};
use crate::{Error, ErrorContext, Result};

/// Merge three sources into one [`ClientConfig`].
///
/// Precedence per field is `explicit > env > file > default`. This function performs no I/O.
pub fn resolve(file: ConfigLayer, env: ConfigLayer, explicit: ConfigLayer) -> Result<ClientConfig> {
    let merged = file.overlay(env).overlay(explicit);

    let base_uri = merged
        .uri
        .base
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(missing_base_uri)?;

    let basic = pair(
        merged.auth.username,
        merged.auth.password,
        "Auth.Username",
        "Auth.Password",
    )?
    .map(|(username, password)| BasicCredentials { username, password });
    let header = pair(merged.auth.header, merged.auth.token, "Auth.Header", "Auth.Token")?
        .map(|(name, token)| HeaderToken { name, token });
    let auth = (basic.is_some() || header.is_some()).then_some(AuthConfig { basic, header });

    let proxy = match merged.proxy.uri.filter(|u| !u.trim().is_empty()) {
        Some(uri) => {
            let credentials = pair(
                merged.proxy.username,
                merged.proxy.password,
                "Proxy.Username",
                "Proxy.Password",
            )?
            .map(|(username, password)| BasicCredentials { username, password });
            Some(ProxyConfig {
                uri,
                port: merged.proxy.port,
                credentials,
            })
        }
        None => None,
    };

    let tls = match (merged.options.ca_path, merged.options.verify_ssl) {
        (Some(path), _) => TlsPolicy::CustomCa(path),
        (None, Some(false)) => TlsPolicy::Disabled,
        (None, _) => TlsPolicy::Verify,
    };

    let concurrency = match merged.options.sem {
        Some(n) => NonZeroUsize::new(n).ok_or_else(|| {
            Error::configuration_with_context(
                "concurrency limit must be a positive integer",
                ErrorContext::new()
                    .with_field_path("Options.SEM")
                    .with_source("config_resolver"),
            )
        })?,
        None => default_concurrency(),
    };

    Ok(ClientConfig {
        base_uri,
        auth,
        proxy,
        tls,
        concurrency,
        timeout: Duration::from_secs(merged.options.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        debug: merged.options.debug.unwrap_or(false),
    })
}

/// Both halves of a credential pair, or neither.
fn pair(
    a: Option<String>,
    b: Option<String>,
    a_name: &str,
    b_name: &str,
) -> Result<Option<(String, String)>> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(incomplete(b_name, a_name)),
        (None, Some(_)) => Err(incomplete(a_name, b_name)),
    }
}

fn incomplete(missing: &str, present: &str) -> Error {
    Error::configuration_with_context(
        format!("{} is set but {} is missing", present, missing),
        ErrorContext::new()
            .with_field_path(missing)
            .with_source("config_resolver"),
    )
}
