use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Proxy};
use std::path::Path;

use super::{PreparedRequest, Transport, TransportError, CORRELATION_HEADER};
use crate::config::{BasicCredentials, ClientConfig, TlsPolicy};
use crate::request::{Body, Method};
use crate::response::ResponseEnvelope;
use crate::{Error, ErrorContext, Result};

/// reqwest-backed transport. Proxy, TLS and auth settings from the [`ClientConfig`] are
/// applied uniformly to every call.
pub struct HttpTransport {
    client: reqwest::Client,
    basic: Option<BasicCredentials>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.auth.as_ref().and_then(|a| a.header.as_ref()) {
            let name = HeaderName::from_bytes(token.name.as_bytes())
                .map_err(|e| config_error("Auth.Header", e))?;
            let mut value =
                HeaderValue::from_str(&token.token).map_err(|e| config_error("Auth.Token", e))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers);

        if let Some(proxy_cfg) = &config.proxy {
            let mut proxy =
                Proxy::all(proxy_cfg.url()).map_err(|e| config_error("Proxy.URI", e))?;
            if let Some(creds) = &proxy_cfg.credentials {
                proxy = proxy.basic_auth(&creds.username, &creds.password);
            }
            builder = builder.proxy(proxy);
        }

        builder = match &config.tls {
            TlsPolicy::Verify => builder,
            TlsPolicy::Disabled => builder.danger_accept_invalid_certs(true),
            TlsPolicy::CustomCa(path) => {
                for cert in load_certificates(path)? {
                    builder = builder.add_root_certificate(cert);
                }
                builder
            }
        };

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            basic: config.auth.as_ref().and_then(|a| a.basic.clone()),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> std::result::Result<ResponseEnvelope, TransportError> {
        let mut req = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        req = match &request.body {
            Some(Body::Json(value)) => req.json(value),
            Some(Body::Form(fields)) => req.form(fields),
            None => req,
        };
        if let Some(creds) = &self.basic {
            req = req.basic_auth(&creds.username, Some(&creds.password));
        }
        req = req.header(CORRELATION_HEADER, &request.correlation_id);

        let resp = req.send().await?;

        let status = resp.status();
        let version = format!("{:?}", resp.version());
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.bytes().await?;

        Ok(ResponseEnvelope {
            method: request.method,
            url,
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            version,
            headers,
            body,
        })
    }
}

/// PEM certificates from a file, or from every `.pem` / `.crt` file in a directory.
fn load_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let files = if path.is_dir() {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(path).map_err(|e| ca_path_error(path, e))?;
        for entry in entries {
            let p = entry.map_err(|e| ca_path_error(path, e))?.path();
            let is_cert = p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pem") || e.eq_ignore_ascii_case("crt"))
                .unwrap_or(false);
            if is_cert {
                files.push(p);
            }
        }
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut certs = Vec::with_capacity(files.len());
    for file in files {
        let pem = std::fs::read(&file).map_err(|e| ca_path_error(&file, e))?;
        let cert = Certificate::from_pem(&pem).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid CA certificate: {}", e),
                ErrorContext::new()
                    .with_field_path("Options.CAPath")
                    .with_details(file.display().to_string())
                    .with_source("http_transport"),
            )
        })?;
        certs.push(cert);
    }
    Ok(certs)
}

fn ca_path_error(path: &Path, e: std::io::Error) -> Error {
    Error::configuration_with_context(
        format!("cannot read CA certificate: {}", e),
        ErrorContext::new()
            .with_field_path("Options.CAPath")
            .with_details(path.display().to_string())
            .with_source("http_transport"),
    )
}

fn config_error(field: &str, e: impl std::fmt::Display) -> Error {
    Error::configuration_with_context(
        e.to_string(),
        ErrorContext::new()
            .with_field_path(field)
            .with_source("http_transport"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, HeaderToken};

    fn prepared(method: Method, url: String) -> PreparedRequest {
        PreparedRequest {
            method,
            url,
            query: Vec::new(),
            body: None,
            correlation_id: "req-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_reads_full_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/items")
            .match_header("x-request-id", "req-1")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "missing"}"#)
            .create_async()
            .await;

        let config = ClientConfig::new(server.url()).unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        let env = transport
            .send(&prepared(Method::Get, format!("{}/items", server.url())))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(env.status, 404);
        assert_eq!(env.reason.as_deref(), Some("Not Found"));
        assert_eq!(env.content_type(), Some("application/json"));
        assert_eq!(env.text(), r#"{"error": "missing"}"#);
    }

    #[tokio::test]
    async fn test_auth_header_and_basic_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login")
            .match_header("x-api-key", "secret")
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".to_string()))
            .match_body(mockito::Matcher::Json(serde_json::json!({"a": 1})))
            .with_status(200)
            .create_async()
            .await;

        let config = ClientConfig::new(server.url()).unwrap().with_auth(AuthConfig {
            basic: Some(BasicCredentials {
                username: "user".into(),
                password: "pass".into(),
            }),
            header: Some(HeaderToken {
                name: "X-Api-Key".into(),
                token: "secret".into(),
            }),
        });
        let transport = HttpTransport::new(&config).unwrap();
        let mut req = prepared(Method::Post, format!("{}/login", server.url()));
        req.body = Some(Body::Json(serde_json::json!({"a": 1})));
        let env = transport.send(&req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(env.status, 200);
    }

    #[tokio::test]
    async fn test_form_body_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/things")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
            .match_body(mockito::Matcher::UrlEncoded("name".into(), "widget".into()))
            .with_status(204)
            .create_async()
            .await;

        let config = ClientConfig::new(server.url()).unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        let mut req = prepared(Method::Put, format!("{}/things", server.url()));
        req.query = vec![("page".into(), "2".into())];
        req.body = Some(Body::Form(vec![("name".into(), "widget".into())]));
        let env = transport.send(&req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(env.status, 204);
        assert!(env.body.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Port 9 (discard) is closed on test hosts.
        let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport
            .send(&prepared(Method::Get, "http://127.0.0.1:9/x".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_auth_header_rejected() {
        let config = ClientConfig::new("http://x").unwrap().with_auth(AuthConfig {
            basic: None,
            header: Some(HeaderToken {
                name: "bad header".into(),
                token: "t".into(),
            }),
        });
        let err = HttpTransport::new(&config).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_ca_file_is_configuration_error() {
        let config = ClientConfig::new("http://x")
            .unwrap()
            .with_tls(TlsPolicy::CustomCa("/nonexistent/ca.pem".into()));
        let err = HttpTransport::new(&config).err().unwrap();
        assert!(err.is_configuration());
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("Options.CAPath"));
        assert_eq!(ctx.details.as_deref(), Some("/nonexistent/ca.pem"));
    }
}
