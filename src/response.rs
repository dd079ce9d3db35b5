//! Raw responses as received from the transport, before classification.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::request::Method;

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub reason: Option<String>,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseEnvelope {
    /// Minimal envelope, mostly useful for fakes and tests.
    pub fn new(method: Method, url: impl Into<String>, status: u16) -> Self {
        Self {
            method,
            url: url.into(),
            status,
            reason: None,
            version: "HTTP/1.1".to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value with this name (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Human-readable dump of the exchange. Diagnostic only; the layout is not stable.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}, {}-{}[{}]",
            self.version,
            self.method,
            self.status,
            self.reason.as_deref().unwrap_or("")
        );
        let _ = writeln!(out, "  Request-URL: {}", self.url);
        let _ = writeln!(out, "  Headers:");
        for (k, v) in &self.headers {
            let _ = writeln!(out, "    {}: {}", k, v);
        }
        match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(json) => {
                let _ = writeln!(out, "  Response-JSON:\n    {}", json);
            }
            Err(_) => {
                let _ = writeln!(out, "  Response-TEXT:\n    {}", self.text());
            }
        }
        out
    }
}

/// Why a call ended without a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient error still present after the last attempt.
    Transient,
    /// Non-retryable transport failure.
    Fatal,
    /// The batch was cancelled before this call finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Response of the last attempt, when the failure was a retry-worthy status.
    pub envelope: Option<ResponseEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawResult {
    Response(ResponseEnvelope),
    Failed(TransportFailure),
}

/// What the dispatcher hands back for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutcome {
    pub correlation_id: String,
    /// Number of transport attempts made; zero for cache hits and cancelled calls.
    pub attempts: u32,
    pub from_cache: bool,
    pub result: RawResult,
}

impl RawOutcome {
    pub fn response(correlation_id: impl Into<String>, attempts: u32, envelope: ResponseEnvelope) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            attempts,
            from_cache: false,
            result: RawResult::Response(envelope),
        }
    }

    pub fn failed(correlation_id: impl Into<String>, attempts: u32, failure: TransportFailure) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            attempts,
            from_cache: false,
            result: RawResult::Failed(failure),
        }
    }

    pub fn cancelled(correlation_id: impl Into<String>) -> Self {
        Self::failed(
            correlation_id,
            0,
            TransportFailure {
                kind: FailureKind::Cancelled,
                message: "call cancelled before completion".to_string(),
                envelope: None,
            },
        )
    }

    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match &self.result {
            RawResult::Response(env) => Some(env),
            RawResult::Failed(f) => f.envelope.as_ref(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.envelope().map(|e| e.status)
    }

    /// Debug dump of the underlying response, or the failure message when there is none.
    pub fn debug_dump(&self) -> String {
        match &self.result {
            RawResult::Response(env) => env.debug_dump(),
            RawResult::Failed(f) => match &f.envelope {
                Some(env) => format!("{:?}: {}\n{}", f.kind, f.message, env.debug_dump()),
                None => format!("{:?}: {}", f.kind, f.message),
            },
        }
    }
}
