//! Network transport.
//!
//! The dispatcher talks to the network only through the [`Transport`] trait, so retry,
//! gating and classification can run against an in-process fake as well as the
//! reqwest-backed [`HttpTransport`].

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;

use crate::request::{Body, Method};
use crate::response::ResponseEnvelope;

/// Header carrying the call's correlation identifier.
pub const CORRELATION_HEADER: &str = "x-request-id";

/// A call with its target URL already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
    pub correlation_id: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one attempt and read the whole response, whatever its status.
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseEnvelope, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response arrived with a status the retry policy treats as transient.
    #[error("retry-worthy status {status} from {}", .envelope.url)]
    RetryableStatus {
        status: u16,
        envelope: Box<ResponseEnvelope>,
    },

    /// Connection-level failure reported by a non-reqwest transport.
    #[error("Transient transport error: {0}")]
    Transient(String),

    #[error("call cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// The retry predicate: connection failures, timeouts and retry-worthy statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            TransportError::RetryableStatus { .. } | TransportError::Transient(_) => true,
            TransportError::Cancelled | TransportError::Other(_) => false,
        }
    }

    /// Response attached to the error, if one was received.
    pub fn into_envelope(self) -> Option<ResponseEnvelope> {
        match self {
            TransportError::RetryableStatus { envelope, .. } => Some(*envelope),
            _ => None,
        }
    }
}
