//! Content-type driven response classification.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::response::{RawOutcome, RawResult, ResponseEnvelope};

/// Normalized response body, selected by `Content-Type` prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Token { token: String },
    Json(Value),
    Text(String),
    Html(String),
    Unhandled {
        content_type: Option<String>,
        body: String,
    },
}

impl Payload {
    /// Prefix match on the declared content type, case-sensitive, first match wins:
    /// `application/jwt`, then JSON and javascript types, `text/plain`, `text/html`.
    pub fn from_envelope(envelope: &ResponseEnvelope) -> Self {
        let body = envelope.text();
        let content_type = match envelope.content_type() {
            Some(ct) => ct,
            None => {
                return Payload::Unhandled {
                    content_type: None,
                    body,
                }
            }
        };

        if content_type.starts_with("application/jwt") {
            Payload::Token { token: body }
        } else if ["application/json", "text/javascript", "application/javascript"]
            .iter()
            .any(|p| content_type.starts_with(p))
        {
            match serde_json::from_slice(&envelope.body) {
                Ok(v) => Payload::Json(v),
                Err(_) => Payload::Text(body),
            }
        } else if content_type.starts_with("text/plain") {
            Payload::Text(body)
        } else if content_type.starts_with("text/html") {
            Payload::Html(body)
        } else {
            Payload::Unhandled {
                content_type: Some(content_type.to_string()),
                body,
            }
        }
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, Payload::Unhandled { .. })
    }

    pub fn into_value(self) -> Value {
        match self {
            Payload::Token { token } => json!({"token": token, "token_type": "Bearer"}),
            Payload::Json(v) => v,
            Payload::Text(text) => json!({ "text_plain": text }),
            Payload::Html(html) => json!({ "text_html": html }),
            Payload::Unhandled { content_type, body } => json!({
                "error": "unhandled content type",
                "content_type": content_type,
                "text": body,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedOutcome {
    pub correlation_id: String,
    pub status: Option<u16>,
    pub payload: Value,
    pub tag: OutcomeTag,
}

impl ClassifiedOutcome {
    pub fn is_success(&self) -> bool {
        self.tag == OutcomeTag::Success
    }
}

/// Success requires a 2xx status and a recognized content type. Everything else,
/// transport failures included, is tagged as failure.
pub fn classify(outcome: &RawOutcome) -> ClassifiedOutcome {
    let (status, payload, tag) = match &outcome.result {
        RawResult::Response(env) => {
            let payload = Payload::from_envelope(env);
            let tag = if env.is_success() && !payload.is_unhandled() {
                OutcomeTag::Success
            } else {
                OutcomeTag::Failure
            };
            (Some(env.status), payload.into_value(), tag)
        }
        RawResult::Failed(failure) => match &failure.envelope {
            Some(env) => (
                Some(env.status),
                Payload::from_envelope(env).into_value(),
                OutcomeTag::Failure,
            ),
            None => (None, json!({ "error": failure.message }), OutcomeTag::Failure),
        },
    };
    ClassifiedOutcome {
        correlation_id: outcome.correlation_id.clone(),
        status,
        payload,
        tag,
    }
}
