use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheKey;
use crate::client::core::ApiClient;
use crate::request::{Body, CallRequest, Method};
use crate::response::{FailureKind, RawOutcome, RawResult, ResponseEnvelope, TransportFailure};
use crate::telemetry::CallEvent;
use crate::transport::{PreparedRequest, TransportError};
use crate::{Error, Result};

impl ApiClient {
    /// Issue one call through the gate and the retry engine.
    ///
    /// HTTP and transport failures come back inside the [`RawOutcome`]; only runtime faults
    /// of the client itself (a closed gate) are returned as `Err`.
    pub async fn request(&self, request: CallRequest) -> Result<RawOutcome> {
        let correlation_id = request
            .correlation_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let prepared = PreparedRequest {
            method: request.method,
            url: self.config.url_for(&request.endpoint),
            query: request.query,
            body: request.body,
            correlation_id,
        };

        let cache_key = match (&self.cache, prepared.method) {
            (Some(_), Method::Get) => Some(CacheKey::fingerprint(
                prepared.method,
                &prepared.url,
                &prepared.query,
            )),
            _ => None,
        };
        if let Some(hit) = self.cached(cache_key.as_ref(), &prepared).await {
            return Ok(hit);
        }

        debug!(
            request_id = %prepared.correlation_id,
            method = %prepared.method,
            url = %prepared.url,
            "Dispatching call"
        );

        let (result, attempts) = self
            .retry
            .run(
                &prepared.correlation_id,
                self.sleeper.as_ref(),
                self.events.as_ref(),
                |e: &Error| matches!(e, Error::Transport(t) if t.is_transient()),
                |_attempt| self.attempt(&prepared),
            )
            .await;

        let outcome = match result {
            Ok(envelope) => RawOutcome::response(&prepared.correlation_id, attempts, envelope),
            Err(Error::Transport(err)) => {
                let kind = match &err {
                    TransportError::Cancelled => FailureKind::Cancelled,
                    e if e.is_transient() => FailureKind::Transient,
                    _ => FailureKind::Fatal,
                };
                let message = err.to_string();
                RawOutcome::failed(
                    &prepared.correlation_id,
                    attempts,
                    TransportFailure {
                        kind,
                        message,
                        envelope: err.into_envelope(),
                    },
                )
            }
            Err(e) => return Err(e),
        };

        if self.config.debug {
            debug!(request_id = %outcome.correlation_id, "\n{}", outcome.debug_dump());
        }
        let _ = self
            .events
            .report(CallEvent::Completed {
                request_id: outcome.correlation_id.clone(),
                status: outcome.status(),
                attempts,
                from_cache: false,
            })
            .await;

        if let (Some(key), RawResult::Response(env)) = (cache_key.as_ref(), &outcome.result) {
            if env.is_success() {
                self.store(key, env).await;
            }
        }
        Ok(outcome)
    }

    pub async fn get(&self, endpoint: impl Into<String>, query: Vec<(String, String)>) -> Result<RawOutcome> {
        self.request(CallRequest::get(endpoint).with_query(query)).await
    }

    pub async fn post(&self, endpoint: impl Into<String>, body: Option<Body>) -> Result<RawOutcome> {
        let mut req = CallRequest::post(endpoint);
        req.body = body;
        self.request(req).await
    }

    pub async fn put(&self, endpoint: impl Into<String>, body: Option<Body>) -> Result<RawOutcome> {
        let mut req = CallRequest::put(endpoint);
        req.body = body;
        self.request(req).await
    }

    pub async fn delete(&self, endpoint: impl Into<String>) -> Result<RawOutcome> {
        self.request(CallRequest::delete(endpoint)).await
    }

    /// One attempt. The gate permit lives exactly as long as this future.
    async fn attempt(&self, prepared: &PreparedRequest) -> Result<ResponseEnvelope> {
        let _permit = self.gate.acquire().await?;
        let envelope = self.transport.send(prepared).await?;
        if self.retry.is_retry_status(envelope.status) {
            return Err(Error::Transport(TransportError::RetryableStatus {
                status: envelope.status,
                envelope: Box::new(envelope),
            }));
        }
        Ok(envelope)
    }

    async fn cached(&self, key: Option<&CacheKey>, prepared: &PreparedRequest) -> Option<RawOutcome> {
        let (cache, key) = (self.cache.as_ref()?, key?);
        match cache.get::<ResponseEnvelope>(key).await {
            Ok(Some(envelope)) => {
                debug!(request_id = %prepared.correlation_id, url = %prepared.url, "Cache hit");
                let mut outcome = RawOutcome::response(&prepared.correlation_id, 0, envelope);
                outcome.from_cache = true;
                let _ = self
                    .events
                    .report(CallEvent::Completed {
                        request_id: outcome.correlation_id.clone(),
                        status: outcome.status(),
                        attempts: 0,
                        from_cache: true,
                    })
                    .await;
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(request_id = %prepared.correlation_id, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, envelope: &ResponseEnvelope) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, envelope).await {
                warn!(url = %envelope.url, error = %e, "Cache store failed");
            }
        }
    }
}
