use std::sync::Arc;

use crate::cache::CacheManager;
use crate::client::core::ApiClient;
use crate::config::ClientConfig;
use crate::resilience::{ConcurrencyGate, RetryPolicy, Sleeper, TokioSleeper};
use crate::telemetry::{noop_sink, EventSink};
use crate::transport::{HttpTransport, Transport};
use crate::Result;

/// Builder for [`ApiClient`].
///
/// Every collaborator has a production default; tests swap in fakes.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    gate: Option<ConcurrencyGate>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    events: Arc<dyn EventSink>,
    cache: Option<Arc<CacheManager>>,
}

impl ApiClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            gate: None,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            events: noop_sink(),
            cache: None,
        }
    }

    /// Replace the reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing gate instead of sizing a new one from `ClientConfig::concurrency`.
    pub fn gate(mut self, gate: ConcurrencyGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Inject an event sink. Default is a no-op sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let gate = self
            .gate
            .unwrap_or_else(|| ConcurrencyGate::new(self.config.concurrency));

        Ok(ApiClient {
            config: Arc::new(self.config),
            transport,
            gate,
            retry: self.retry,
            sleeper: self.sleeper,
            events: self.events,
            cache: self.cache,
        })
    }
}
