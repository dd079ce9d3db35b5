use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheManager, CacheStats};
use crate::client::builder::ApiClientBuilder;
use crate::config::{resolve, ClientConfig, ConfigLayer};
use crate::resilience::{ConcurrencyGate, GateSnapshot, RetryPolicy, Sleeper};
use crate::response::RawOutcome;
use crate::results::{self, ProcessOptions, Results};
use crate::telemetry::EventSink;
use crate::transport::Transport;
use crate::Result;

/// Concurrency-gated, retrying HTTP API client.
///
/// Cloning is cheap and the clone shares the gate, the transport and the cache. Two clients
/// built separately never share a gate unless one is injected with
/// [`ApiClientBuilder::gate`].
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) gate: ConcurrencyGate,
    pub(crate) retry: RetryPolicy,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) cache: Option<Arc<CacheManager>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with the default reqwest transport and retry policy.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ApiClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Resolve configuration from an optional file, the process environment and explicit
    /// overrides, then build a default client.
    pub fn from_sources(file: Option<&Path>, explicit: ConfigLayer) -> Result<Self> {
        let file_layer = match file {
            Some(path) => ConfigLayer::from_file(path)?,
            None => ConfigLayer::new(),
        };
        let config = resolve(file_layer, ConfigLayer::from_env()?, explicit)?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Backpressure facts: permits in use and available.
    pub fn gate_snapshot(&self) -> GateSnapshot {
        self.gate.snapshot()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Classify and aggregate a batch of outcomes. Reads `outcomes` only, so calling this
    /// twice with the same input gives equal results.
    pub fn process_results(&self, outcomes: &[RawOutcome], options: &ProcessOptions) -> Results {
        results::process(outcomes, options)
    }
}
