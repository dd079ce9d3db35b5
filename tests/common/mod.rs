//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use base_api_client::resilience::Sleeper;
use base_api_client::transport::{PreparedRequest, Transport, TransportError};
use base_api_client::{ApiClient, ClientConfig, ResponseEnvelope};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleeper that records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub enum Reply {
    Respond(ResponseEnvelope),
    Fail(TransportError),
    /// Never completes; only cancellation ends the call.
    Hang,
}

type Responder = dyn Fn(&PreparedRequest, usize) -> Reply + Send + Sync;

/// In-process transport. The responder receives the request and how many times its URL has
/// been requested so far (1-based).
pub struct FakeTransport {
    responder: Box<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    pub fn new(responder: impl Fn(&PreparedRequest, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            per_url: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseEnvelope, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let nth = {
            let mut seen = self.per_url.lock().unwrap();
            let n = seen.entry(request.url.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match (self.responder)(request, nth) {
            Reply::Respond(env) => Ok(env),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn json_reply(request: &PreparedRequest, status: u16, body: serde_json::Value) -> Reply {
    Reply::Respond(
        ResponseEnvelope::new(request.method, request.url.clone(), status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string()),
    )
}

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub fn fake_client(
    transport: Arc<FakeTransport>,
    concurrency: usize,
    sleeper: Arc<RecordingSleeper>,
) -> ApiClient {
    let config = ClientConfig::new("http://fake.local/api")
        .unwrap()
        .with_concurrency(nz(concurrency));
    ApiClient::builder(config)
        .transport(transport)
        .sleeper(sleeper)
        .build()
        .unwrap()
}

pub fn init_tracing() {
    let _ = base_api_client::logging::init(true);
}
