//! Call telemetry hook.
//!
//! Retry scheduling, retry exhaustion and call completion are reported to an [`EventSink`]
//! in addition to being logged. Sinks observe; they never change control flow.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CallEvent`] | Typed event enum |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default sink, drops everything |
//! | [`InMemoryEventSink`] | Bounded in-memory sink for tests and diagnostics |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    /// A transient failure will be retried after `delay_ms`.
    RetryScheduled {
        request_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    /// The attempt ceiling was reached with a transient failure still present.
    RetriesExhausted {
        request_id: String,
        attempts: u32,
        error: String,
    },
    Completed {
        request_id: String,
        status: Option<u16>,
        attempts: u32,
        from_cache: bool,
    },
}

impl CallEvent {
    pub fn retry_scheduled(
        request_id: impl Into<String>,
        attempt: u32,
        delay: Duration,
        error: impl Into<String>,
    ) -> Self {
        CallEvent::RetryScheduled {
            request_id: request_id.into(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: error.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            CallEvent::RetryScheduled { request_id, .. }
            | CallEvent::RetriesExhausted { request_id, .. }
            | CallEvent::Completed { request_id, .. } => request_id,
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn report(&self, event: CallEvent) -> Result<()>;
}

/// Default sink: no collection.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn report(&self, _event: CallEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// Keeps the most recent `max_events` events.
pub struct InMemoryEventSink {
    events: RwLock<VecDeque<CallEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events: max,
        }
    }

    pub fn events(&self) -> Vec<CallEvent> {
        self.read().iter().cloned().collect()
    }

    pub fn events_for(&self, request_id: &str) -> Vec<CallEvent> {
        self.read()
            .iter()
            .filter(|e| e.request_id() == request_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<CallEvent>> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn report(&self, event: CallEvent) -> Result<()> {
        let mut events = self
            .events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
        Ok(())
    }
}
