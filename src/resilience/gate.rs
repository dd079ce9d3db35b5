use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{Error, ErrorContext, Result};

/// Bounds the number of in-flight attempts of one client.
///
/// Clones share the same permits; a fresh gate is independent of every other one.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    sem: Arc<Semaphore>,
    max: usize,
}

/// Held for the duration of one attempt. Dropping it returns the permit, on every exit path.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}

impl ConcurrencyGate {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            sem: Arc::new(Semaphore::new(limit.get())),
            max: limit.get(),
        }
    }

    /// Suspend until a permit is free.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = self.sem.clone().acquire_owned().await.map_err(|_| {
            Error::runtime_with_context(
                "Concurrency gate closed",
                ErrorContext::new().with_source("concurrency_gate"),
            )
        })?;
        Ok(GatePermit { _permit: permit })
    }

    /// Reject all pending and future acquisitions.
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let available = self.sem.available_permits();
        GateSnapshot {
            max: self.max,
            available,
            in_use: self.max.saturating_sub(available),
        }
    }
}
