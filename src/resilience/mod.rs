//! Resilience primitives: the concurrency gate and the retry engine.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ConcurrencyGate`] | Counting semaphore bounding in-flight attempts |
//! | [`Backoff`] | Randomized exponential delay schedule |
//! | [`RetryPolicy`] | Higher-order retry loop over one attempt closure |
//! | [`Sleeper`] | Clock seam for the backoff sleep |
//!
//! The gate is held for one attempt only. A call waiting out its backoff holds no permit,
//! so pending calls are not starved by retries.
//!
//! ```rust
//! use base_api_client::resilience::{ConcurrencyGate, RetryPolicy};
//! use std::num::NonZeroUsize;
//!
//! let gate = ConcurrencyGate::new(NonZeroUsize::new(4).unwrap());
//! assert_eq!(gate.snapshot().available, 4);
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 5);
//! assert!(policy.is_retry_status(503));
//! ```

mod gate;
mod retry;

pub use gate::{ConcurrencyGate, GatePermit, GateSnapshot};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
