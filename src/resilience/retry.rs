use async_trait::async_trait;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::telemetry::{CallEvent, EventSink};

/// Randomized exponential delay schedule.
///
/// For 1-based attempt `k` the upper bound is `multiplier * 2^(k-1)` seconds clamped to
/// `[min, max]`; the delay is drawn uniformly from `[min, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub multiplier: f64,
    pub min: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            multiplier: 1.25,
            min: Duration::from_secs(3),
            max: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    pub fn upper_bound(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.multiplier * 2f64.powi(exp);
        let upper = if secs.is_finite() && secs >= 0.0 {
            Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
        } else {
            self.max
        };
        upper.clamp(self.min, self.max.max(self.min))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let upper = self.upper_bound(attempt);
        if upper <= self.min {
            return self.min;
        }
        let secs = rng.gen_range(self.min.as_secs_f64()..=upper.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Clock seam for the backoff sleep.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Statuses the dispatcher turns into transient errors.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::default(),
            retry_on_status: vec![503],
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_on_status(mut self, statuses: Vec<u16>) -> Self {
        self.retry_on_status = statuses;
        self
    }

    pub fn is_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the attempt ceiling
    /// is reached. `op` receives the 1-based attempt number.
    ///
    /// Returns the last result and the number of attempts made.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        request_id: &str,
        sleeper: &dyn Sleeper,
        sink: &dyn EventSink,
        is_transient: P,
        mut op: F,
    ) -> (Result<T, E>, u32)
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match op(attempt).await {
                Ok(v) => return (Ok(v), attempt),
                Err(e) => e,
            };
            if !is_transient(&err) {
                return (Err(err), attempt);
            }
            if attempt >= max_attempts {
                error!(
                    request_id = %request_id,
                    attempts = attempt,
                    error = %err,
                    "Retries exhausted"
                );
                let _ = sink
                    .report(CallEvent::RetriesExhausted {
                        request_id: request_id.to_string(),
                        attempts: attempt,
                        error: err.to_string(),
                    })
                    .await;
                return (Err(err), attempt);
            }

            let delay = self.backoff.delay(attempt);
            warn!(
                request_id = %request_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            let _ = sink
                .report(CallEvent::retry_scheduled(request_id, attempt, delay, err.to_string()))
                .await;
            sleeper.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{InMemoryEventSink, NoopEventSink};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    #[derive(Debug)]
    enum TestErr {
        Transient,
        Fatal,
    }

    impl Display for TestErr {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    #[test]
    fn test_upper_bound_schedule() {
        let b = Backoff::default();
        assert_eq!(b.upper_bound(1), Duration::from_secs(3));
        assert_eq!(b.upper_bound(2), Duration::from_secs(3));
        assert_eq!(b.upper_bound(3), Duration::from_secs(5));
        assert_eq!(b.upper_bound(4), Duration::from_secs(10));
        assert_eq!(b.upper_bound(5), Duration::from_secs(20));
        assert_eq!(b.upper_bound(7), Duration::from_secs(60));
        assert_eq!(b.upper_bound(1000), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_within_bounds() {
        let b = Backoff::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=10 {
            for _ in 0..50 {
                let d = b.delay_with(attempt, &mut rng);
                assert!(d >= b.min, "attempt {} delay {:?}", attempt, d);
                assert!(d <= b.upper_bound(attempt), "attempt {} delay {:?}", attempt, d);
            }
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_ceiling() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let sink = InMemoryEventSink::new(16);
        let calls = AtomicU32::new(0);

        let (res, attempts): (Result<(), TestErr>, u32) = policy
            .run("r1", &sleeper, &sink, |e| matches!(e, TestErr::Transient), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestErr::Transient) }
            })
            .await;

        assert!(res.is_err());
        assert_eq!(attempts, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays.len(), 4);
        for (i, d) in delays.iter().enumerate() {
            assert!(*d >= policy.backoff.min);
            assert!(*d <= policy.backoff.upper_bound(i as u32 + 1));
        }

        let events = sink.events_for("r1");
        assert_eq!(events.len(), 5);
        assert!(matches!(
            events.last(),
            Some(CallEvent::RetriesExhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (res, attempts): (Result<(), TestErr>, u32) = policy
            .run("r1", &sleeper, &NoopEventSink, |e| matches!(e, TestErr::Transient), |_| async {
                Err(TestErr::Fatal)
            })
            .await;
        assert!(matches!(res, Err(TestErr::Fatal)));
        assert_eq!(attempts, 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recovers_after_transient() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (res, attempts) = policy
            .run("r1", &sleeper, &NoopEventSink, |e| matches!(e, TestErr::Transient), |attempt| async move {
                if attempt < 3 {
                    Err(TestErr::Transient)
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(res.unwrap(), 3);
        assert_eq!(attempts, 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_policy_builders() {
        let p = RetryPolicy::default()
            .with_max_attempts(0)
            .with_retry_on_status(vec![502, 503]);
        assert_eq!(p.max_attempts, 1);
        assert!(p.is_retry_status(502));
        assert!(!p.is_retry_status(500));
    }
}
