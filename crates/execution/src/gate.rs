//! Call budget and concurrency gate for external collaborators.

use async_trait::async_trait;
use promptevo_core::{ExternalError, GenerativeMutator, OptimizerConfig, Service};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Budget for external calls.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    /// Time allowed per call attempt
    pub time_per_call: Duration,
    /// Max concurrent external calls
    pub max_concurrent: NonZeroUsize,
    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub retry_base_delay: Duration,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            time_per_call: Duration::from_secs(60),
            max_concurrent: NonZeroUsize::MIN.saturating_add(9),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl Budget {
    /// Create a default budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Budget described by an optimizer configuration.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            time_per_call: config.call_timeout(),
            max_concurrent: NonZeroUsize::new(config.max_concurrency).unwrap_or(NonZeroUsize::MIN),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay(),
        }
    }

    /// Set time allowed per call attempt.
    pub fn with_time_per_call(mut self, duration: Duration) -> Self {
        self.time_per_call = duration;
        self
    }

    /// Set max concurrent calls.
    pub fn with_max_concurrent(mut self, max: NonZeroUsize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set retry policy.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    /// Backoff before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Result of a gated call and how many attempts it took.
#[derive(Debug)]
pub struct CallOutcome<T> {
    /// Final result
    pub result: Result<T, ExternalError>,
    /// Attempts made, at least one
    pub attempts: u32,
}

/// Bounds, times out and retries every external call.
///
/// A permit is held for exactly one attempt, never across a backoff sleep.
pub struct CallGate {
    budget: Budget,
    permits: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    attempts: AtomicU64,
}

impl CallGate {
    /// Create a gate for `budget`.
    pub fn new(budget: Budget) -> Self {
        Self {
            permits: Semaphore::new(budget.max_concurrent.get()),
            budget,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
        }
    }

    /// The budget this gate enforces.
    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Run `op` under the gate, retrying transient failures with backoff.
    ///
    /// `op` is called once per attempt and must return a fresh future.
    pub async fn call<T, F, Fut>(&self, service: Service, mut op: F) -> CallOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        let mut attempts = 0;
        loop {
            let result = self.attempt(service, op()).await;
            attempts += 1;

            match result {
                Err(err) if err.is_transient() && attempts <= self.budget.max_retries => {
                    let delay = self.budget.backoff(attempts - 1);
                    warn!("{} call failed ({}), retry {} in {:?}", service, err, attempts, delay);
                    tokio::time::sleep(delay).await;
                }
                result => return CallOutcome { result, attempts },
            }
        }
    }

    async fn attempt<T>(
        &self,
        service: Service,
        call: impl Future<Output = Result<T, ExternalError>>,
    ) -> Result<T, ExternalError> {
        let Ok(_permit) = self.permits.acquire().await else {
            return Err(ExternalError::transport(service, "call gate closed"));
        };
        let _slot = InFlight::enter(self);
        self.attempts.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(self.budget.time_per_call, call).await {
            Ok(result) => result,
            Err(_) => {
                debug!("{} call timed out after {:?}", service, self.budget.time_per_call);
                Err(ExternalError::Timeout {
                    service,
                    elapsed: self.budget.time_per_call,
                })
            }
        }
    }

    /// Calls running right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most calls observed running at once since the last reset.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Start a new peak measurement window.
    pub fn reset_peak(&self) {
        self.peak.store(self.in_flight(), Ordering::SeqCst);
    }

    /// Total attempts made through this gate.
    pub fn total_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

/// Tracks one running attempt.
struct InFlight<'a> {
    gate: &'a CallGate,
}

impl<'a> InFlight<'a> {
    fn enter(gate: &'a CallGate) -> Self {
        let now = gate.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        gate.peak.fetch_max(now, Ordering::SeqCst);
        Self { gate }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A generator whose calls go through a [`CallGate`].
pub struct GatedGenerator {
    inner: Arc<dyn GenerativeMutator>,
    gate: Arc<CallGate>,
}

impl GatedGenerator {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn GenerativeMutator>, gate: Arc<CallGate>) -> Self {
        Self { inner, gate }
    }
}

#[async_trait]
impl GenerativeMutator for GatedGenerator {
    async fn generate(&self, instruction: &str) -> Result<String, ExternalError> {
        self.gate
            .call(Service::Generator, || self.inner.generate(instruction))
            .await
            .result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn budget(max: usize) -> Budget {
        Budget::new()
            .with_max_concurrent(NonZeroUsize::new(max).unwrap())
            .with_time_per_call(Duration::from_secs(1))
            .with_retries(2, Duration::from_millis(100))
    }

    #[test]
    fn test_backoff_doubles() {
        let b = budget(1);
        assert_eq!(b.backoff(0), Duration::from_millis(100));
        assert_eq!(b.backoff(1), Duration::from_millis(200));
        assert_eq!(b.backoff(2), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_budget() {
        let gate = CallGate::new(budget(3));
        let running = &AtomicUsize::new(0);
        let observed = &AtomicUsize::new(0);

        let calls = (0..12).map(|_| {
            gate.call(Service::Simulator, move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ExternalError>(())
            })
        });
        let outcomes = futures::future::join_all(calls).await;

        assert!(outcomes.iter().all(|o| o.result.is_ok() && o.attempts == 1));
        assert_eq!(observed.load(Ordering::SeqCst), 3);
        assert_eq!(gate.peak(), 3);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.total_attempts(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried_then_reported() {
        let gate = CallGate::new(budget(1));
        let started = tokio::time::Instant::now();

        let outcome = gate
            .call(Service::Oracle, || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<u8, ExternalError>(1)
            })
            .await;

        assert!(matches!(outcome.result, Err(ExternalError::Timeout { service: Service::Oracle, .. })));
        assert_eq!(outcome.attempts, 3);
        // three 1s timeouts plus 100ms and 200ms of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3300) && elapsed < Duration::from_millis(3400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let gate = CallGate::new(budget(1));
        let calls = Mutex::new(0);

        let outcome = gate
            .call(Service::Simulator, || {
                let n = {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    *calls
                };
                async move {
                    if n == 1 {
                        Err(ExternalError::transport(Service::Simulator, "connection reset"))
                    } else {
                        Ok("transcript")
                    }
                }
            })
            .await;

        assert_eq!(outcome.result.unwrap(), "transcript");
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let gate = CallGate::new(budget(1));
        let outcome = gate
            .call(Service::Generator, || async {
                Err::<(), _>(ExternalError::rejected(Service::Generator, "content policy"))
            })
            .await;
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn test_gated_generator_passes_through() {
        struct Echo;

        #[async_trait]
        impl GenerativeMutator for Echo {
            async fn generate(&self, instruction: &str) -> Result<String, ExternalError> {
                Ok(instruction.to_uppercase())
            }
        }

        let gate = Arc::new(CallGate::new(budget(2)));
        let gated = GatedGenerator::new(Arc::new(Echo), gate.clone());
        assert_eq!(gated.generate("you are").await.unwrap(), "YOU ARE");
        assert_eq!(gate.total_attempts(), 1);
    }
}
