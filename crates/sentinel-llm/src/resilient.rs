//! Throttling and rate-limit retry around any [`Generator`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sentinel_core::error::{Result, SentinelError};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::ports::{GenerationRequest, Generator};

/// How rate-limited calls are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the second attempt; doubles on each further one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (zero-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub struct ResilientGenerator {
    inner: Arc<dyn Generator>,
    policy: RetryPolicy,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl ResilientGenerator {
    pub fn new(inner: Arc<dyn Generator>, policy: RetryPolicy, min_interval: Duration) -> Self {
        Self {
            inner,
            policy,
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous call started
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                let wait = ready_at - Instant::now();
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Throttling generator call");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[async_trait]
impl Generator for ResilientGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0;

        loop {
            self.throttle().await;
            match self.inner.generate(request).await {
                Err(SentinelError::RateLimited { provider }) if attempt + 1 < attempts => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        %provider,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Generator rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a rate limit a fixed number of times, then answers
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Generator for Flaky {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(SentinelError::RateLimited {
                    provider: "test".into(),
                })
            } else {
                Ok(format!("resposta {}", call + 1))
            }
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    struct Broken;

    #[async_trait]
    impl Generator for Broken {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Err(SentinelError::GeneratorUnavailable {
                reason: "down".into(),
                remediation: "wait".into(),
            })
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_recovers_after_rate_limits() {
        let inner = Flaky::new(2);
        let generator = ResilientGenerator::new(inner.clone(), fast_policy(), Duration::ZERO);

        let reply = generator.generate(&GenerationRequest::new("oi")).await.unwrap();
        assert_eq!(reply, "resposta 3");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_last_attempt() {
        let inner = Flaky::new(5);
        let generator = ResilientGenerator::new(inner.clone(), fast_policy(), Duration::ZERO);

        let err = generator.generate(&GenerationRequest::new("oi")).await.unwrap_err();
        assert!(matches!(err, SentinelError::RateLimited { .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let generator = ResilientGenerator::new(Arc::new(Broken), fast_policy(), Duration::ZERO);
        let err = generator.generate(&GenerationRequest::new("oi")).await.unwrap_err();
        assert!(matches!(err, SentinelError::GeneratorUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_calls_are_spaced_by_min_interval() {
        let interval = Duration::from_millis(40);
        let generator = ResilientGenerator::new(Flaky::new(0), fast_policy(), interval);
        let request = GenerationRequest::new("oi");

        let started = Instant::now();
        generator.generate(&request).await.unwrap();
        generator.generate(&request).await.unwrap();
        assert!(started.elapsed() >= interval);
        assert_eq!(generator.model_name(), "flaky");
    }
}
