// src/throttle.rs
// Retry and rate-limit policy objects injected into the backend-calling
// path. Shared mutable state lives behind an Arc so a gate cloned into
// several call sites still meters one bucket.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::config::RateLimitConfig;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Bounded retry schedule with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per backend, including the first call. At least 1.
    pub attempts: u32,
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
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(
            cfg.retry_attempts,
            Duration::from_secs_f64(cfg.retry_delay_seconds.max(0.0)),
        )
    }

    /// Sleep before retry number `attempt` (0-based): base * 2^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

/// Token-bucket gate acquired before every backend call. A disabled gate
/// is a no-op passthrough.
#[derive(Clone)]
pub struct RateGate {
    limiter: Option<Arc<DirectLimiter>>,
}

impl RateGate {
    pub fn per_second(calls: u32) -> Self {
        let calls = NonZeroU32::new(calls).unwrap_or(nonzero!(1u32));
        Self {
            limiter: Some(Arc::new(RateLimiter::direct(Quota::per_second(calls)))),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        if cfg.enabled {
            Self::per_second(cfg.calls_per_second)
        } else {
            Self::unlimited()
        }
    }

    /// Wait until the bucket has a token, then take it.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
