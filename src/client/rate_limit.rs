//! Reactive rate limiting for the catalog API
//!
//! Requests go out unthrottled until the backend answers 429. From then on
//! every request waits on a token bucket sized from the configured rate.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

/// Requests per second allowed once throttling is active
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Limiter that only engages after the server has pushed back.
pub struct ReactiveRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
}

impl ReactiveRateLimiter {
    pub fn new(per_second: u32) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            active: AtomicBool::new(false),
        }
    }

    /// Start throttling (called on a 429 response).
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated after 429 response");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for a permit if throttling is active; returns immediately otherwise.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            self.limiter.until_ready().await;
        }
    }
}

impl Default for ReactiveRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}
