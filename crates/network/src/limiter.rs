//! Outbound rate limiting for the OpenAlex API
//!
//! GCRA limiter from the `governor` crate emitting one cell every
//! `window / max_requests`, so no half-open window of length `window` ever
//! admits more than `max_requests` callers. Waiters queue on a fair mutex
//! and are admitted in arrival order.

use citeforge_common::errors::{AppError, Result};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GcraLimiter,
};
use std::time::Duration;
use tokio::sync::Mutex;

/// Unkeyed in-memory GCRA limiter
pub type DirectLimiter = GcraLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Process-wide request budget shared by every fetch
pub struct RateLimiter {
    gcra: DirectLimiter,
    queue: Mutex<()>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Admit at most `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(AppError::Configuration {
                message: "rate limit must admit at least one request".to_string(),
            });
        }

        let quota = Quota::with_period(window / max_requests).ok_or_else(|| AppError::Configuration {
            message: format!("rate limit window too short: {:?}", window),
        })?;

        Ok(Self {
            gcra: GcraLimiter::direct(quota),
            queue: Mutex::new(()),
            max_requests,
            window,
        })
    }

    /// Wait for a slot in the budget and consume it
    pub async fn acquire(&self) {
        let _turn = self.queue.lock().await;
        self.gcra.until_ready().await;
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}
