//! Global throughput cap shared by every worker.
//!
//! The limiter keeps a single "next free instant" on a virtual clock. Each
//! [`RateLimiter::acquire`] reserves the slot `max(next_free, now)` and moves
//! the clock forward by one interval with a compare-and-swap retry loop, so
//! grants across all callers are spaced by at least `1 / rate` without a lock.
//!
//! Idle periods heal themselves: when nobody has called `acquire` for a while,
//! `next_free` lies in the past and the next caller proceeds immediately.
//!
//! ```
//! use factpipe_lib::rate_limiter::RateLimiter;
//!
//! let limiter = RateLimiter::new(1_000);
//! limiter.acquire(); // first grant is immediate
//! limiter.acquire(); // second grant waits ~1ms
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Lock-free rate limiter driven by a shared virtual schedule.
#[derive(Debug)]
pub struct RateLimiter {
    /// Reference point for the virtual clock.
    origin: Instant,
    /// Minimum spacing between two grants.
    interval_nanos: u64,
    /// Next free slot, in nanoseconds since `origin`.
    next_free_nanos: AtomicU64,
    shut_down: AtomicBool,
}

impl RateLimiter {
    /// Creates a limiter granting `permits_per_second` permits. Values below 1
    /// are clamped to 1.
    #[must_use]
    pub fn new(permits_per_second: u32) -> Self {
        let rate = u64::from(permits_per_second.max(1));
        Self {
            origin: Instant::now(),
            interval_nanos: NANOS_PER_SECOND / rate,
            next_free_nanos: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Minimum spacing between two consecutive grants.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos)
    }

    /// Blocks the calling thread until it may proceed.
    ///
    /// Never fails. Contending callers retry with a fresh `now`, so the retry
    /// loop is bounded by contention rather than by caller priority.
    pub fn acquire(&self) {
        if self.shut_down.load(Ordering::Acquire) {
            return;
        }
        loop {
            let now = self.now_nanos();
            let prev = self.next_free_nanos.load(Ordering::Acquire);
            let target = prev.max(now);
            let next = target.saturating_add(self.interval_nanos);
            if self
                .next_free_nanos
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                if target > now {
                    thread::sleep(Duration::from_nanos(target - now));
                }
                return;
            }
            std::hint::spin_loop();
        }
    }

    /// Stops throttling: subsequent `acquire` calls return immediately.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}
