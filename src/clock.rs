//! Nanosecond clock sources
//!
//! The profiler only needs one property from its clock: readings taken on one
//! thread never go backwards. Everything else (epoch, resolution) is opaque.
//!
//! # Example
//!
//! ```
//! use scopeprof::clock::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! clock.set(100);
//! assert_eq!(clock.now(), 100);
//! clock.advance(50);
//! assert_eq!(clock.now(), 150);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Source of monotonic nanosecond timestamps
pub trait Clock: Send + Sync {
    /// Nanoseconds since an arbitrary, fixed epoch
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// `Instant`-backed clock measuring from a process-wide epoch
///
/// The epoch is captured on the first reading from any `MonotonicClock`, so
/// timestamps from different threads and registries are comparable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub const fn new() -> Self {
        MonotonicClock
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> u64 {
        let epoch = EPOCH.get_or_init(Instant::now);
        // Saturates after ~584 years of uptime.
        u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Clock that only moves when told to
///
/// Used for deterministic captures in tests and replay tooling. Shared
/// between threads through an `Arc`.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock reading 0
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    /// Create a manual clock reading `nanos`
    pub const fn with_value(nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    /// Jump to an absolute reading
    pub fn set(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Move forward by `nanos`, returning the new reading
    pub fn advance(&self, nanos: u64) -> u64 {
        self.nanos.fetch_add(nanos, Ordering::SeqCst) + nanos
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
