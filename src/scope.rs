//! RAII scope timing
//!
//! ```
//! use scopeprof::{profile_scope, profile_thread};
//!
//! fn load_assets() {
//!     profile_scope!("load_assets");
//!     // ...
//! }
//!
//! profile_thread!("Main");
//! {
//!     profile_scope!("startup");
//!     load_assets();
//! }
//! ```

use crate::event::EventSlot;
use crate::profiler::Profiler;
use std::marker::PhantomData;

/// Guard measuring the time between its creation and its drop
///
/// Creating a guard appends an event to the calling thread's buffer; dropping
/// it (normal return, early return, `?`, or unwinding) stamps the end time. On
/// a thread that was never declared, or whose buffer is full, the guard
/// records nothing.
///
/// The guard is `!Send`: its slot belongs to the thread that created it.
#[must_use = "the scope is timed until this guard is dropped"]
pub struct ScopedTimer {
    open: Option<(&'static EventSlot, &'static Profiler)>,
    _not_send: PhantomData<*const ()>,
}

impl ScopedTimer {
    /// Start timing a scope called `name`
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            open: Profiler::create_event(name),
            _not_send: PhantomData,
        }
    }

    /// Whether this guard got a slot and will record an event
    pub fn is_recording(&self) -> bool {
        self.open.is_some()
    }
}

impl Drop for ScopedTimer {
    #[inline]
    fn drop(&mut self) {
        if let Some((slot, profiler)) = self.open.take() {
            slot.close(profiler.now());
        }
    }
}

/// Declare the current thread on the global profiler
///
/// Silently ignores a full thread table or a repeated declaration. Use
/// [`Profiler::declare_thread`](crate::Profiler::declare_thread) directly to
/// observe those.
#[macro_export]
macro_rules! profile_thread {
    ($name:expr) => {
        let _ = $crate::Profiler::global().declare_thread($name);
    };
}

/// Time the rest of the enclosing block
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _scope_timer = $crate::ScopedTimer::new($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ProfilerConfig;
    use crate::event::Event;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_undeclared_thread_records_nothing() {
        thread::spawn(|| {
            let timer = ScopedTimer::new("nowhere");
            assert!(!timer.is_recording());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_early_return_still_closes() {
        let clock = Arc::new(ManualClock::new());
        let profiler = Profiler::with_clock(ProfilerConfig::new(8, 1), Arc::clone(&clock))
            .unwrap()
            .leak();

        fn parse(clock: &ManualClock, input: &str) -> Result<u32, std::num::ParseIntError> {
            let _timer = ScopedTimer::new("parse");
            clock.advance(40);
            let value = input.parse::<u32>()?;
            clock.advance(1_000);
            Ok(value)
        }

        thread::spawn(move || {
            profiler.declare_thread("parser").unwrap();
            clock.set(10);
            assert!(parse(&clock, "not a number").is_err());
        })
        .join()
        .unwrap();

        assert_eq!(profiler.snapshot()[0].events, vec![Event::new("parse", 10, 50)]);
    }

    #[test]
    fn test_unwinding_closes_scope() {
        let clock = Arc::new(ManualClock::new());
        let profiler = Profiler::with_clock(ProfilerConfig::new(8, 1), Arc::clone(&clock))
            .unwrap()
            .leak();

        let worker_clock = Arc::clone(&clock);
        let result = thread::spawn(move || {
            profiler.declare_thread("panicky").unwrap();
            worker_clock.set(5);
            let _timer = ScopedTimer::new("doomed");
            worker_clock.set(9);
            panic!("boom");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(profiler.snapshot()[0].events, vec![Event::new("doomed", 5, 9)]);
    }

    #[test]
    fn test_full_buffer_guard_is_inert() {
        let profiler = Profiler::with_clock(ProfilerConfig::new(1, 1), ManualClock::with_value(3))
            .unwrap()
            .leak();
        thread::spawn(move || {
            profiler.declare_thread("tiny").unwrap();
            let first = ScopedTimer::new("kept");
            let second = ScopedTimer::new("dropped");
            assert!(first.is_recording());
            assert!(!second.is_recording());
        })
        .join()
        .unwrap();

        assert_eq!(profiler.dropped_events(), 1);
        assert_eq!(profiler.snapshot()[0].events, vec![Event::new("kept", 3, 3)]);
    }
}
