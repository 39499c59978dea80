//! Recorded scope events
//!
//! An [`Event`] is the immutable snapshot handed to reporting code. The live,
//! writable storage behind it is an [`EventSlot`], which only the owning
//! thread's [`ScopedTimer`](crate::scope::ScopedTimer) ever writes.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

/// One finished (or snapshotted) scope measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Event {
    /// Scope entry timestamp (ns)
    pub start: u64,
    /// Scope exit timestamp (ns)
    pub end: u64,
    /// Scope name, borrowed for the life of the program
    pub name: &'static str,
}

impl Event {
    pub const fn new(name: &'static str, start: u64, end: u64) -> Self {
        Self { start, end, name }
    }

    /// Elapsed time between entry and exit
    #[inline]
    pub fn duration_ns(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether `other` lies inside this event's interval end-wise
    ///
    /// Only meaningful for an `other` recorded later on the same thread.
    #[inline]
    pub fn encloses(&self, other: &Event) -> bool {
        other.end <= self.end
    }
}

/// Pre-allocated storage for one event
///
/// Fields are atomics so the owning thread can write while the slot sits in
/// a shared registry; there is never more than one writer per slot.
#[derive(Debug)]
pub(crate) struct EventSlot {
    start: AtomicU64,
    end: AtomicU64,
    /// Set once `end` holds the exit timestamp
    closed: AtomicBool,
    name: OnceLock<&'static str>,
}

impl EventSlot {
    pub(crate) fn new() -> Self {
        Self {
            start: AtomicU64::new(0),
            end: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            name: OnceLock::new(),
        }
    }

    /// Stamp name and entry time. Called once, before the slot is published.
    #[inline]
    pub(crate) fn open(&self, name: &'static str, start: u64) {
        let fresh = self.name.set(name).is_ok();
        debug_assert!(fresh, "event slot opened twice");
        self.start.store(start, Ordering::Relaxed);
    }

    /// Stamp exit time
    #[inline]
    pub(crate) fn close(&self, end: u64) {
        self.end.store(end, Ordering::Relaxed);
        self.closed.store(true, Ordering::Release);
    }

    /// Read the slot as an [`Event`]
    ///
    /// A scope that is still open reads as zero-length (`end == start`), so it
    /// reconstructs as a leaf instead of swallowing later siblings.
    pub(crate) fn snapshot(&self) -> Event {
        let start = self.start.load(Ordering::Acquire);
        let end = if self.closed.load(Ordering::Acquire) {
            self.end.load(Ordering::Relaxed)
        } else {
            start
        };
        Event {
            start,
            end,
            name: self.name.get().copied().unwrap_or(""),
        }
    }
}
