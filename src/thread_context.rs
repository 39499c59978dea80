//! Per-thread bounded event buffer
//!
//! A [`ThreadContext`] is an append-only array of event slots written by
//! exactly one thread. Slots are handed out in scope-entry order, which is the
//! ordering the call-tree reconstruction depends on: a scope entered while
//! another is open always lands at a later index than its parent.
//!
//! When the buffer is full, new scopes get no slot. The drop is counted and
//! otherwise silent.

use crate::clock::Clock;
use crate::event::{Event, EventSlot};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Fixed-capacity event buffer owned by one profiled thread
#[derive(Debug)]
pub struct ThreadContext {
    slots: Box<[EventSlot]>,
    /// Number of published slots; only the owning thread stores to it
    len: AtomicUsize,
    /// Scopes refused because the buffer was full
    dropped: AtomicU64,
}

impl ThreadContext {
    /// Allocate a buffer with room for `capacity` events
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<EventSlot> = (0..capacity).map(|_| EventSlot::new()).collect();
        Self {
            slots: slots.into_boxed_slice(),
            len: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Reserve the next slot and stamp it with `name` and the current time
    ///
    /// Returns `None` once the buffer is full. Must only be called from the
    /// thread that owns this context.
    #[inline]
    pub(crate) fn create_event(&self, name: &'static str, clock: &dyn Clock) -> Option<&EventSlot> {
        let index = self.len.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(index) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        slot.open(name, clock.now());
        self.len.store(index + 1, Ordering::Release);
        Some(slot)
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of events this buffer holds
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Scopes dropped because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Copy the recorded events out, in insertion order
    pub fn events(&self) -> Vec<Event> {
        self.slots[..self.len()]
            .iter()
            .map(EventSlot::snapshot)
            .collect()
    }

    /// Earliest start and latest end in this buffer, `None` when empty
    pub fn bounds(&self) -> Option<(u64, u64)> {
        compute_bounds(&self.events())
    }
}

/// Time bounds of one thread's events
///
/// The first event has the earliest start because slots are filled in entry
/// order; the latest end has to be searched for.
pub fn compute_bounds(events: &[Event]) -> Option<(u64, u64)> {
    let first = events.first()?;
    let max = events.iter().map(|e| e.end).fold(first.end, u64::max);
    Some((first.start, max))
}
