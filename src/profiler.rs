//! Process-wide registry of profiled threads
//!
//! A [`Profiler`] owns one fixed-size [`ThreadContext`] per thread slot, all
//! allocated when the profiler is built. A thread joins with
//! [`Profiler::declare_thread`], which costs a single `fetch_add` on the slot
//! counter and caches the slot in a thread-local. From then on every
//! [`ScopedTimer`](crate::scope::ScopedTimer) on that thread writes only to
//! its own buffer: no locks, no allocation, no shared counters.
//!
//! Reporting ([`Profiler::dump`]) reads every buffer and is meant to run once
//! the profiled threads are done (joined, or otherwise quiescent).
//!
//! # Lifecycle
//!
//! Profilers are leaked into `&'static` references so thread-locals can
//! point at them. They are built once and never torn down.
//!
//! ```
//! use scopeprof::{OutputFormat, Profiler, ProfilerConfig, ScopedTimer};
//!
//! let profiler = Profiler::new(ProfilerConfig::new(64, 2)).unwrap().leak();
//!
//! std::thread::spawn(move || {
//!     profiler.declare_thread("Main").unwrap();
//!     let _outer = ScopedTimer::new("outer");
//!     let _inner = ScopedTimer::new("inner");
//! })
//! .join()
//! .unwrap();
//!
//! let text = profiler.dump_to_string(OutputFormat::Text).unwrap();
//! assert!(text.starts_with("== 0-Main ==\n    outer: "));
//! ```

use crate::cli::OutputFormat;
use crate::clock::{Clock, MonotonicClock};
use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::event::{Event, EventSlot};
use crate::json_output::{self, write_json_string, Bounds};
use crate::text_output;
use crate::thread_context::{compute_bounds, ThreadContext};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// One row of the registry table
struct ThreadSlot {
    name: OnceLock<Cow<'static, str>>,
    context: ThreadContext,
}

/// What the calling thread is bound to
#[derive(Clone, Copy)]
struct Binding {
    profiler: &'static Profiler,
    index: usize,
}

thread_local! {
    static CURRENT: Cell<Option<Binding>> = const { Cell::new(None) };
}

static GLOBAL: OnceLock<Profiler> = OnceLock::new();

/// Registry mapping profiled threads to their event buffers
pub struct Profiler {
    config: ProfilerConfig,
    clock: Box<dyn Clock>,
    threads: Box<[CachePadded<ThreadSlot>]>,
    /// Slots handed out so far; may run past capacity on rejected declarations
    thread_count: AtomicUsize,
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.config)
            .field("declared_threads", &self.declared_threads())
            .finish_non_exhaustive()
    }
}

impl Profiler {
    /// Build a profiler on the monotonic system clock
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }

    /// Build a profiler reading timestamps from `clock`
    pub fn with_clock<C: Clock + 'static>(config: ProfilerConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Box::new(clock)))
    }

    fn build(config: ProfilerConfig, clock: Box<dyn Clock>) -> Self {
        let threads: Vec<CachePadded<ThreadSlot>> = (0..config.max_threads)
            .map(|_| {
                CachePadded::new(ThreadSlot {
                    name: OnceLock::new(),
                    context: ThreadContext::new(config.max_events),
                })
            })
            .collect();

        tracing::debug!(
            max_events = config.max_events,
            max_threads = config.max_threads,
            "profiler buffers allocated"
        );

        Self {
            config,
            clock,
            threads: threads.into_boxed_slice(),
            thread_count: AtomicUsize::new(0),
        }
    }

    /// Pin the profiler for the rest of the process
    pub fn leak(self) -> &'static Profiler {
        Box::leak(Box::new(self))
    }

    /// The process-wide profiler used by the `profile_*!` macros
    ///
    /// Built on first use from `SCOPEPROF_MAX_EVENTS` / `SCOPEPROF_MAX_THREADS`;
    /// an invalid environment falls back to the default capacities.
    pub fn global() -> &'static Profiler {
        GLOBAL.get_or_init(|| {
            let config = ProfilerConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!("{}; using default profiler capacities", e);
                ProfilerConfig::default()
            });
            Self::build(config, Box::new(MonotonicClock::new()))
        })
    }

    /// Register the calling thread under `name` and bind it to a buffer
    ///
    /// Returns the thread's slot index. Fails without side effects when the
    /// thread was already declared on this profiler. Fails when every slot is
    /// taken, leaving the thread unbound (dropping any binding to another
    /// profiler) so its scopes record nothing.
    pub fn declare_thread(&'static self, name: impl Into<Cow<'static, str>>) -> Result<usize> {
        if let Some(binding) = current_binding() {
            if std::ptr::eq(binding.profiler, self) {
                tracing::warn!(index = binding.index, "thread declared twice; keeping its slot");
                return Err(ProfilerError::AlreadyDeclared {
                    index: binding.index,
                });
            }
        }

        let index = self.thread_count.fetch_add(1, Ordering::AcqRel);
        let Some(slot) = self.threads.get(index) else {
            let capacity = self.threads.len();
            tracing::warn!(capacity, "thread table full; thread will not be profiled");
            let _ = CURRENT.try_with(|current| current.set(None));
            return Err(ProfilerError::ThreadCapacityExceeded { capacity });
        };

        let name = name.into();
        tracing::debug!(index, name = %name, "declared profiled thread");
        let _ = slot.name.set(name);
        let _ = CURRENT.try_with(|current| current.set(Some(Binding { profiler: self, index })));
        Ok(index)
    }

    /// Slot index of the calling thread on this profiler
    pub fn current_thread_index(&'static self) -> Option<usize> {
        current_binding()
            .filter(|binding| std::ptr::eq(binding.profiler, self))
            .map(|binding| binding.index)
    }

    /// Reserve and open an event on the calling thread's buffer
    ///
    /// `None` when the thread is not declared anywhere or its buffer is full.
    #[inline]
    pub(crate) fn create_event(name: &'static str) -> Option<(&'static EventSlot, &'static Profiler)> {
        let binding = current_binding()?;
        let profiler = binding.profiler;
        let slot = profiler.threads[binding.index]
            .context
            .create_event(name, profiler.clock.as_ref())?;
        Some((slot, profiler))
    }

    /// Current reading of this profiler's clock
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn config(&self) -> ProfilerConfig {
        self.config
    }

    /// Number of successfully declared threads
    pub fn declared_threads(&self) -> usize {
        self.thread_count.load(Ordering::Acquire).min(self.threads.len())
    }

    /// Scopes dropped across all threads because a buffer was full
    pub fn dropped_events(&self) -> u64 {
        self.threads[..self.declared_threads()]
            .iter()
            .map(|slot| slot.context.dropped())
            .sum()
    }

    /// Copy every declared thread's events out, in declaration order
    pub fn snapshot(&self) -> Vec<ThreadReport> {
        self.threads[..self.declared_threads()]
            .iter()
            .enumerate()
            .map(|(index, slot)| ThreadReport {
                index,
                name: slot.name.get().map(|n| n.to_string()).unwrap_or_default(),
                events: slot.context.events(),
                dropped: slot.context.dropped(),
            })
            .collect()
    }

    /// Earliest start and latest end over all declared threads
    pub fn bounds(&self) -> Bounds {
        bounds_of(&self.snapshot())
    }

    /// Render every declared thread into `out`
    pub fn dump<W: Write + ?Sized>(&self, out: &mut W, format: OutputFormat) -> Result<()> {
        let reports = self.snapshot();
        tracing::debug!(threads = reports.len(), ?format, "dumping profile");
        for report in reports.iter().filter(|r| r.dropped > 0) {
            tracing::warn!(
                index = report.index,
                name = %report.name,
                dropped = report.dropped,
                "events dropped: buffer full"
            );
        }

        match format {
            OutputFormat::Text => {
                for report in &reports {
                    text_output::render_thread(
                        &mut *out,
                        report.index,
                        &report.name,
                        &report.events,
                        report.dropped,
                    )?;
                }
            }
            OutputFormat::Json => render_document(out, &reports)?,
        }
        Ok(())
    }

    /// Render through a caller-supplied callback, one fragment per call
    pub fn dump_with<F: FnMut(&str)>(&self, sink: F, format: OutputFormat) -> Result<()> {
        self.dump(&mut CallbackSink(sink), format)
    }

    pub fn dump_to_string(&self, format: OutputFormat) -> Result<String> {
        let mut out = String::new();
        self.dump(&mut out, format)?;
        Ok(out)
    }

    /// Render into an I/O writer such as stdout or a file
    pub fn dump_to_writer<W: std::io::Write>(&self, writer: &mut W, format: OutputFormat) -> Result<()> {
        let rendered = self.dump_to_string(format)?;
        writer.write_all(rendered.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn current_binding() -> Option<Binding> {
    // TLS may already be gone when a guard drops during thread teardown.
    CURRENT.try_with(Cell::get).ok().flatten()
}

/// Adapts an `FnMut(&str)` callback to `fmt::Write`
struct CallbackSink<F>(F);

impl<F: FnMut(&str)> Write for CallbackSink<F> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

/// One thread's captured data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadReport {
    pub index: usize,
    pub name: String,
    pub events: Vec<Event>,
    pub dropped: u64,
}

impl ThreadReport {
    /// `"{index}-{name}"`, the key used in structured output
    pub fn key(&self) -> String {
        format!("{}-{}", self.index, self.name)
    }
}

/// Global bounds: earliest first-event start and latest end, over non-empty
/// threads. `{0, 0}` when nothing was recorded.
pub fn bounds_of(reports: &[ThreadReport]) -> Bounds {
    reports
        .iter()
        .filter_map(|report| compute_bounds(&report.events))
        .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
        .map(|(min, max)| Bounds { min, max })
        .unwrap_or_default()
}

fn render_document<W: Write + ?Sized>(out: &mut W, reports: &[ThreadReport]) -> fmt::Result {
    let bounds = bounds_of(reports);
    out.write_str("{\n")?;
    writeln!(
        out,
        "  \"bounds\": {{\"min\": {}, \"max\": {}}},",
        bounds.min, bounds.max
    )?;
    out.write_str("  \"threads\": {")?;
    for (i, report) in reports.iter().enumerate() {
        out.write_str(if i == 0 { "\n    " } else { ",\n    " })?;
        write_json_string(&mut *out, &report.key())?;
        out.write_str(": ")?;
        json_output::render_thread(&mut *out, &report.events)?;
    }
    if !reports.is_empty() {
        out.write_str("\n  ")?;
    }
    out.write_str("}\n}\n")
}
