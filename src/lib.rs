//! scopeprof - Lightweight scoped call-duration profiler
//!
//! Threads declare themselves once, then time named scopes with RAII guards.
//! Events land in fixed-size per-thread buffers in scope-entry order, with no
//! locking or allocation on the hot path. At report time each buffer is
//! replayed into a nested call tree (no parent pointers are stored) and
//! rendered as indented text or JSON.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod json_output;
pub mod profiler;
pub mod reconstruct;
pub mod scope;
pub mod text_output;
pub mod thread_context;

pub use cli::OutputFormat;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ProfilerConfig, MAX_EVENTS, MAX_PROFILED_THREADS};
pub use error::{ProfilerError, Result};
pub use event::Event;
pub use profiler::{Profiler, ThreadReport};
pub use scope::ScopedTimer;
