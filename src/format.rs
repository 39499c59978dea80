//! Human-readable duration formatting
//!
//! Durations are scaled to the largest unit they reach and printed with two
//! truncated decimal digits: `1_500` ns prints as `1.50 us`, `999_999_999` ns
//! as `999.99 ms`.

use std::fmt;

/// Display unit picked for a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanos,
    Micros,
    Millis,
    Seconds,
}

impl TimeUnit {
    /// Pick the unit for a duration in nanoseconds
    pub fn for_duration(nanos: u64) -> Self {
        if nanos >= 1_000_000_000 {
            TimeUnit::Seconds
        } else if nanos >= 1_000_000 {
            TimeUnit::Millis
        } else if nanos >= 1_000 {
            TimeUnit::Micros
        } else {
            TimeUnit::Nanos
        }
    }

    /// Nanoseconds per unit
    pub fn divider(self) -> u64 {
        match self {
            TimeUnit::Nanos => 1,
            TimeUnit::Micros => 1_000,
            TimeUnit::Millis => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanos => "ns",
            TimeUnit::Micros => "us",
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
        }
    }
}

/// A duration split into unit, integer part and hundredths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledDuration {
    pub whole: u64,
    pub hundredths: u64,
    pub unit: TimeUnit,
}

impl ScaledDuration {
    pub fn from_nanos(nanos: u64) -> Self {
        let unit = TimeUnit::for_duration(nanos);
        let divider = unit.divider();
        let whole = nanos / divider;
        // Nanoseconds have no sub-unit digits to show.
        let hundredths = match divider / 100 {
            0 => 0,
            step => (nanos % divider) / step,
        };
        Self {
            whole,
            hundredths,
            unit,
        }
    }
}

impl fmt::Display for ScaledDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} {}", self.whole, self.hundredths, self.unit.suffix())
    }
}

/// Format a nanosecond duration, e.g. `format_duration(1_500) == "1.50 us"`
pub fn format_duration(nanos: u64) -> String {
    ScaledDuration::from_nanos(nanos).to_string()
}
