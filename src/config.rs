// Capacity configuration for the profiler registry
//
// Every buffer is allocated up front from these numbers, so they are fixed for
// the lifetime of a registry. Nothing grows on the hot path.

use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};

/// Default number of events recorded per thread before new scopes are dropped
pub const MAX_EVENTS: usize = 4096;

/// Default number of threads a registry can hold
pub const MAX_PROFILED_THREADS: usize = 16;

/// Environment variable overriding [`ProfilerConfig::max_events`]
pub const ENV_MAX_EVENTS: &str = "SCOPEPROF_MAX_EVENTS";

/// Environment variable overriding [`ProfilerConfig::max_threads`]
pub const ENV_MAX_THREADS: &str = "SCOPEPROF_MAX_THREADS";

/// Registry capacities
///
/// Memory use is `max_events * max_threads` event slots, reserved when the
/// registry is built.
///
/// # Example
/// ```
/// use scopeprof::config::ProfilerConfig;
///
/// let config = ProfilerConfig::default();
/// assert_eq!(config.max_events, 4096);
/// assert_eq!(config.max_threads, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Per-thread event capacity
    pub max_events: usize,

    /// Number of thread slots
    pub max_threads: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            max_events: MAX_EVENTS,
            max_threads: MAX_PROFILED_THREADS,
        }
    }
}

impl ProfilerConfig {
    /// Create a configuration with explicit capacities
    pub fn new(max_events: usize, max_threads: usize) -> Self {
        Self {
            max_events,
            max_threads,
        }
    }

    /// Build a configuration from `SCOPEPROF_MAX_EVENTS` / `SCOPEPROF_MAX_THREADS`,
    /// falling back to the defaults for unset variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_EVENTS) {
            config.max_events = parse_capacity(ENV_MAX_EVENTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_THREADS) {
            config.max_threads = parse_capacity(ENV_MAX_THREADS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_events == 0 {
            return Err(ProfilerError::InvalidConfig(
                "max_events must be > 0".to_string(),
            ));
        }

        if self.max_threads == 0 {
            return Err(ProfilerError::InvalidConfig(
                "max_threads must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Total number of event slots this configuration reserves
    pub fn total_slots(&self) -> usize {
        self.max_events.saturating_mul(self.max_threads)
    }
}

fn parse_capacity(key: &str, raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|e| {
        ProfilerError::InvalidConfig(format!("{} must be an unsigned integer, got {:?}: {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ProfilerConfig::default();
        assert_eq!(config.max_events, MAX_EVENTS);
        assert_eq!(config.max_threads, MAX_PROFILED_THREADS);
        assert!(config.validate().is_ok());
        assert_eq!(config.total_slots(), 4096 * 16);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ProfilerConfig::new(0, 4).validate().is_err());
        assert!(ProfilerConfig::new(4, 0).validate().is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config =
            ProfilerConfig::from_lookup(lookup_from(&[(ENV_MAX_EVENTS, "128"), (ENV_MAX_THREADS, " 4 ")]))
                .unwrap();
        assert_eq!(config, ProfilerConfig::new(128, 4));
    }

    #[test]
    fn test_from_lookup_partial_override_keeps_defaults() {
        let config = ProfilerConfig::from_lookup(lookup_from(&[(ENV_MAX_THREADS, "2")])).unwrap();
        assert_eq!(config.max_events, MAX_EVENTS);
        assert_eq!(config.max_threads, 2);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ProfilerConfig::from_lookup(lookup_from(&[(ENV_MAX_EVENTS, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_EVENTS));
    }

    #[test]
    fn test_from_lookup_rejects_zero() {
        assert!(ProfilerConfig::from_lookup(lookup_from(&[(ENV_MAX_EVENTS, "0")])).is_err());
    }

    #[test]
    fn test_config_serde() {
        let json = serde_json::to_string(&ProfilerConfig::new(8, 2)).unwrap();
        assert_eq!(json, r#"{"max_events":8,"max_threads":2}"#);
    }
}
