//! Error types for the cold-path profiler API
//!
//! Capture (thread declaration aside) never fails loudly: a scope that cannot
//! get a slot simply records nothing. Errors only surface from configuration,
//! thread declaration and reporting.

use thiserror::Error;

/// Errors returned by registry setup, thread declaration and reporting
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Thread table full: all {capacity} profiled thread slots are taken")]
    ThreadCapacityExceeded { capacity: usize },

    #[error("Thread already declared on this profiler (slot {index})")]
    AlreadyDeclared { index: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid thread key: {0}")]
    InvalidThreadKey(String),

    #[error("Failed to render profile: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProfilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_message() {
        let err = ProfilerError::ThreadCapacityExceeded { capacity: 16 };
        assert_eq!(
            err.to_string(),
            "Thread table full: all 16 profiled thread slots are taken"
        );
    }

    #[test]
    fn test_fmt_error_converts() {
        let err: ProfilerError = std::fmt::Error.into();
        assert!(matches!(err, ProfilerError::Format(_)));
    }
}
