//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Rejected input: {0}")]
    RejectedInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Ambiguous local time: {0}")]
    AmbiguousLocalTime(String),

    #[error("Nonexistent local time: {0}")]
    NonexistentLocalTime(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Dependency degraded: {0}")]
    DependencyDegraded(String),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl SchedulingError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SchedulingError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
