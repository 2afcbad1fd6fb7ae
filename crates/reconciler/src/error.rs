//! Error types for the reconciler crate.

use resume_core::ObjectKey;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The object store rejected or failed a call.
    #[error(transparent)]
    Store(#[from] resume_core::Error),

    /// An explicit collection reference matched nothing (yet).
    #[error("{kind} collection '{key}' not found")]
    CollectionNotFound { kind: String, key: ObjectKey },

    /// No explicit reference was given and the store does not hold exactly
    /// one collection.
    #[error("expected exactly 1 {kind} collection, found {found}")]
    CollectionCountMismatch { kind: String, found: usize },

    /// A resource generator rejected its input.
    #[error("generating resources for {kind} failed: {reason}")]
    Generate { kind: String, reason: String },

    /// A mutation hook failed.
    #[error("mutating {object} failed: {reason}")]
    Mutate { object: String, reason: String },

    /// A dependency checker failed (as opposed to reporting not-ready).
    #[error("dependency check for {kind} failed: {reason}")]
    Dependency { kind: String, reason: String },

    /// The request context was cancelled mid-pass.
    #[error("reconciliation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    pub fn collection_not_found(kind: impl Into<String>, key: ObjectKey) -> Self {
        Self::CollectionNotFound {
            kind: kind.into(),
            key,
        }
    }

    pub fn collection_count_mismatch(kind: impl Into<String>, found: usize) -> Self {
        Self::CollectionCountMismatch {
            kind: kind.into(),
            found,
        }
    }

    pub fn generate(kind: impl Into<String>, reason: impl ToString) -> Self {
        Self::Generate {
            kind: kind.into(),
            reason: reason.to_string(),
        }
    }

    pub fn mutate(object: impl ToString, reason: impl ToString) -> Self {
        Self::Mutate {
            object: object.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn dependency(kind: impl Into<String>, reason: impl ToString) -> Self {
        Self::Dependency {
            kind: kind.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_conflict())
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Errors that resolve themselves on a later pass.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::CollectionNotFound { .. } | Self::Cancelled => true,
            _ => false,
        }
    }
}
