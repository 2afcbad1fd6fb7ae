//! Error types for the resume API crate.

use thiserror::Error;

/// Result type alias for resume API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown kind '{kind}', expected one of: profile, jobexperience, certification")]
    UnknownKind { kind: String },

    #[error("{kind} has no API version '{version}'")]
    UnknownVersion { kind: String, version: String },

    #[error("expected {expected}, found '{found}'")]
    KindMismatch { expected: String, found: String },

    #[error("failed to parse manifest: {reason}")]
    Parse { reason: String },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: String, reason: String },

    #[error("{kind} is a component and needs its collection manifest")]
    MissingCollection { kind: String },

    #[error("failed to render {file}: {reason}")]
    Render { file: String, reason: String },

    #[error(transparent)]
    Core(#[from] resume_core::Error),
}

impl ApiError {
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    pub fn unknown_version(kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self::UnknownVersion {
            kind: kind.into(),
            version: version.into(),
        }
    }

    pub fn kind_mismatch(expected: impl ToString, found: impl Into<String>) -> Self {
        Self::KindMismatch {
            expected: expected.to_string(),
            found: found.into(),
        }
    }

    pub fn parse(reason: impl ToString) -> Self {
        Self::Parse {
            reason: reason.to_string(),
        }
    }

    pub fn invalid(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn render(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Render {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}
