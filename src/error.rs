//! Error types for xstorage.
//!
//! Errors are strongly typed using thiserror. A composer only ever fails on
//! input it cannot interpret; everything else (a child resource that does not
//! exist yet, an annotation the provider has not written yet) is ordinary
//! control flow and never reaches these types.

use thiserror::Error;

/// Validation errors raised while reading the observed composite resource.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' is invalid: {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },

    #[error("Request does not contain an observed composite resource")]
    MissingComposite,
}

impl ValidationError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Transport errors for the gRPC adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid protobuf Struct: {message}")]
    InvalidStruct {
        message: String,
    },
}

/// Top-level error type for xstorage.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ComposeError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this error originated in the transport adapter.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the whole invocation must be reported as failed.
    ///
    /// Every error a composer returns is fatal to the invocation; waiting on a
    /// dependency is expressed through `Composition`, not through an error.
    #[must_use]
    pub const fn is_fatal_to_invocation(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Serialization { .. } | Self::Internal { .. } => true,
            Self::Transport(_) => false,
        }
    }
}

impl From<serde_json::Error> for ComposeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;
