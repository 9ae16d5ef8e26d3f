//! Error types for the access engine

use std::io;
use thiserror::Error;

use crate::guard::Denial;

/// Result type alias for access engine operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Errors raised by the access engine.
///
/// A denied authorization is not an error; these cover the cases where a
/// correct decision cannot be made. Callers treat every variant as deny.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Facts are ambiguous or malformed (e.g. two active staff relations)
    #[error("data integrity error for principal '{principal}': {message}")]
    DataIntegrity {
        /// Principal the facts belong to
        principal: String,
        /// What is wrong with the facts
        message: String,
    },

    /// Capability table file could not be parsed or validated
    #[error("invalid capability table: {0}")]
    Config(String),

    /// Failed to read a capability table file
    #[error("failed to read capability table '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Session token did not resolve to an identity
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A fact provider lookup failed
    #[error("{lookup} lookup failed: {message}")]
    Lookup {
        /// Which lookup failed (session, profile, ...)
        lookup: &'static str,
        /// Provider error message
        message: String,
    },

    /// An owner action was denied by the guard
    #[error("forbidden: {}", .0.reason())]
    Forbidden(Box<Denial>),

    /// Owner action on a business the actor does not own
    #[error("'{principal}' does not own business '{business}'")]
    NotOwner {
        /// Acting principal
        principal: String,
        /// Business the relation belongs to
        business: String,
    },

    /// Staff relation state change that is not allowed from the current state
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

impl AccessError {
    /// Create a DataIntegrity error
    pub fn integrity(principal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            principal: principal.into(),
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Io error
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a Lookup error
    pub fn lookup(lookup: &'static str, message: impl Into<String>) -> Self {
        Self::Lookup {
            lookup,
            message: message.into(),
        }
    }

    /// Create a Forbidden error from a guard denial
    pub fn forbidden(denial: Denial) -> Self {
        Self::Forbidden(Box::new(denial))
    }

    /// Whether the error comes from inconsistent facts
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::DataIntegrity { .. })
    }
}
