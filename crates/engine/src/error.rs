//! Error types for builder initialization and substitution.
//!
//! Responsibilities:
//! - Define the error taxonomy: configuration errors, backing-source errors,
//!   and errors raised by the host while the engine calls back into it.
//! - Wrap every error leaving a builder with the builder name and the phase
//!   it failed in.
//!
//! Invariants:
//! - Configuration errors are never swallowed, regardless of `enabled`.
//! - A host error nested anywhere under a wrapper leads the wrapper's message.
//! - Error messages never include resolved values.

use std::fmt;
use thiserror::Error;

/// Error type returned by backing sources.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for backing-source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for builder operations.
pub type Result<T> = std::result::Result<T, BuilderError>;

/// The builder operation an error escaped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialization,
    GetValue,
    GetAllValues,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initialization => f.write_str("Initialization Error"),
            Phase::GetValue => f.write_str("GetValue() Error"),
            Phase::GetAllValues => f.write_str("GetAllValues() Error"),
        }
    }
}

/// Errors produced while configuring or running a builder.
#[derive(Error, Debug)]
pub enum BuilderError {
    /// A builder option is missing, malformed, or conflicts with another.
    #[error("Invalid value for {option}: {message}")]
    InvalidOption { option: String, message: String },

    /// A required builder option was not supplied.
    #[error("Missing required option: {0}")]
    MissingOption(String),

    /// The backing source failed.
    #[error("Backing source failed")]
    Source(#[source] SourceError),

    /// A previous initialization panicked and took the backing source with it.
    #[error("Builder initialization panicked; the backing source is unusable")]
    Poisoned,

    /// The host's own loading machinery failed while the engine called into it.
    #[error("{0}")]
    Host(String),

    /// An error wrapped with the builder name and phase.
    #[error("{message}")]
    Builder {
        builder: String,
        phase: Phase,
        message: String,
        #[source]
        source: Box<BuilderError>,
    },
}

impl BuilderError {
    /// Shorthand for an `InvalidOption` error.
    pub fn invalid_option(option: &str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.to_string(),
            message: message.into(),
        }
    }

    /// Wrap `error` with the builder name and phase.
    ///
    /// Errors already wrapped for the same builder pass through unchanged.
    pub fn wrap(builder: &str, phase: Phase, error: BuilderError) -> Self {
        if let Self::Builder { builder: inner, .. } = &error {
            if inner == builder {
                return error;
            }
        }

        let label = format!("'{builder}' {phase}");
        let message = match error.host_message() {
            Some(host) => format!("{host} ({label})"),
            None => label,
        };

        Self::Builder {
            builder: builder.to_string(),
            phase,
            message,
            source: Box::new(error),
        }
    }

    /// Returns the message of the first host error in this error's chain.
    pub fn host_message(&self) -> Option<&str> {
        match self {
            Self::Host(message) => Some(message),
            Self::Builder { source, .. } => source.host_message(),
            _ => None,
        }
    }

    /// True for configuration errors, which `enabled=Optional` never swallows.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidOption { .. } | Self::MissingOption(_) => true,
            Self::Builder { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// The phase of the outermost wrapper, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Builder { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
