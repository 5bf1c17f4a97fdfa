//! Unified error handling for the tapedeck crate
//!
//! Every failure that can cross a module boundary is folded into the
//! [`Error`] enum here. The engine converts store and remote-publisher
//! failures into one of these variants before they reach the command
//! router, which in turn maps them onto a single user-visible
//! [`ReactionKind`].

use std::io;
use thiserror::Error;

use crate::models::ReactionKind;

/// Unified error type for the tapedeck crate
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistence failed (I/O, schema, lock poisoning)
    #[error("entry store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// The remote platform rejected or failed an operation
    #[error("remote publish failed: {reason}")]
    PublishFailed { reason: String, recoverable: bool },

    /// No matching item or playlist
    #[error("no matching entry")]
    NotFound,

    /// A remote call exceeded its deadline; treated as a failure,
    /// never as a success (the local store is not mutated)
    #[error("remote call timed out during {operation}")]
    Timeout { operation: &'static str },

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error from any underlying cause
    pub fn store(source: impl Into<anyhow::Error>) -> Self {
        Self::StoreUnavailable(source.into())
    }

    /// Create a non-recoverable publish failure (remote rejected the request)
    pub fn publish_rejected(reason: impl Into<String>) -> Self {
        Self::PublishFailed {
            reason: reason.into(),
            recoverable: false,
        }
    }

    /// Create a recoverable publish failure (remote or network hiccup)
    pub fn publish_unavailable(reason: impl Into<String>) -> Self {
        Self::PublishFailed {
            reason: reason.into(),
            recoverable: true,
        }
    }

    /// Check if this error is recoverable (worth retrying later)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::PublishFailed { recoverable, .. } => *recoverable,
            Self::NotFound => false,
            Self::Timeout { .. } => true,
            Self::Config(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
        }
    }

    /// Map to the acknowledgement the chat layer should show the user
    pub fn reaction(&self) -> ReactionKind {
        match self {
            Self::NotFound => ReactionKind::NotFound,
            Self::Config(_) | Self::Json(_) => ReactionKind::FatalError,
            _ if self.is_recoverable() => ReactionKind::TransientError,
            _ => ReactionKind::FatalError,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreUnavailable(anyhow::Error::new(err))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
