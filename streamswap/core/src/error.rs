//! Error Taxonomy
//!
//! Three kinds of session failure:
//!
//! - **Cancellation**: the expected outcome of supersession, abort or shutdown.
//!   Not a failure. It never reaches the diagnostic channel or an error event.
//! - **Transport**: non-success status, network failure before any byte was
//!   read, or a request that could not be built.
//! - **Stream read**: failure while reading the body mid-stream.

use thiserror::Error;

use crate::element::ElementId;
use crate::registry::CancelReason;

/// Failure dispatching a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("HTTP error! status: {status} for {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Dispatched URL
        url: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure reading the response body mid-stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stream read error: {0}")]
pub struct StreamReadError(pub String);

impl StreamReadError {
    /// Create from anything displayable
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// Why a streaming session did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The session's cancellation handle was signaled
    #[error("Streaming cancelled ({0})")]
    Cancelled(CancelReason),

    /// Dispatch failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading the body failed
    #[error(transparent)]
    StreamRead(#[from] StreamReadError),
}

impl StreamError {
    /// Whether this is a cancellation rather than a failure
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Short machine-readable kind, used as the error event's `error` field
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled(_) => "cancelled",
            Self::Transport(_) => "transport",
            Self::StreamRead(_) => "stream-read",
        }
    }
}

/// Failure preparing a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    /// The host no longer knows the element
    #[error("Element {0} is gone")]
    ElementGone(ElementId),
}
