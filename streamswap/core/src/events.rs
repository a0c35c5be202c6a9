//! Lifecycle Events
//!
//! Observable notifications for a streaming session. Names and payload fields
//! are a contract with observers:
//!
//! | event                | gated by             | payload                    |
//! |----------------------|----------------------|----------------------------|
//! | `streaming-start`    | `start_event`        | none                       |
//! | `chunk`              | always               | `{count}`                  |
//! | `streaming-complete` | `complete_event`     | `{totalChunks}`            |
//! | `streaming-error`    | `error_event`        | `{error, message}`         |
//!
//! Failures are additionally written to the host's diagnostic channel whether
//! or not the element opted into error events. Cancellation is never reported.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::element::{ElementId, EventOptIns};
use crate::error::StreamError;

/// A notification about a session's progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Request is about to be dispatched
    Start,
    /// A chunk was rendered
    Chunk {
        /// Zero-based sequence number of the chunk
        count: u64,
    },
    /// Stream was exhausted
    Complete {
        /// Number of chunks rendered
        total_chunks: u64,
    },
    /// Session failed
    Error {
        /// Error kind
        error: String,
        /// Human-readable message
        message: String,
    },
}

impl LifecycleEvent {
    /// Contract name of the event
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "streaming-start",
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "streaming-complete",
            Self::Error { .. } => "streaming-error",
        }
    }

    /// Contract payload of the event
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Start => serde_json::Value::Null,
            Self::Chunk { count } => serde_json::json!({ "count": count }),
            Self::Complete { total_chunks } => serde_json::json!({ "totalChunks": total_chunks }),
            Self::Error { error, message } => {
                serde_json::json!({ "error": error, "message": message })
            }
        }
    }

    /// Build the error event for a failure
    #[must_use]
    pub fn from_error(error: &StreamError) -> Self {
        Self::Error {
            error: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Per-session adapter from state transitions to notifications
///
/// Holds the opt-ins resolved when the session was prepared.
pub struct LifecycleEmitter<D: Document + ?Sized> {
    document: Arc<D>,
    element: ElementId,
    opt_ins: EventOptIns,
}

impl<D: Document + ?Sized> LifecycleEmitter<D> {
    /// Create an emitter for `element`
    pub fn new(document: Arc<D>, element: ElementId, opt_ins: EventOptIns) -> Self {
        Self {
            document,
            element,
            opt_ins,
        }
    }

    /// Opt-ins in effect
    #[must_use]
    pub fn opt_ins(&self) -> EventOptIns {
        self.opt_ins
    }

    /// `streaming-start`, if opted in
    pub fn start(&self) {
        if self.opt_ins.start {
            self.document.emit(self.element, &LifecycleEvent::Start);
        }
    }

    /// `chunk`, always
    pub fn chunk(&self, count: u64) {
        self.document
            .emit(self.element, &LifecycleEvent::Chunk { count });
    }

    /// `streaming-complete`, if opted in
    pub fn complete(&self, total_chunks: u64) {
        if self.opt_ins.complete {
            self.document
                .emit(self.element, &LifecycleEvent::Complete { total_chunks });
        }
    }

    /// Report a failure
    ///
    /// Always written to the diagnostic channel; `streaming-error` only if
    /// opted in. Cancellation is dropped here without a trace on either.
    pub fn error(&self, error: &StreamError) {
        if error.is_cancellation() {
            tracing::debug!(element = %self.element, "Suppressing cancellation report");
            return;
        }

        self.document.report_error(self.element, error);

        if self.opt_ins.error {
            self.document
                .emit(self.element, &LifecycleEvent::from_error(error));
        }
    }
}
