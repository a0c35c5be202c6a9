//! Streaming Session
//!
//! One request-response exchange from dispatch to finalization. The session
//! issues the request, reads the body buffer by buffer, and renders every
//! decoded chunk before it reads the next one.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──► Starting ──► Streaming ──► Completed
//!               │             │
//!               ├─────────────┼───────► Cancelled
//!               └─────────────┴───────► Failed
//! ```
//!
//! # Cancellation
//!
//! The two suspension points (dispatch and each buffer read) race against the
//! session's cancellation token. The handle is checked again on resumption and
//! before every render side effect, so a superseded session stops before it
//! can swap, emit a chunk, or complete.
//!
//! Finalization is the [`Registration`] guard's `Drop`: it runs once, on every
//! exit path, including a session future dropped mid-flight.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::decoder::{Chunk, ChunkDecoder};
use crate::document::{Document, SwapSpec};
use crate::element::{ElementId, EventOptIns};
use crate::error::{StreamError, TransportError};
use crate::events::LifecycleEmitter;
use crate::registry::{CancelReason, CancellationHandle, Registration};
use crate::request::DispatchRequest;
use crate::transform::TransformPipeline;
use crate::transport::Transport;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Prepared, not yet running
    Idle,
    /// Registered and dispatching the request
    Starting,
    /// Reading and rendering the body
    Streaming,
    /// Body exhausted, every chunk rendered
    Completed,
    /// Stopped by its cancellation handle
    Cancelled,
    /// Stopped by a transport or read failure
    Failed,
}

impl SessionState {
    /// Whether no further transition is possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether the state machine allows moving to `next`
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Streaming | Cancelled | Failed)
                | (Streaming, Completed | Cancelled | Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The body was exhausted
    Completed {
        /// Chunks rendered
        total_chunks: u64,
    },
    /// The cancellation handle was signaled
    Cancelled {
        /// Recorded cancellation reason
        reason: CancelReason,
        /// Chunks rendered before cancellation was observed
        chunks: u64,
    },
    /// Dispatch or body read failed
    Failed {
        /// The failure
        error: StreamError,
        /// Chunks rendered before the failure
        chunks: u64,
    },
}

impl SessionOutcome {
    /// Terminal state this outcome corresponds to
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self {
            Self::Completed { .. } => SessionState::Completed,
            Self::Cancelled { .. } => SessionState::Cancelled,
            Self::Failed { .. } => SessionState::Failed,
        }
    }

    /// Number of chunks rendered
    #[must_use]
    pub fn chunks(&self) -> u64 {
        match self {
            Self::Completed { total_chunks } => *total_chunks,
            Self::Cancelled { chunks, .. } | Self::Failed { chunks, .. } => *chunks,
        }
    }

    /// Whether the session completed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Collaborators shared by every session of one controller
pub(crate) struct SessionContext<T: Transport + ?Sized, D: Document + ?Sized> {
    pub(crate) transport: Arc<T>,
    pub(crate) document: Arc<D>,
    pub(crate) transforms: Arc<TransformPipeline>,
    pub(crate) flush_trailing_bytes: bool,
}

/// A prepared streaming session
///
/// Created by [`StreamController::prepare`](crate::controller::StreamController::prepare),
/// which has already registered its cancellation handle. Consumed by [`run`](Self::run).
pub struct StreamingSession<T: Transport + ?Sized, D: Document + ?Sized> {
    id: SessionId,
    element: ElementId,
    target: ElementId,
    request: DispatchRequest,
    transport: Arc<T>,
    document: Arc<D>,
    transforms: Arc<TransformPipeline>,
    emitter: LifecycleEmitter<D>,
    registration: Registration,
    state: SessionState,
    chunks: u64,
    flush_trailing_bytes: bool,
}

impl<T: Transport + ?Sized, D: Document + ?Sized> StreamingSession<T, D> {
    pub(crate) fn new(
        context: SessionContext<T, D>,
        registration: Registration,
        target: ElementId,
        request: DispatchRequest,
        opt_ins: EventOptIns,
    ) -> Self {
        let element = registration.element();
        let emitter = LifecycleEmitter::new(Arc::clone(&context.document), element, opt_ins);

        Self {
            id: SessionId::new(),
            element,
            target,
            request,
            transport: context.transport,
            document: context.document,
            transforms: context.transforms,
            emitter,
            registration,
            state: SessionState::Idle,
            chunks: 0,
            flush_trailing_bytes: context.flush_trailing_bytes,
        }
    }

    /// Session ID
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Source element
    #[must_use]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Element receiving rendered chunks
    #[must_use]
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Request this session will dispatch
    #[must_use]
    pub fn request(&self) -> &DispatchRequest {
        &self.request
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Cancellation handle registered for this session
    #[must_use]
    pub fn handle(&self) -> &CancellationHandle {
        self.registration.handle()
    }

    /// Drive the session to a terminal state
    pub async fn run(self) -> SessionOutcome {
        let span = tracing::info_span!(
            "stream_session",
            session_id = %self.id,
            element = %self.element,
        );
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> SessionOutcome {
        self.transition(SessionState::Starting);
        if let Some(outcome) = self.observe_cancellation() {
            return outcome;
        }

        tracing::info!(
            method = %self.request.method,
            url = %self.request.url,
            target = %self.target,
            transport = self.transport.name(),
            "Streaming session started"
        );
        self.emitter.start();

        if self.request.url.is_empty() {
            return self.fail(TransportError::InvalidRequest("no URL configured".to_string()).into());
        }

        let token = self.registration.handle().token().clone();
        let dispatched = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = self.transport.perform(&self.request, &token) => Some(result),
        };
        let Some(result) = dispatched else {
            return self.cancelled();
        };
        if let Some(outcome) = self.observe_cancellation() {
            return outcome;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => return self.fail(e.into()),
        };
        if !response.is_success() {
            let url = self.request.url.clone();
            return self.fail(
                TransportError::Status {
                    status: response.status,
                    url,
                }
                .into(),
            );
        }

        let swap_spec = self.document.swap_spec(self.element);
        let mut decoder = ChunkDecoder::for_content_type(response.content_type.as_deref());
        let mut body = response.body;
        self.transition(SessionState::Streaming);
        tracing::debug!(
            status = response.status,
            encoding = decoder.encoding_name(),
            swap = %swap_spec.style,
            "Reading response body"
        );

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return self.cancelled(),
                next = body.next() => next,
            };

            match next {
                None => break,
                Some(Err(e)) => return self.fail(e.into()),
                Some(Ok(bytes)) => {
                    if let Some(outcome) = self.observe_cancellation() {
                        return outcome;
                    }
                    if let Some(content) = decoder.decode(&bytes) {
                        self.render(content, &swap_spec);
                    }
                }
            }
        }

        if self.flush_trailing_bytes {
            if let Some(tail) = decoder.finish() {
                if let Some(outcome) = self.observe_cancellation() {
                    return outcome;
                }
                tracing::debug!("Flushing incomplete trailing sequence");
                self.render(tail, &swap_spec);
            }
        }

        if let Some(outcome) = self.observe_cancellation() {
            return outcome;
        }
        self.transition(SessionState::Completed);
        self.emitter.complete(self.chunks);
        tracing::info!(total_chunks = self.chunks, "Streaming session completed");

        SessionOutcome::Completed {
            total_chunks: self.chunks,
        }
    }

    /// Transform, swap and announce one chunk
    fn render(&mut self, content: String, swap_spec: &SwapSpec) {
        let chunk = Chunk {
            sequence: self.chunks,
            content,
        };
        let rendered = self.transforms.apply(self.target, chunk.content);
        self.document.swap(self.target, &rendered, swap_spec);
        self.emitter.chunk(chunk.sequence);
        self.chunks += 1;

        tracing::trace!(sequence = chunk.sequence, bytes = rendered.len(), "Chunk rendered");
    }

    fn observe_cancellation(&mut self) -> Option<SessionOutcome> {
        if self.registration.handle().is_cancelled() {
            Some(self.cancelled())
        } else {
            None
        }
    }

    fn cancelled(&mut self) -> SessionOutcome {
        // A token cancelled directly rather than through the handle has no reason.
        let reason = self
            .registration
            .handle()
            .reason()
            .unwrap_or(CancelReason::Aborted);
        self.transition(SessionState::Cancelled);
        tracing::info!(reason = %reason, chunks = self.chunks, "Streaming session cancelled");

        SessionOutcome::Cancelled {
            reason,
            chunks: self.chunks,
        }
    }

    fn fail(&mut self, error: StreamError) -> SessionOutcome {
        if self.registration.handle().is_cancelled() {
            return self.cancelled();
        }

        self.transition(SessionState::Failed);
        tracing::info!(kind = error.kind(), chunks = self.chunks, "Streaming session failed");
        self.emitter.error(&error);

        SessionOutcome::Failed {
            error,
            chunks: self.chunks,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Unexpected session transition");
        }
        tracing::debug!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
    }
}

impl<T: Transport + ?Sized, D: Document + ?Sized> fmt::Debug for StreamingSession<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSession")
            .field("id", &self.id)
            .field("element", &self.element)
            .field("target", &self.target)
            .field("request", &self.request)
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .finish_non_exhaustive()
    }
}
