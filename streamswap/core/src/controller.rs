//! Stream Controller - The Trigger Surface
//!
//! The controller is what a host talks to. It intercepts an element's
//! "before request" signal, builds the request from the element's
//! configuration, registers a fresh cancellation handle (superseding any prior
//! session for the element), and runs a [`StreamingSession`].
//!
//! # Design Philosophy
//!
//! The controller is host-agnostic. It reaches the network only through a
//! [`Transport`] and the rendered document only through a [`Document`], so
//! the same core drives a terminal, a DOM bridge, or a test harness.
//!
//! Supersession happens synchronously in [`StreamController::prepare`], before
//! the new session awaits anything. By the time a new session can produce a
//! side effect, the old one's handle is already signaled.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::document::Document;
use crate::element::{ElementConfig, ElementId};
use crate::error::PrepareError;
use crate::registry::{CancelReason, CancellationRegistry, Registration};
use crate::request::{baseline_headers, RequestDescriptor};
use crate::session::{SessionContext, SessionOutcome, StreamingSession};
use crate::transform::{ResponseTransform, TransformPipeline};
use crate::transport::Transport;

/// Extension name elements use to opt into streaming
pub const DEFAULT_EXTENSION: &str = "streaming-html";

/// Controller settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Extension name an element must designate to be intercepted
    pub extension_name: String,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
    /// Render an incomplete trailing sequence as a final chunk
    pub flush_trailing_bytes: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            extension_name: DEFAULT_EXTENSION.to_string(),
            headers: baseline_headers(),
            flush_trailing_bytes: true,
        }
    }
}

/// Result of offering a "before request" signal to the controller
#[derive(Debug)]
pub enum Interception {
    /// The default request path is suppressed; a session is running
    Intercepted(JoinHandle<SessionOutcome>),
    /// The element does not designate streaming; proceed as usual
    PassThrough,
}

impl Interception {
    /// Whether the signal was intercepted
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        matches!(self, Self::Intercepted(_))
    }

    /// Join handle of the spawned session, if any
    #[must_use]
    pub fn into_handle(self) -> Option<JoinHandle<SessionOutcome>> {
        match self {
            Self::Intercepted(handle) => Some(handle),
            Self::PassThrough => None,
        }
    }
}

/// Orchestrates streaming sessions for a document
pub struct StreamController<T: Transport + ?Sized, D: Document + ?Sized> {
    transport: Arc<T>,
    document: Arc<D>,
    registry: CancellationRegistry,
    transforms: Arc<TransformPipeline>,
    settings: ControllerSettings,
}

impl<T: Transport + ?Sized, D: Document + ?Sized> StreamController<T, D> {
    /// Create a controller with its own registry and no transforms
    pub fn new(transport: Arc<T>, document: Arc<D>, settings: ControllerSettings) -> Self {
        tracing::debug!(
            transport = transport.name(),
            extension = %settings.extension_name,
            "Stream controller created"
        );
        Self {
            transport,
            document,
            registry: CancellationRegistry::new(),
            transforms: Arc::new(TransformPipeline::new()),
            settings,
        }
    }

    /// Use a specific cancellation registry
    #[must_use]
    pub fn with_registry(mut self, registry: CancellationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a render transform after the existing ones
    ///
    /// Sessions already prepared keep the pipeline they started with.
    #[must_use]
    pub fn with_transform(mut self, transform: impl ResponseTransform + 'static) -> Self {
        Arc::make_mut(&mut self.transforms).push(transform);
        self
    }

    /// Cancellation registry in use
    #[must_use]
    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Settings in use
    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Document this controller renders into
    #[must_use]
    pub fn document(&self) -> &Arc<D> {
        &self.document
    }

    /// Whether the element designates the streaming extension
    #[must_use]
    pub fn designates_streaming(&self, element: ElementId) -> bool {
        self.document
            .config(element)
            .is_some_and(|config| config.designates(&self.settings.extension_name))
    }

    /// Prepare a session for an element
    ///
    /// Registers the session's cancellation handle before returning, which
    /// cancels any session already running for the element.
    pub fn prepare(&self, element: ElementId) -> Result<StreamingSession<T, D>, PrepareError> {
        let config = self
            .document
            .config(element)
            .ok_or(PrepareError::ElementGone(element))?;
        Ok(self.prepare_with(element, &config))
    }

    fn prepare_with(&self, element: ElementId, config: &ElementConfig) -> StreamingSession<T, D> {
        let payload = self.document.form_data(element);
        let request =
            RequestDescriptor::from_config(config, payload).into_dispatch(&self.settings.headers);
        let registration = Registration::acquire(&self.registry, element);
        let target = self.document.target(element);

        let context = SessionContext {
            transport: Arc::clone(&self.transport),
            document: Arc::clone(&self.document),
            transforms: Arc::clone(&self.transforms),
            flush_trailing_bytes: self.settings.flush_trailing_bytes,
        };
        StreamingSession::new(context, registration, target, request, config.opt_ins())
    }

    /// Prepare and run a session to completion on the current task
    pub async fn stream(&self, element: ElementId) -> Result<SessionOutcome, PrepareError> {
        let session = self.prepare(element)?;
        Ok(session.run().await)
    }

    /// Cancel the element's live session with [`CancelReason::Aborted`]
    ///
    /// Returns false if the element had none.
    pub fn abort(&self, element: ElementId) -> bool {
        let aborted = self.registry.cancel(element, CancelReason::Aborted);
        if aborted {
            tracing::info!(element = %element, "Streaming session aborted");
        }
        aborted
    }

    /// Cancel every live session with [`CancelReason::Shutdown`]
    pub fn shutdown(&self) -> usize {
        let count = self.registry.cancel_all(CancelReason::Shutdown);
        tracing::info!(sessions = count, "Stream controller shutting down");
        count
    }

    /// Number of sessions not yet finalized
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }
}

impl<T, D> StreamController<T, D>
where
    T: Transport + ?Sized + 'static,
    D: Document + ?Sized + 'static,
{
    /// Offer an element's "before request" signal
    ///
    /// If the element designates the streaming extension, the default request
    /// path is suppressed and a session is spawned on the tokio runtime.
    /// Otherwise the signal passes through untouched.
    pub fn before_request(&self, element: ElementId) -> Interception {
        let Some(config) = self.document.config(element) else {
            tracing::debug!(element = %element, "Unknown element, passing through");
            return Interception::PassThrough;
        };
        if !config.designates(&self.settings.extension_name) {
            return Interception::PassThrough;
        }

        let session = self.prepare_with(element, &config);
        tracing::debug!(element = %element, session_id = %session.id(), "Request intercepted");
        Interception::Intercepted(tokio::spawn(session.run()))
    }
}

impl<T: Transport + ?Sized, D: Document + ?Sized> std::fmt::Debug for StreamController<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("transport", &self.transport.name())
            .field("registry", &self.registry)
            .field("transforms", &self.transforms)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
