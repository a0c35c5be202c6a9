//! Cancellation Registry - Single-Flight Enforcement
//!
//! Maps each source element to the cancellation handle of its one live
//! streaming session. Registering a new handle for an element first signals
//! the old one, so at most one non-cancelled session exists per element.
//!
//! # Architecture
//!
//! ```text
//!                    CancellationRegistry
//!             ┌────────────────────────────────────────────┐
//!             │ HashMap<ElementId, CancellationHandle>     │
//!             │   - wrapped in Arc<Mutex<>>                │
//!             └───────────────┬────────────────────────────┘
//!                             │
//!           register(e, h2)   │   unregister(e, h1)
//!         cancels h1 first ───┤─── no-op: h2 is registered now
//! ```
//!
//! # Thread Safety
//!
//! Both operations are a single read-modify-write under one lock, so they are
//! atomic with respect to each other even on a multi-threaded runtime.
//!
//! The registry is an ordinary value owned by a controller. Clones share the
//! same map; a fresh `CancellationRegistry::new()` is fully isolated.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::element::ElementId;

/// Why a session was told to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelReason {
    /// A newer session for the same element replaced this one
    Superseded,
    /// The host explicitly aborted the element's request
    Aborted,
    /// The controller is shutting down
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Superseded => write!(f, "superseded"),
            Self::Aborted => write!(f, "aborted"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Identity of a cancellation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Token saying "this particular session may be told to stop"
///
/// Clones share state and compare equal; two separately created handles never do.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    id: HandleId,
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancellationHandle {
    /// Create a fresh, uncancelled handle
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: HandleId::next(),
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Handle identity
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Signal cancellation
    ///
    /// Idempotent. The first reason recorded wins.
    pub fn cancel(&self, reason: CancelReason) {
        if self.reason.set(reason).is_ok() {
            tracing::debug!(handle = %self.id, reason = %reason, "Cancellation signaled");
        }
        self.token.cancel();
    }

    /// Whether cancellation was signaled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the first `cancel` call
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Resolves once cancellation is signaled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Underlying token, for passing into suspending operations
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CancellationHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CancellationHandle {}

/// Element → live cancellation handle
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<HashMap<ElementId, CancellationHandle>>>,
}

impl CancellationRegistry {
    /// Create a new, isolated registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle for an element
    ///
    /// An existing handle for the element is cancelled with
    /// [`CancelReason::Superseded`] before it is replaced, and returned.
    pub fn register(
        &self,
        element: ElementId,
        handle: CancellationHandle,
    ) -> Option<CancellationHandle> {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.get(&element) {
            if *previous != handle {
                previous.cancel(CancelReason::Superseded);
                tracing::info!(
                    element = %element,
                    superseded = %previous.id,
                    handle = %handle.id,
                    "Superseding active session"
                );
            }
        }
        inner.insert(element, handle)
    }

    /// Remove an element's entry, but only if `handle` is the one registered
    ///
    /// Returns true if the entry was removed. A stale session finalizing after
    /// it was superseded gets false and leaves the newer entry alone.
    pub fn unregister(&self, element: ElementId, handle: &CancellationHandle) -> bool {
        let mut inner = self.inner.lock();
        match inner.get(&element) {
            Some(current) if current == handle => {
                inner.remove(&element);
                tracing::debug!(element = %element, handle = %handle.id, "Handle unregistered");
                true
            }
            Some(current) => {
                tracing::debug!(
                    element = %element,
                    stale = %handle.id,
                    current = %current.id,
                    "Skipping unregister of stale handle"
                );
                false
            }
            None => false,
        }
    }

    /// Cancel the element's live session, if any
    ///
    /// The entry stays until the session finalizes.
    pub fn cancel(&self, element: ElementId, reason: CancelReason) -> bool {
        match self.inner.lock().get(&element) {
            Some(handle) => {
                handle.cancel(reason);
                true
            }
            None => false,
        }
    }

    /// Cancel every live session, returning how many were signaled
    pub fn cancel_all(&self, reason: CancelReason) -> usize {
        let inner = self.inner.lock();
        for handle in inner.values() {
            handle.cancel(reason);
        }
        inner.len()
    }

    /// Whether the element has a registered handle
    #[must_use]
    pub fn contains(&self, element: ElementId) -> bool {
        self.inner.lock().contains_key(&element)
    }

    /// Currently registered handle for the element
    #[must_use]
    pub fn active_handle(&self, element: ElementId) -> Option<CancellationHandle> {
        self.inner.lock().get(&element).cloned()
    }

    /// Number of registered elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("active", &self.len())
            .finish()
    }
}

/// Scoped registry entry owned by a session
///
/// Acquiring registers a fresh handle (superseding any prior one); dropping
/// performs the identity-guarded unregister. Finalization therefore runs
/// exactly once on every exit path, including a session future that is
/// dropped mid-flight.
#[derive(Debug)]
pub struct Registration {
    registry: CancellationRegistry,
    element: ElementId,
    handle: CancellationHandle,
}

impl Registration {
    /// Register a fresh handle for `element`
    #[must_use]
    pub fn acquire(registry: &CancellationRegistry, element: ElementId) -> Self {
        let handle = CancellationHandle::new();
        registry.register(element, handle.clone());
        Self {
            registry: registry.clone(),
            element,
            handle,
        }
    }

    /// The handle this registration owns
    #[must_use]
    pub fn handle(&self) -> &CancellationHandle {
        &self.handle
    }

    /// The element this registration is for
    #[must_use]
    pub fn element(&self) -> ElementId {
        self.element
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.element, &self.handle);
    }
}
