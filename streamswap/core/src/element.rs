//! Source Elements
//!
//! The core never owns the UI element that triggered a request. It only holds an
//! [`ElementId`], an opaque identity token, and asks the host (see
//! [`Document`](crate::document::Document)) for anything it needs to know about
//! the element. A host may destroy an element at any time; every lookup through
//! the host is therefore fallible, and operations on a vanished element are
//! no-ops on the host side.
//!
//! [`ElementConfig`] is the declarative configuration of an element, resolved
//! once when a session is prepared.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::request::HttpMethod;

/// Opaque, identity-comparable handle for a source or target element
///
/// Used as a registry key and as the addressee of lifecycle notifications.
/// Carries no reference to the element itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    /// Mint a new unique element ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Create an element ID from a raw value (for hosts with their own numbering)
    #[must_use]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "elt-{}", self.0)
    }
}

/// Declarative configuration of a source element
///
/// One optional URL per supported verb, a fallback action URL, the extension
/// designation list and the lifecycle event opt-in markers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    /// URL for a GET request
    pub get: Option<String>,
    /// URL for a POST request
    pub post: Option<String>,
    /// URL for a PUT request
    pub put: Option<String>,
    /// URL for a DELETE request
    pub delete: Option<String>,
    /// URL for a PATCH request
    pub patch: Option<String>,
    /// Fallback action URL, used with GET when no verb directive is present
    pub action: Option<String>,
    /// Comma-separated list of extensions this element opts into
    pub extensions: Option<String>,
    /// Opt-in marker for the `streaming-start` event
    pub start_event: bool,
    /// Opt-in marker for the `streaming-complete` event
    pub complete_event: bool,
    /// Opt-in marker for the `streaming-error` event
    pub error_event: bool,
}

impl ElementConfig {
    /// Create an empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directive for a verb
    #[must_use]
    pub fn with_directive(mut self, method: HttpMethod, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match method {
            HttpMethod::Get => self.get = url,
            HttpMethod::Post => self.post = url,
            HttpMethod::Put => self.put = url,
            HttpMethod::Delete => self.delete = url,
            HttpMethod::Patch => self.patch = url,
        }
        self
    }

    /// Set the fallback action URL
    #[must_use]
    pub fn with_action(mut self, url: impl Into<String>) -> Self {
        self.action = Some(url.into());
        self
    }

    /// Set the extension designation list
    #[must_use]
    pub fn with_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.extensions = Some(extensions.into());
        self
    }

    /// Set all three event opt-in markers at once
    #[must_use]
    pub fn with_events(mut self, opt_ins: EventOptIns) -> Self {
        self.start_event = opt_ins.start;
        self.complete_event = opt_ins.complete;
        self.error_event = opt_ins.error;
        self
    }

    /// Get the URL configured for a verb
    ///
    /// Empty strings count as absent.
    #[must_use]
    pub fn directive(&self, method: HttpMethod) -> Option<&str> {
        let url = match method {
            HttpMethod::Get => &self.get,
            HttpMethod::Post => &self.post,
            HttpMethod::Put => &self.put,
            HttpMethod::Delete => &self.delete,
            HttpMethod::Patch => &self.patch,
        };
        url.as_deref().filter(|u| !u.is_empty())
    }

    /// Check whether this element designates the named extension
    #[must_use]
    pub fn designates(&self, name: &str) -> bool {
        self.extensions
            .as_deref()
            .is_some_and(|list| list.split(',').any(|ext| ext.trim() == name))
    }

    /// Resolve the event opt-ins
    #[must_use]
    pub fn opt_ins(&self) -> EventOptIns {
        EventOptIns {
            start: self.start_event,
            complete: self.complete_event,
            error: self.error_event,
        }
    }
}

/// Which gated lifecycle events an element opted into
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOptIns {
    /// Emit `streaming-start`
    pub start: bool,
    /// Emit `streaming-complete`
    pub complete: bool,
    /// Emit `streaming-error`
    pub error: bool,
}

impl EventOptIns {
    /// Opt into every gated event
    #[must_use]
    pub fn all() -> Self {
        Self {
            start: true,
            complete: true,
            error: true,
        }
    }

    /// Opt into no gated event
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}
