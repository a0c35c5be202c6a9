//! Document Capability
//!
//! Everything the controller needs from the host that owns the rendered
//! document: element configuration and form data, target resolution, the swap
//! specification, the swap itself, and notification delivery.
//!
//! # Design Philosophy
//!
//! The core never touches element internals. A host implements [`Document`]
//! over whatever it renders into (a DOM bridge, a terminal, a test recorder)
//! and treats calls on elements it no longer knows as no-ops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::{ElementConfig, ElementId};
use crate::error::StreamError;
use crate::events::LifecycleEvent;
use crate::request::FormData;

/// How rendered content is merged into the target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStyle {
    /// Replace the target's children
    #[default]
    InnerHtml,
    /// Replace the target itself
    OuterHtml,
    /// Insert before the target
    BeforeBegin,
    /// Insert before the target's first child
    AfterBegin,
    /// Insert after the target's last child
    BeforeEnd,
    /// Insert after the target
    AfterEnd,
    /// Remove the target
    Delete,
    /// Leave the target alone
    None,
}

impl SwapStyle {
    /// Attribute vocabulary name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InnerHtml => "innerHTML",
            Self::OuterHtml => "outerHTML",
            Self::BeforeBegin => "beforebegin",
            Self::AfterBegin => "afterbegin",
            Self::BeforeEnd => "beforeend",
            Self::AfterEnd => "afterend",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }

    /// Whether each new chunk is appended after what was already rendered
    #[must_use]
    pub fn appends(&self) -> bool {
        matches!(self, Self::BeforeEnd | Self::BeforeBegin)
    }
}

impl fmt::Display for SwapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown swap style
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown swap style: {0}")]
pub struct ParseSwapError(String);

/// Render-time description of how content lands in the target
///
/// Opaque to the controller, which derives it once per session and passes it
/// through to every swap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSpec {
    /// Merge style
    pub style: SwapStyle,
}

impl SwapSpec {
    /// Create a spec for a style
    #[must_use]
    pub fn new(style: SwapStyle) -> Self {
        Self { style }
    }
}

impl FromStr for SwapSpec {
    type Err = ParseSwapError;

    /// Parse a swap attribute value such as `beforeend scroll:bottom`
    ///
    /// Only the leading style is interpreted; modifiers are ignored. An empty
    /// value gives the default style.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(style) = s.split_whitespace().next() else {
            return Ok(Self::default());
        };
        [
            SwapStyle::InnerHtml,
            SwapStyle::OuterHtml,
            SwapStyle::BeforeBegin,
            SwapStyle::AfterBegin,
            SwapStyle::BeforeEnd,
            SwapStyle::AfterEnd,
            SwapStyle::Delete,
            SwapStyle::None,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str().eq_ignore_ascii_case(style))
        .map(Self::new)
        .ok_or_else(|| ParseSwapError(style.to_string()))
    }
}

/// Host capabilities for reading elements and rendering into them
pub trait Document: Send + Sync {
    /// Declarative configuration of an element, or `None` if it is gone
    fn config(&self, element: ElementId) -> Option<ElementConfig>;

    /// Form fields to send with the element's request
    fn form_data(&self, element: ElementId) -> FormData;

    /// Element that receives rendered chunks
    fn target(&self, element: ElementId) -> ElementId {
        element
    }

    /// Swap specification for the element
    fn swap_spec(&self, element: ElementId) -> SwapSpec;

    /// Patch rendered content into the target
    fn swap(&self, target: ElementId, content: &str, spec: &SwapSpec);

    /// Deliver a lifecycle notification to observers of `element`
    fn emit(&self, element: ElementId, event: &LifecycleEvent);

    /// Fixed diagnostic channel for session failures
    fn report_error(&self, element: ElementId, error: &StreamError) {
        tracing::error!(
            target: "streamswap::diagnostics",
            element = %element,
            kind = error.kind(),
            "Streaming Error: {error}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_swap_spec() {
        assert_eq!("beforeend".parse(), Ok(SwapSpec::new(SwapStyle::BeforeEnd)));
        assert_eq!("innerHTML".parse(), Ok(SwapSpec::new(SwapStyle::InnerHtml)));
        assert_eq!("OUTERHTML".parse(), Ok(SwapSpec::new(SwapStyle::OuterHtml)));
        assert_eq!(
            "afterbegin scroll:top settle:1s".parse(),
            Ok(SwapSpec::new(SwapStyle::AfterBegin))
        );
        assert_eq!("".parse(), Ok(SwapSpec::default()));
        assert!("sideways".parse::<SwapSpec>().is_err());
    }

    #[test]
    fn test_swap_style_round_trip_names() {
        for style in [SwapStyle::InnerHtml, SwapStyle::AfterEnd, SwapStyle::None] {
            let spec: SwapSpec = style.to_string().parse().expect("known style");
            assert_eq!(spec.style, style);
        }
    }

    #[test]
    fn test_appending_styles() {
        assert!(SwapStyle::BeforeEnd.appends());
        assert!(!SwapStyle::InnerHtml.appends());
        assert!(!SwapStyle::AfterEnd.appends());
        assert!(!SwapStyle::Delete.appends());
    }
}
