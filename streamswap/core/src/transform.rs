//! Render-Transform Pipeline
//!
//! Zero or more transforms applied to every chunk before it is swapped in.
//! Transforms run in registration order and each may replace the content.

use std::fmt;
use std::sync::Arc;

use crate::element::ElementId;

/// A rewrite applied to chunk content before rendering
pub trait ResponseTransform: Send + Sync {
    /// Return the (possibly replaced) content for `target`
    fn transform(&self, target: ElementId, content: String) -> String;
}

impl<F> ResponseTransform for F
where
    F: Fn(ElementId, String) -> String + Send + Sync,
{
    fn transform(&self, target: ElementId, content: String) -> String {
        self(target, content)
    }
}

/// Ordered list of transforms
///
/// Clones share the registered transforms.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn ResponseTransform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform after the existing ones
    pub fn push(&mut self, transform: impl ResponseTransform + 'static) {
        self.transforms.push(Arc::new(transform));
    }

    /// Number of registered transforms
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether no transform is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run `content` through every transform in order
    #[must_use]
    pub fn apply(&self, target: ElementId, content: String) -> String {
        self.transforms
            .iter()
            .fold(content, |content, transform| transform.transform(target, content))
    }
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transforms", &self.transforms.len())
            .finish()
    }
}
