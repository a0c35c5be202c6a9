//! Network Transport
//!
//! The controller never talks to the network directly. It hands a resolved
//! [`DispatchRequest`] and the session's cancellation token to a [`Transport`]
//! and gets back a status plus a stream of raw byte buffers.
//!
//! # Available Transports
//!
//! - **HTTP**: [`HttpTransport`], backed by reqwest
//!
//! Tests and embedders supply their own implementations.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::{StreamReadError, TransportError};
use crate::request::DispatchRequest;

/// Response body as a stream of raw buffers
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamReadError>>;

/// A dispatched request's response head and body
pub struct TransportResponse {
    /// Status code
    pub status: u16,
    /// `Content-Type` header, if present
    pub content_type: Option<String>,
    /// Body buffers in arrival order
    pub body: ByteStream,
}

impl TransportResponse {
    /// Create a response from parts
    pub fn new(status: u16, content_type: Option<String>, body: ByteStream) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Transport trait
///
/// Implementations should stop work promptly once `cancel` fires. The
/// controller also races every call against the token, so an implementation
/// that ignores it is still correct, merely wasteful.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logs (e.g., "http")
    fn name(&self) -> &str;

    /// Dispatch a request and return its response head and body stream
    async fn perform(
        &self,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}
