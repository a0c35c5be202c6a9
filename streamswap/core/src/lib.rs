//! Streamswap Core - Progressive Rendering of Streamed Responses
//!
//! This crate intercepts an element's request, issues it over a pluggable
//! transport, and renders the response body into a target element
//! incrementally, chunk by chunk, as bytes arrive. It is host-agnostic: a
//! terminal, a DOM bridge, or a test harness plugs in through the
//! [`Document`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Host                                │
//! │   before_request(element) ──►            ◄── swap / emit         │
//! └───────────────┬──────────────────────────────────▲───────────────┘
//!                 │                                  │ Document
//! ┌───────────────┼──────────────────────────────────┼───────────────┐
//! │               ▼          STREAMSWAP CORE         │               │
//! │  ┌────────────────────┐   register   ┌───────────┴────────────┐  │
//! │  │  StreamController  │─────────────►│  CancellationRegistry  │  │
//! │  └─────────┬──────────┘              └────────────────────────┘  │
//! │            │ prepare                                             │
//! │  ┌─────────▼──────────────────────────────────────────────────┐  │
//! │  │                   StreamingSession                         │  │
//! │  │  Transport ─► ChunkDecoder ─► TransformPipeline ─► swap    │  │
//! │  │                                 LifecycleEmitter ─► emit   │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`StreamController`]: trigger surface; prepares, spawns, aborts sessions
//! - [`StreamingSession`]: one request from dispatch to finalization
//! - [`CancellationRegistry`]: single-flight enforcement per element
//! - [`ChunkDecoder`]: stateful byte-to-text decoder
//! - [`Document`]: host capabilities (config lookup, swap, notifications)
//! - [`Transport`]: network capability, with [`HttpTransport`] over reqwest
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use streamswap_core::{load_config, HttpTransport, StreamController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let transport = Arc::new(HttpTransport::from_config(&config)?);
//!     let document = Arc::new(MyDocument::new());
//!     let controller = StreamController::new(transport, document, config.controller_settings());
//!
//!     if let Some(handle) = controller.before_request(element).into_handle() {
//!         let outcome = handle.await?;
//!         println!("{} chunks", outcome.chunks());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: layered configuration (defaults, TOML file, environment, CLI)
//! - [`controller`]: the trigger surface
//! - [`decoder`]: streaming text decoding
//! - [`document`]: host capability trait and swap specification
//! - [`element`]: element identity and declarative configuration
//! - [`error`]: error taxonomy
//! - [`events`]: lifecycle notifications
//! - [`registry`]: cancellation handles and the single-flight registry
//! - [`request`]: request derivation and form encoding
//! - [`session`]: the streaming state machine
//! - [`transform`]: render-transform pipeline
//! - [`transport`]: network transport abstraction

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod decoder;
pub mod document;
pub mod element;
pub mod error;
pub mod events;
pub mod registry;
pub mod request;
pub mod session;
pub mod transform;
pub mod transport;

// Re-exports for convenience
pub use controller::{ControllerSettings, Interception, StreamController, DEFAULT_EXTENSION};
pub use decoder::{Chunk, ChunkDecoder};
pub use document::{Document, ParseSwapError, SwapSpec, SwapStyle};
pub use element::{ElementConfig, ElementId, EventOptIns};
pub use error::{PrepareError, StreamError, StreamReadError, TransportError};
pub use events::{LifecycleEmitter, LifecycleEvent};
pub use registry::{CancelReason, CancellationHandle, CancellationRegistry, HandleId, Registration};
pub use request::{
    baseline_headers, is_baseline_header, DispatchRequest, FormData, HttpMethod, ParseMethodError,
    RequestDescriptor, BASELINE_HEADERS, FORM_CONTENT_TYPE,
};
pub use session::{SessionId, SessionOutcome, SessionState, StreamingSession};
pub use transform::{ResponseTransform, TransformPipeline};
pub use transport::{ByteStream, HttpTransport, Transport, TransportResponse};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, StreamerConfig, StreamerToml,
};
