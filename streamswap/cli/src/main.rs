//! Streamswap - Render a Streamed Response in the Terminal
//!
//! Issues one request through the streaming controller and writes each chunk
//! to stdout the moment it is decoded. Lifecycle events can be written to
//! stderr as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! # Stream a page, appending chunks as they arrive
//! streamswap http://localhost:8000/stream
//!
//! # POST form fields, replace the output on every chunk
//! streamswap -X post -d prompt=hello -d model=small --swap innerHTML http://localhost:8000/chat
//!
//! # Machine-readable lifecycle events on stderr
//! streamswap --events http://localhost:8000/stream 2> events.jsonl
//!
//! # Verbose logging
//! RUST_LOG=debug streamswap http://localhost:8000/stream
//! ```
//!
//! # Signals
//!
//! - `SIGINT` / `SIGTERM`: abort the stream and exit non-zero

mod terminal;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use streamswap_core::{
    load_config, load_config_from_path, ConfigOverrides, ElementConfig, ElementId, EventOptIns,
    FormData, HttpMethod, HttpTransport, SessionOutcome, StreamController, SwapSpec,
};

use terminal::TerminalDocument;

/// Streamswap - render a streamed HTTP response as it arrives
#[derive(Parser, Debug)]
#[command(name = "streamswap")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL to request
    url: String,

    /// Request method (get, post, put, delete, patch)
    #[arg(short = 'X', long, default_value = "get")]
    method: HttpMethod,

    /// Form field as NAME=VALUE (repeatable)
    #[arg(short = 'd', long = "data", value_name = "NAME=VALUE", value_parser = parse_field)]
    data: Vec<(String, String)>,

    /// Extra header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Swap style (beforeend, innerHTML, afterbegin, ...)
    #[arg(short = 's', long, default_value = "beforeend")]
    swap: SwapSpec,

    /// Write lifecycle events to stderr as JSON lines
    #[arg(short = 'e', long)]
    events: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "STREAMSWAP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// Drop an incomplete trailing character instead of rendering U+FFFD
    #[arg(long)]
    no_flush: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STREAMSWAP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ms) = self.connect_timeout_ms {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        if self.no_flush {
            overrides = overrides.with_flush_trailing_bytes(false);
        }
        for (name, value) in &self.headers {
            overrides = overrides.with_header(name.clone(), value.clone());
        }
        overrides
    }

    fn form(&self) -> FormData {
        self.data.iter().cloned().collect()
    }
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected \"Name: value\", got `{s}`")),
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never interleave with rendered output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "streamswap_cli={level},streamswap_core={level},streamswap={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Document for the element the command line describes
fn terminal_document(args: &Args, element: ElementId, extension: &str) -> TerminalDocument {
    let opt_ins = if args.events {
        EventOptIns::all()
    } else {
        EventOptIns::none()
    };
    let element_config = ElementConfig::new()
        .with_directive(args.method, args.url.clone())
        .with_extensions(extension.to_string())
        .with_events(opt_ins);

    let document = TerminalDocument::new(
        element,
        element_config,
        args.form(),
        args.swap.clone(),
        Box::new(std::io::stdout()),
    );
    if args.events {
        document.with_event_sink(Box::new(std::io::stderr()))
    } else {
        document
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() -> &'static str {
    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    first_signal(tokio::signal::ctrl_c(), sigterm).await
}

/// Name of whichever signal arrives first
///
/// A failed SIGINT handler falls back to waiting for SIGTERM alone.
async fn first_signal<I, T>(interrupt: I, terminate: T) -> &'static str
where
    I: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    tokio::pin!(terminate);

    let interrupted = tokio::select! {
        result = interrupt => result,
        () = &mut terminate => return "SIGTERM",
    };

    match interrupted {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!(error = %e, "Failed to install SIGINT handler");
            terminate.await;
            "SIGTERM"
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(source = %config.source(), extension = %config.extension_name, "Configuration loaded");

    let transport =
        Arc::new(HttpTransport::from_config(&config).context("Failed to build HTTP client")?);

    let element = ElementId::new();
    let document = Arc::new(terminal_document(&args, element, &config.extension_name));

    let controller =
        StreamController::new(transport, Arc::clone(&document), config.controller_settings());

    let Some(mut session) = controller.before_request(element).into_handle() else {
        anyhow::bail!("Request was not intercepted by {}", config.extension_name);
    };

    let outcome = tokio::select! {
        result = &mut session => result.context("Streaming task panicked")?,
        signal = shutdown_signal() => {
            info!(signal = signal, "Received signal, aborting stream");
            controller.abort(element);
            session.await.context("Streaming task panicked")?
        }
    };
    document.finish();

    match outcome {
        SessionOutcome::Completed { total_chunks } => {
            info!(total_chunks = total_chunks, "Stream complete");
            Ok(())
        }
        SessionOutcome::Cancelled { reason, chunks } => {
            anyhow::bail!("Stream {reason} after {chunks} chunks")
        }
        SessionOutcome::Failed { error, chunks } => {
            Err(anyhow::Error::new(error).context(format!("Streaming failed after {chunks} chunks")))
        }
    }
}
