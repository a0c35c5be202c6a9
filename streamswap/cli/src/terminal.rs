//! Terminal Document
//!
//! [`Document`] over a terminal. The command line describes a single source
//! element; its chunks are written to stdout as they are swapped in and its
//! lifecycle events go to stderr as JSON lines.
//!
//! Appending swap styles stream straight through. Every other style rewrites
//! the whole rendered content on a fresh line, since a terminal cannot edit
//! what it already printed.

use std::io::Write;

use parking_lot::Mutex;
use streamswap_core::{
    Document, ElementConfig, ElementId, FormData, LifecycleEvent, SwapSpec, SwapStyle,
};

/// Output sink
pub type Sink = Box<dyn Write + Send>;

struct Screen {
    out: Sink,
    content: String,
    written: bool,
}

/// The single element described by the command line, rendered to a terminal
pub struct TerminalDocument {
    source: ElementId,
    config: ElementConfig,
    form: FormData,
    swap: SwapSpec,
    screen: Mutex<Screen>,
    events: Mutex<Option<Sink>>,
}

impl TerminalDocument {
    /// Create a document writing to `out`, with no event sink
    pub fn new(
        source: ElementId,
        config: ElementConfig,
        form: FormData,
        swap: SwapSpec,
        out: Sink,
    ) -> Self {
        Self {
            source,
            config,
            form,
            swap,
            screen: Mutex::new(Screen {
                out,
                content: String::new(),
                written: false,
            }),
            events: Mutex::new(None),
        }
    }

    /// Write lifecycle events as JSON lines to `sink`
    #[must_use]
    pub fn with_event_sink(self, sink: Sink) -> Self {
        *self.events.lock() = Some(sink);
        self
    }

    /// Current rendered content
    pub fn content(&self) -> String {
        self.screen.lock().content.clone()
    }

    /// Terminate the output with a newline if anything was written
    pub fn finish(&self) {
        let mut screen = self.screen.lock();
        if screen.written && !screen.content.ends_with('\n') {
            if let Err(e) = writeln!(screen.out).and_then(|()| screen.out.flush()) {
                tracing::warn!(error = %e, "Failed to write to terminal");
            }
        }
    }
}

impl Document for TerminalDocument {
    fn config(&self, element: ElementId) -> Option<ElementConfig> {
        (element == self.source).then(|| self.config.clone())
    }

    fn form_data(&self, element: ElementId) -> FormData {
        if element == self.source {
            self.form.clone()
        } else {
            FormData::new()
        }
    }

    fn swap_spec(&self, _element: ElementId) -> SwapSpec {
        self.swap.clone()
    }

    fn swap(&self, target: ElementId, content: &str, spec: &SwapSpec) {
        if target != self.source {
            tracing::warn!(target_element = %target, "Swap into unknown element ignored");
            return;
        }

        let mut screen = self.screen.lock();
        let result = match spec.style {
            SwapStyle::None => Ok(()),
            style if style.appends() => {
                screen.content.push_str(content);
                screen.written = true;
                write!(screen.out, "{content}").and_then(|()| screen.out.flush())
            }
            style => {
                match style {
                    SwapStyle::AfterBegin | SwapStyle::AfterEnd => {
                        screen.content.insert_str(0, content);
                    }
                    SwapStyle::Delete => screen.content.clear(),
                    _ => content.clone_into(&mut screen.content),
                }
                redraw(&mut screen)
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn emit(&self, element: ElementId, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Chunk { count } => {
                tracing::debug!(element = %element, count = count, "Chunk rendered");
            }
            _ => tracing::info!(element = %element, event = event.name(), "Lifecycle event"),
        }

        if let Some(sink) = self.events.lock().as_mut() {
            let line = serde_json::json!({
                "event": event.name(),
                "element": element.to_string(),
                "detail": event.payload(),
            });
            if let Err(e) = writeln!(sink, "{line}") {
                tracing::warn!(error = %e, "Failed to write event");
            }
        }
    }
}

fn redraw(screen: &mut Screen) -> std::io::Result<()> {
    if screen.written {
        writeln!(screen.out)?;
    }
    screen.written = true;
    write!(screen.out, "{}", screen.content)?;
    screen.out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Cloneable in-memory sink
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn document(style: SwapStyle) -> (TerminalDocument, ElementId, Buffer) {
        let source = ElementId::new();
        let out = Buffer::default();
        let document = TerminalDocument::new(
            source,
            ElementConfig::new(),
            FormData::new().with("q", "1"),
            SwapSpec::new(style),
            Box::new(out.clone()),
        );
        (document, source, out)
    }

    #[test]
    fn test_only_source_element_is_known() {
        let (document, source, _out) = document(SwapStyle::BeforeEnd);
        let stranger = ElementId::new();

        assert!(document.config(source).is_some());
        assert!(document.config(stranger).is_none());
        assert!(!document.form_data(source).is_empty());
        assert!(document.form_data(stranger).is_empty());
    }

    #[test]
    fn test_appending_style_streams_through() {
        let (document, source, out) = document(SwapStyle::BeforeEnd);
        let spec = document.swap_spec(source);

        document.swap(source, "Hel", &spec);
        document.swap(source, "lo", &spec);
        document.finish();

        assert_eq!(out.text(), "Hello\n");
        assert_eq!(document.content(), "Hello");
    }

    #[test]
    fn test_replacing_style_redraws() {
        let (document, source, out) = document(SwapStyle::InnerHtml);
        let spec = document.swap_spec(source);

        document.swap(source, "one", &spec);
        document.swap(source, "two", &spec);

        assert_eq!(out.text(), "one\ntwo");
        assert_eq!(document.content(), "two");
    }

    #[test]
    fn test_prepending_style() {
        let (document, source, _out) = document(SwapStyle::AfterBegin);
        let spec = document.swap_spec(source);

        document.swap(source, "a", &spec);
        document.swap(source, "b", &spec);

        assert_eq!(document.content(), "ba");
    }

    #[test]
    fn test_none_and_unknown_target_write_nothing() {
        let (document, source, out) = document(SwapStyle::None);

        document.swap(source, "hidden", &SwapSpec::new(SwapStyle::None));
        document.swap(ElementId::new(), "elsewhere", &SwapSpec::new(SwapStyle::BeforeEnd));
        document.finish();

        assert_eq!(out.text(), "");
    }

    #[test]
    fn test_events_written_as_json_lines() {
        let (document, source, _out) = document(SwapStyle::BeforeEnd);
        let events = Buffer::default();
        let document = document.with_event_sink(Box::new(events.clone()));

        document.emit(source, &LifecycleEvent::Chunk { count: 0 });
        document.emit(source, &LifecycleEvent::Complete { total_chunks: 1 });

        let lines: Vec<serde_json::Value> = events
            .text()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "chunk");
        assert_eq!(lines[0]["detail"]["count"], 0);
        assert_eq!(lines[1]["event"], "streaming-complete");
        assert_eq!(lines[1]["detail"]["totalChunks"], 1);
    }
}
