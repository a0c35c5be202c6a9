//! Byte-Stream Decoder
//!
//! Turns raw byte buffers, as they come off the transport, into text chunks.
//! Buffer boundaries carry no meaning: a multi-byte character may be split
//! across two buffers, so decode state lives across calls and a dangling
//! partial sequence is held back until the rest arrives.

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use serde::{Deserialize, Serialize};

/// One unit of decoded text, tagged with its position in the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based, session-scoped sequence number
    pub sequence: u64,
    /// Decoded text
    pub content: String,
}

/// Stateful streaming text decoder, one per session
pub struct ChunkDecoder {
    decoder: Decoder,
    finished: bool,
}

impl ChunkDecoder {
    /// Create a UTF-8 decoder
    #[must_use]
    pub fn utf8() -> Self {
        Self::with_encoding(UTF_8)
    }

    /// Create a decoder for the given encoding
    #[must_use]
    pub fn with_encoding(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            finished: false,
        }
    }

    /// Create a decoder from a `Content-Type` header value
    ///
    /// Uses the `charset` parameter when it names a known encoding and falls
    /// back to UTF-8 otherwise.
    #[must_use]
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let encoding = content_type
            .and_then(charset_param)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        Self::with_encoding(encoding)
    }

    /// Name of the encoding in use
    #[must_use]
    pub fn encoding_name(&self) -> &'static str {
        self.decoder.encoding().name()
    }

    /// Decode the next buffer
    ///
    /// Returns `None` when the buffer produced no text, which is normal for an
    /// empty buffer or one holding only the start of a split character.
    pub fn decode(&mut self, bytes: &[u8]) -> Option<String> {
        if self.finished {
            return None;
        }
        non_empty(self.decode_into_string(bytes, false))
    }

    /// Flush state at end of stream
    ///
    /// An incomplete trailing sequence comes out as U+FFFD. The decoder yields
    /// nothing after this call.
    pub fn finish(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        let text = self.decode_into_string(&[], true);
        self.finished = true;
        non_empty(text)
    }

    fn decode_into_string(&mut self, mut src: &[u8], last: bool) -> String {
        let mut out = String::with_capacity(self.capacity_for(src.len()));
        loop {
            let (result, read, _had_replacements) =
                self.decoder.decode_to_string(src, &mut out, last);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => return out,
                CoderResult::OutputFull => {
                    let additional = self.capacity_for(src.len());
                    out.reserve(additional);
                }
            }
        }
    }

    fn capacity_for(&self, len: usize) -> usize {
        self.decoder
            .max_utf8_buffer_length(len)
            .unwrap_or(len.saturating_mul(3))
            .max(16)
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::utf8()
    }
}

impl std::fmt::Debug for ChunkDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDecoder")
            .field("encoding", &self.encoding_name())
            .field("finished", &self.finished)
            .finish()
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Extract the `charset` parameter from a `Content-Type` value
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
