//! Incremental parser for the line-delimited chat event stream.
//!
//! The body arrives in arbitrary chunks. Bytes are buffered until a `\n`
//! completes a line, so lines (and UTF-8 sequences) split across chunks are
//! reassembled before parsing. Only lines starting with `data: ` are
//! significant; the rest of such a line is one JSON [`ChatEvent`].

use tracing::{debug, warn};

use super::events::ChatEvent;

const DATA_PREFIX: &[u8] = b"data: ";

/// Longest prefix of a skipped line included in log output.
const LOG_PREVIEW_CHARS: usize = 120;

/// Turns chunks of a chat stream body into events.
///
/// Once a terminal event (`done` or `error`) has been produced the parser is
/// finished: anything after it is discarded.
#[derive(Debug, Default)]
pub struct ChatStreamParser {
    buffer: Vec<u8>,
    finished: bool,
}

impl ChatStreamParser {
    /// Create a parser with an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Whether a terminal event has been produced or the input was closed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes received but not yet terminated by a newline.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Feed the next chunk and return every event it completes.
    ///
    /// If a terminal event is returned it is the last element.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ChatEvent> {
        if self.finished {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_line(&line) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.finish_now();
                    break;
                }
            }
        }
        events
    }

    /// Signal that the input closed.
    ///
    /// A final line without a trailing newline is still parsed. After this
    /// call the parser is finished.
    pub fn finish(&mut self) -> Vec<ChatEvent> {
        if self.finished {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        self.finish_now();
        parse_line(&rest).into_iter().collect()
    }

    fn finish_now(&mut self) {
        self.finished = true;
        self.buffer = Vec::new();
    }
}

/// Parse one line (with or without its terminator).
fn parse_line(line: &[u8]) -> Option<ChatEvent> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    let payload = match std::str::from_utf8(payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Skipping chat stream line with invalid UTF-8");
            return None;
        }
    };

    match serde_json::from_str::<ChatEvent>(payload) {
        Ok(event) => {
            debug!(?event, "Parsed chat stream event");
            Some(event)
        }
        Err(e) => {
            warn!(
                error = %e,
                line = %payload.chars().take(LOG_PREVIEW_CHARS).collect::<String>(),
                "Skipping malformed chat stream line"
            );
            None
        }
    }
}
