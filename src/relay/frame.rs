//! Line framing and frame decoding for provider event streams
//!
//! Providers send newline-delimited event lines:
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```

use crate::llm::openai::types::ChatCompletionChunk;

/// Prefix marking an event-data line
pub const DATA_PREFIX: &str = "data:";

/// Payload marking the normal end of a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest line the splitter buffers before discarding it
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// What a single line means to the relay
#[derive(Debug)]
pub enum Frame {
    /// Blank line, comment, or any non-data field
    Skip,
    /// The terminal sentinel
    Done,
    /// Text deltas carried by the frame, possibly none
    Deltas(Vec<String>),
    /// A data line whose payload is not a valid frame
    Malformed(serde_json::Error),
}

/// Classify one line of the provider stream
pub fn classify_line(line: &str) -> Frame {
    let line = line.trim();
    if line.is_empty() {
        return Frame::Skip;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Frame::Skip;
    }
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => Frame::Deltas(chunk.into_deltas().collect()),
        Err(e) => Frame::Malformed(e),
    }
}

/// Reassembles lines from arbitrarily split byte chunks
///
/// Bytes are buffered until a `\n` arrives, so multi-byte characters and
/// lines split across chunks come out whole. A trailing `\r` is dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    discarding: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                // End of an oversized line
                self.discarding = false;
                self.buffer.clear();
                continue;
            }

            let length = self.buffer.len() + head.len();
            if length > MAX_LINE_LENGTH {
                warn_oversized(length);
                self.buffer.clear();
                continue;
            }

            self.buffer.extend_from_slice(head);
            lines.push(self.take_line());
        }

        if !self.discarding {
            if self.buffer.len() + rest.len() > MAX_LINE_LENGTH {
                self.discard(self.buffer.len() + rest.len());
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }

        lines
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding || self.buffer.is_empty() {
            self.buffer.clear();
            self.discarding = false;
            return None;
        }
        Some(self.take_line())
    }

    /// Drop the current line; the rest of it is skipped up to its `\n`
    fn discard(&mut self, length: usize) {
        warn_oversized(length);
        self.buffer.clear();
        self.discarding = true;
    }

    fn take_line(&mut self) -> String {
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        line
    }
}

fn warn_oversized(length: usize) {
    tracing::warn!(length, "Stream line exceeds maximum length, discarding");
}
