//! Server-Sent Events frame parsing.
//!
//! [`parse_events`] turns a block of text into events. It flushes a trailing
//! event that has data even without a terminating blank line, so callers that
//! need strict framing pre-segment their input with [`FrameBuffer`], which only
//! releases bytes up to the last blank line.

use bytes::{Bytes, BytesMut};

use crate::error::StreamError;

/// `data` payload marking intentional end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    /// All `data:` lines of the event, joined with `\n`.
    pub data: String,
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn is_done(&self) -> bool {
        self.data == DONE_SENTINEL
    }
}

/// Parse UTF-8 bytes into events.
pub fn parse_events(input: &[u8]) -> Result<Vec<SseEvent>, StreamError> {
    let text = std::str::from_utf8(input)
        .map_err(|e| StreamError::InvalidFormat(format!("invalid UTF-8 in event stream: {}", e)))?;
    Ok(parse_str(text))
}

/// Parse text into events. Accepts `\n` and `\r\n` line endings.
pub fn parse_str(text: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut pending = PendingEvent::default();

    for line in text.lines() {
        if line.is_empty() {
            pending.flush_into(&mut events);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            tracing::debug!(line, "Ignoring SSE line without a field separator");
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "data" => pending.data.push(value.to_string()),
            "event" => pending.event = Some(value.to_string()),
            "id" => pending.id = Some(value.to_string()),
            "retry" => match value.parse() {
                Ok(ms) => pending.retry = Some(ms),
                Err(_) => tracing::debug!(value, "Ignoring non-numeric SSE retry"),
            },
            other => tracing::debug!(field = other, "Ignoring unknown SSE field"),
        }
    }

    pending.flush_into(&mut events);
    events
}

#[derive(Default)]
struct PendingEvent {
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
    retry: Option<u64>,
}

impl PendingEvent {
    fn flush_into(&mut self, events: &mut Vec<SseEvent>) {
        let pending = std::mem::take(self);
        if pending.data.is_empty() {
            return;
        }
        events.push(SseEvent {
            id: pending.id,
            event: pending.event,
            data: pending.data.join("\n"),
            retry: pending.retry,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame buffer
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulates raw bytes and releases only whole frames.
///
/// Bytes after the last blank line stay buffered until more input completes
/// them. Each byte is scanned for a boundary once.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
    scanned: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take everything up to and including the last blank line, if any.
    pub fn take_complete(&mut self) -> Option<Bytes> {
        let mut boundary = None;
        for i in self.scanned..self.buf.len() {
            if self.buf[i] == b'\n' && self.ends_empty_line(i) {
                boundary = Some(i + 1);
            }
        }

        let complete = boundary.map(|end| self.buf.split_to(end).freeze());
        self.scanned = self.buf.len();
        complete
    }

    /// Take whatever is left, complete or not.
    pub fn take_remaining(&mut self) -> Bytes {
        self.scanned = 0;
        self.buf.split().freeze()
    }

    /// Bytes held that do not yet form a complete frame.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether the line terminated by the `\n` at `i` is empty.
    fn ends_empty_line(&self, i: usize) -> bool {
        if i == 0 {
            return true;
        }
        match self.buf[i - 1] {
            b'\n' => true,
            b'\r' => i == 1 || self.buf[i - 2] == b'\n',
            _ => false,
        }
    }
}
