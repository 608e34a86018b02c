//! Incremental server-sent events decoder
//!
//! Bytes arrive in arbitrary chunks; events are emitted once their blank-line
//! terminator has been seen.

use thiserror::Error;

/// Upper bound on buffered bytes without an event boundary
pub const MAX_SSE_BUFFER_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SseError {
    #[error("event stream buffer exceeded {0} bytes")]
    BufferOverflow(usize),
    #[error("event stream contained invalid UTF-8")]
    InvalidUtf8,
}

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// What an event means to the job stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseKind<'a> {
    /// Unnamed (or `message`) event carrying a payload
    Message,
    /// Heartbeat
    Ping,
    Named(&'a str),
}

impl SseEvent {
    pub fn kind(&self) -> SseKind<'_> {
        match self.event.as_deref() {
            None | Some("message") => SseKind::Message,
            Some("ping") => SseKind::Ping,
            Some(other) => SseKind::Named(other),
        }
    }
}

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_SSE_BUFFER_BYTES)
    }

    pub fn with_limit(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Feed a chunk and collect every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, SseError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(block) = self.drain_next_block() {
            let text = std::str::from_utf8(&block).map_err(|_| SseError::InvalidUtf8)?;
            if let Some(event) = parse_block(text) {
                events.push(event);
            }
        }

        if self.buffer.len() > self.max_buffer {
            self.buffer.clear();
            return Err(SseError::BufferOverflow(self.max_buffer));
        }

        Ok(events)
    }

    /// Bytes received after the last complete event
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn drain_next_block(&mut self) -> Option<Vec<u8>> {
        let (pos, delim_len) = find_event_boundary(&self.buffer)?;
        let block = self.buffer[..pos].to_vec();
        self.buffer.drain(..pos + delim_len);
        Some(block)
    }
}

fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a <= b { (a, 2) } else { (b, 4) }),
        (Some(a), None) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();
    let mut has_data = false;

    for line in block.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => {
                if has_data {
                    event.data.push('\n');
                }
                event.data.push_str(value);
                has_data = true;
            }
            "id" => event.id = Some(value.to_string()),
            // retry hints are irrelevant without reconnection
            _ => {}
        }
    }

    if has_data || event.event.is_some() {
        Some(event)
    } else {
        None
    }
}
