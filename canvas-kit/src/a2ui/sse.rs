//! SSE (Server-Sent Events) framing
//!
//! Implements SSE parsing for the A2UI streaming transports.
//! SSE format:
//! - Lines starting with "data:" contain JSON payload
//! - Lines starting with ":" are comments (keep-alive pings)
//! - Empty lines mark message boundaries
//! - `event:`, `id:` and `retry:` fields are accepted and ignored

/// SSE event parsed from stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Data event; multi-line data is joined with `\n`
    Data(String),
    /// Comment (keep-alive)
    Comment(String),
}

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single line from SSE stream
    /// Returns Some(event) when a complete event is ready
    pub fn parse_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(data) = line.strip_prefix("data:") {
            // A single leading space belongs to the framing
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.data_buffer.push(data.to_string());
            None
        } else if let Some(comment) = line.strip_prefix(':') {
            Some(SseEvent::Comment(comment.trim().to_string()))
        } else if line.is_empty() {
            self.take_data()
        } else {
            None
        }
    }

    /// Flush any remaining data
    pub fn flush(&mut self) -> Option<SseEvent> {
        self.take_data()
    }

    fn take_data(&mut self) -> Option<SseEvent> {
        if self.data_buffer.is_empty() {
            return None;
        }
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();
        Some(SseEvent::Data(data))
    }
}
