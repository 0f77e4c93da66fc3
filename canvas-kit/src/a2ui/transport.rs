//! Network transports for the [`StreamProcessor`].
//!
//! Each `connect_*` call spawns a tokio task that reads the transport and feeds
//! payloads through the processor, and returns a [`StreamHandle`] to stop it.
//! The processor remembers every handle so [`StreamProcessor::destroy`] can
//! abort them all.
//!
//! | transport | framing | unparseable payloads |
//! |---|---|---|
//! | `connect_sse` | SSE events | reported |
//! | `connect_stream` | lines, optional `data: ` prefix | skipped |
//! | `connect_websocket` | text frames; binary frames are unparseable | reported |
//!
//! These must be called from within a tokio runtime.

use std::pin::pin;

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

use super::sse::{SseEvent, SseParser};
use super::stream::{Origin, StreamError, StreamProcessor};

/// An HTTP request whose response body is read as a stream.
///
/// GET by default; setting a JSON body switches to POST.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl StreamRequest {
    pub fn new(url: impl Into<String>) -> Self {
        StreamRequest {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Add authorization header
    pub fn auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Send `body` as JSON with a POST
    pub fn json(mut self, body: Value) -> Self {
        self.method = Method::POST;
        self.body = Some(body);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn build(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut request = client.request(self.method.clone(), self.url.as_str());
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &self.body {
            request = request.json(body);
        }
        request
    }

    /// Send the request, turning failures and non-2xx statuses into stream errors.
    async fn open(&self, origin: Origin) -> Result<reqwest::Response, StreamError> {
        let response = self
            .build(&reqwest::Client::new())
            .send()
            .await
            .map_err(|e| StreamError::Connection {
                origin,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(response)
    }
}

impl From<&str> for StreamRequest {
    fn from(url: &str) -> Self {
        StreamRequest::new(url)
    }
}

impl From<String> for StreamRequest {
    fn from(url: String) -> Self {
        StreamRequest::new(url)
    }
}

/// A running transport connection.
///
/// Dropping the handle does not stop the connection; call [`close`](Self::close).
#[derive(Debug)]
pub struct StreamHandle {
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop reading. Calling this more than once is harmless.
    pub fn close(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the connection ends or is closed
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                debug!("Stream task failed: {e}");
            }
        }
    }
}

/// Longest line a [`LineBuffer`] holds before giving up on it.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Splits a byte stream into lines.
///
/// Bytes are held until a newline arrives, so a multi-byte character split
/// across chunks decodes intact. A line that grows past the limit without a
/// newline is discarded up to its terminator.
#[derive(Debug)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    /// Prefix of `bytes` already known to hold no newline
    scanned: usize,
    limit: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn with_limit(limit: usize) -> Self {
        LineBuffer {
            bytes: Vec::new(),
            scanned: 0,
            limit,
            discarding: false,
        }
    }

    /// Add a chunk and return the lines it completed, without terminators
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.bytes[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line: Vec<u8> = self.bytes.drain(..=end).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            let text = String::from_utf8_lossy(&line[..end]);
            lines.push(text.strip_suffix('\r').unwrap_or(&text).to_string());
        }
        self.scanned = self.bytes.len();

        if self.bytes.len() > self.limit {
            if !self.discarding {
                warn!("Discarding line longer than {} bytes", self.limit);
            }
            self.bytes.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        lines
    }

    /// Whatever is left once the stream ends, if it is not blank
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.bytes);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        let text = String::from_utf8_lossy(&rest);
        (!text.trim().is_empty()).then(|| text.into_owned())
    }
}

/// Turn a stream of byte chunks into a stream of lines.
///
/// The trailing partial line is yielded at the end unless the source failed.
pub fn stream_lines<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut buffer = LineBuffer::default();
        let mut chunks = pin!(chunks);
        let mut failed = false;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for line in buffer.push(bytes.as_ref()) {
                        yield Ok(line);
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(e);
                    break;
                }
            }
        }

        if !failed {
            if let Some(rest) = buffer.finish() {
                yield Ok(rest);
            }
        }
    }
}

/// Parse a WebSocket endpoint, accepting `http(s)` as `ws(s)`
pub fn websocket_url(url: &str) -> Result<Url, String> {
    let mut parsed = Url::parse(url).map_err(|e| format!("invalid URL {url}: {e}"))?;
    let scheme = match parsed.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(format!("unsupported WebSocket scheme \"{other}\"")),
    };
    if parsed.scheme() != scheme {
        // http <-> ws and https <-> wss are both "special" schemes, so this cannot fail
        let _ = parsed.set_scheme(scheme);
    }
    Ok(parsed)
}

/// The JSON payload of a fetch-stream line: trimmed, `data: ` prefix removed.
pub fn payload_of(line: &str) -> Option<&str> {
    let line = line.trim();
    let payload = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    (!payload.is_empty()).then_some(payload)
}

impl StreamProcessor {
    /// Read a Server-Sent-Events endpoint.
    pub fn connect_sse(&self, request: impl Into<StreamRequest>) -> StreamHandle {
        let request = request.into().header("Accept", "text/event-stream");
        let processor = self.clone();
        self.spawn_connection(async move { processor.run_sse(request).await })
    }

    /// Read a streaming HTTP body line by line.
    pub fn connect_stream(&self, request: impl Into<StreamRequest>) -> StreamHandle {
        let request = request.into();
        let processor = self.clone();
        self.spawn_connection(async move { processor.run_stream(request).await })
    }

    /// Read text frames from a WebSocket.
    pub fn connect_websocket(&self, url: impl Into<String>) -> StreamHandle {
        let url = url.into();
        let processor = self.clone();
        self.spawn_connection(async move { processor.run_websocket(url).await })
    }

    fn spawn_connection<F>(&self, connection: F) -> StreamHandle
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(connection);
        self.track(task.abort_handle());
        StreamHandle { task }
    }

    async fn run_sse(&self, request: StreamRequest) {
        info!("Opening SSE connection to {}", request.url());
        let response = match request.open(Origin::Sse).await {
            Ok(response) => response,
            Err(e) => return self.report(e),
        };

        let mut parser = SseParser::new();
        let mut lines = pin!(stream_lines(response.bytes_stream()));
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if let Some(SseEvent::Data(data)) = parser.parse_line(&line) {
                        self.process_payload(Origin::Sse, &data);
                    }
                }
                Err(e) => {
                    return self.report(StreamError::Connection {
                        origin: Origin::Sse,
                        reason: e.to_string(),
                    });
                }
            }
        }
        if let Some(SseEvent::Data(data)) = parser.flush() {
            self.process_payload(Origin::Sse, &data);
        }
        info!("SSE connection to {} closed", request.url());
    }

    async fn run_stream(&self, request: StreamRequest) {
        info!("Opening stream from {}", request.url());
        let response = match request.open(Origin::Stream).await {
            Ok(response) => response,
            Err(e) => return self.report(e),
        };

        let mut lines = pin!(stream_lines(response.bytes_stream()));
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if let Some(payload) = payload_of(&line) {
                        self.process_payload(Origin::Stream, payload);
                    }
                }
                Err(e) => {
                    return self.report(StreamError::Body {
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!("Stream from {} ended", request.url());
    }

    async fn run_websocket(&self, url: String) {
        let url = match websocket_url(&url) {
            Ok(url) => url,
            Err(reason) => {
                return self.report(StreamError::Connection {
                    origin: Origin::WebSocket,
                    reason,
                });
            }
        };
        info!("Opening WebSocket to {url}");
        let mut socket = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(e) => {
                return self.report(StreamError::Connection {
                    origin: Origin::WebSocket,
                    reason: e.to_string(),
                });
            }
        };

        while let Some(frame) = socket.next().await {
            match frame {
                Ok(message) if message.is_close() => break,
                Ok(message) if message.is_text() => match message.to_text() {
                    Ok(text) => self.process_payload(Origin::WebSocket, text),
                    Err(_) => self.report(StreamError::Parse {
                        origin: Origin::WebSocket,
                        snippet: String::new(),
                    }),
                },
                Ok(message) if message.is_binary() => {
                    let bytes = message.into_data();
                    debug!("Binary WebSocket frame of {} bytes", bytes.len());
                    self.report_unparseable(Origin::WebSocket, &String::from_utf8_lossy(&bytes));
                }
                Ok(_) => {}
                Err(e) => {
                    return self.report(StreamError::Connection {
                        origin: Origin::WebSocket,
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!("WebSocket to {url} closed");
    }
}
