//! A2UI Stream Processor
//!
//! Normalizes JSON values, JSONL text and network transports into a validated
//! sequence of [`A2uiMessage`]s handed to an `on_message` callback. Problems are
//! reported through `on_error` and never stop the stream.
//!
//! With a non-zero batch window, validated messages are held back and
//! delivered together when the window closes. Batching delays delivery but
//! never reorders it.
//!
//! The network transports (`connect_sse`, `connect_stream`,
//! `connect_websocket`) live in [`transport`](super::transport).

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

use super::message::A2uiMessage;
use super::validation::parse_message;

/// Longest serialization of a rejected message kept for diagnostics
const INVALID_SNIPPET_CHARS: usize = 200;

/// Longest unparseable line kept for diagnostics
const PARSE_SNIPPET_CHARS: usize = 100;

/// Where a raw payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Jsonl,
    Sse,
    Stream,
    WebSocket,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Jsonl => "JSONL line",
            Origin::Sse => "SSE data",
            Origin::Stream => "stream line",
            Origin::WebSocket => "WebSocket message",
        })
    }
}

/// Errors reported through the `on_error` channel.
///
/// Treat all of them as "log and continue".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Well-formed JSON that is not a valid A2UI message.
    #[error("Invalid A2UI message: {snippet}")]
    InvalidMessage {
        /// Serialized value, truncated
        snippet: String,
        /// Validator findings
        errors: Vec<String>,
    },

    /// A payload that is not JSON at all.
    #[error("Failed to parse {origin}: {snippet}")]
    Parse { origin: Origin, snippet: String },

    /// Connecting failed or the connection dropped.
    #[error("{origin} connection error: {reason}")]
    Connection { origin: Origin, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Reading the response body failed midway.
    #[error("Failed to read response body: {reason}")]
    Body { reason: String },
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Stream processor configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// How long validated messages are held before delivery. Zero delivers
    /// immediately.
    pub batch_window: Duration,
}

impl StreamOptions {
    pub fn batched(batch_window: Duration) -> Self {
        StreamOptions { batch_window }
    }
}

type MessageHandler = dyn Fn(A2uiMessage) + Send + Sync;
type ErrorHandler = dyn Fn(StreamError) + Send + Sync;

#[derive(Default)]
struct Batch {
    buffer: Vec<A2uiMessage>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the buffer is taken, so a stale timer does nothing.
    generation: u64,
    /// Set by `destroy`; later messages are dropped.
    destroyed: bool,
}

struct Shared {
    on_message: Box<MessageHandler>,
    on_error: Box<ErrorHandler>,
    batch_window: Duration,
    batch: Mutex<Batch>,
    /// Held for the whole of a delivery; lock order is `delivery` then `batch`.
    delivery: ReentrantMutex<()>,
    connections: Mutex<Vec<AbortHandle>>,
}

/// Turns raw input into validated messages.
///
/// Cloning is cheap; clones share the same callbacks, batch and connections.
///
/// # Example
///
/// ```rust,ignore
/// let processor = StreamProcessor::with_error_handler(
///     StreamOptions::batched(Duration::from_millis(50)),
///     move |message| {
///         let _ = tx.send(message);
///     },
///     |error| log::warn!("{error}"),
/// );
///
/// processor.process_jsonl(include_str!("session.jsonl"));
/// processor.flush();
/// ```
#[derive(Clone)]
pub struct StreamProcessor {
    shared: Arc<Shared>,
}

impl fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("batch_window", &self.shared.batch_window)
            .field("pending", &self.pending())
            .finish()
    }
}

impl StreamProcessor {
    /// Create a processor whose errors are only logged
    pub fn new<F>(options: StreamOptions, on_message: F) -> Self
    where
        F: Fn(A2uiMessage) + Send + Sync + 'static,
    {
        Self::with_error_handler(options, on_message, |error| warn!("{error}"))
    }

    pub fn with_error_handler<F, E>(options: StreamOptions, on_message: F, on_error: E) -> Self
    where
        F: Fn(A2uiMessage) + Send + Sync + 'static,
        E: Fn(StreamError) + Send + Sync + 'static,
    {
        StreamProcessor {
            shared: Arc::new(Shared {
                on_message: Box::new(on_message),
                on_error: Box::new(on_error),
                batch_window: options.batch_window,
                batch: Mutex::new(Batch::default()),
                delivery: ReentrantMutex::new(()),
                connections: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn batch_window(&self) -> Duration {
        self.shared.batch_window
    }

    /// Number of validated messages waiting for the batch window
    pub fn pending(&self) -> usize {
        self.shared.batch.lock().buffer.len()
    }

    /// Process an in-memory value. Arrays are flattened at any depth.
    pub fn process_json(&self, value: &Value) {
        if let Value::Array(items) = value {
            for item in items {
                self.process_json(item);
            }
            return;
        }

        match parse_message(value) {
            Ok(message) => self.shared.emit(message),
            Err(e) => self.report(StreamError::InvalidMessage {
                snippet: truncate(&value.to_string(), INVALID_SNIPPET_CHARS),
                errors: e.errors,
            }),
        }
    }

    /// Process newline-delimited JSON. A bad line is reported and skipped.
    pub fn process_jsonl(&self, text: &str) {
        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.process_payload(Origin::Jsonl, line);
        }
    }

    /// Deliver everything buffered now and cancel the pending timer
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Flush, then abort every connection this processor opened.
    ///
    /// The processor delivers nothing after this returns; messages that still
    /// arrive are dropped. Safe to call more than once.
    pub fn destroy(&self) {
        self.shared.batch.lock().destroyed = true;
        self.flush();

        let connections = std::mem::take(&mut *self.shared.connections.lock());
        if !connections.is_empty() {
            debug!("Closing {} stream connection(s)", connections.len());
        }
        for connection in connections {
            connection.abort();
        }
    }

    /// Parse one raw payload and process it.
    ///
    /// Parse failures on the fetch-stream path are expected noise and are
    /// skipped; everywhere else they are reported.
    pub(crate) fn process_payload(&self, origin: Origin, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.process_json(&value),
            Err(e) if origin == Origin::Stream => {
                debug!("Skipping unparseable {origin}: {e}");
            }
            Err(_) => self.report_unparseable(origin, text),
        }
    }

    /// Report a payload that is not JSON, keeping a short snippet of it.
    pub(crate) fn report_unparseable(&self, origin: Origin, text: &str) {
        self.report(StreamError::Parse {
            origin,
            snippet: truncate(text, PARSE_SNIPPET_CHARS),
        });
    }

    pub(crate) fn report(&self, error: StreamError) {
        (self.shared.on_error)(error);
    }

    /// Remember a connection task so `destroy` can abort it
    pub(crate) fn track(&self, connection: AbortHandle) {
        let mut connections = self.shared.connections.lock();
        connections.retain(|c| !c.is_finished());
        connections.push(connection);
    }
}

impl Shared {
    fn emit(self: &Arc<Self>, message: A2uiMessage) {
        let mut batch = self.batch.lock();
        if batch.destroyed {
            debug!(
                "Dropping {} for surface {}: processor destroyed",
                message.message_type(),
                message.surface_id()
            );
            return;
        }
        if self.batch_window.is_zero() {
            drop(batch);
            self.deliver(vec![message]);
            return;
        }

        batch.buffer.push(message);
        if batch.timer.is_some() {
            return;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let generation = batch.generation;
                let window = self.batch_window;
                let shared: Weak<Shared> = Arc::downgrade(self);
                batch.timer = Some(runtime.spawn(async move {
                    tokio::time::sleep(window).await;
                    if let Some(shared) = shared.upgrade() {
                        shared.fire(generation);
                    }
                }));
            }
            Err(_) => {
                drop(batch);
                warn!("No tokio runtime for the batch timer, delivering immediately");
                self.flush();
            }
        }
    }

    fn fire(&self, generation: u64) {
        let _delivery = self.delivery.lock();
        let messages = {
            let mut batch = self.batch.lock();
            if batch.generation != generation {
                return;
            }
            batch.timer = None;
            batch.generation += 1;
            std::mem::take(&mut batch.buffer)
        };
        self.deliver(messages);
    }

    fn flush(&self) {
        let _delivery = self.delivery.lock();
        let messages = {
            let mut batch = self.batch.lock();
            if let Some(timer) = batch.timer.take() {
                timer.abort();
            }
            batch.generation += 1;
            std::mem::take(&mut batch.buffer)
        };
        self.deliver(messages);
    }

    fn deliver(&self, messages: Vec<A2uiMessage>) {
        if messages.is_empty() {
            return;
        }
        let _delivery = self.delivery.lock();
        for message in messages {
            (self.on_message)(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct Sink {
        messages: Arc<Mutex<Vec<A2uiMessage>>>,
        errors: Arc<Mutex<Vec<StreamError>>>,
    }

    impl Sink {
        fn processor(&self, options: StreamOptions) -> StreamProcessor {
            let messages = self.messages.clone();
            let errors = self.errors.clone();
            StreamProcessor::with_error_handler(
                options,
                move |m| messages.lock().push(m),
                move |e| errors.lock().push(e),
            )
        }

        fn surface_ids(&self) -> Vec<String> {
            self.messages
                .lock()
                .iter()
                .map(|m| m.surface_id().to_string())
                .collect()
        }

        fn error_count(&self) -> usize {
            self.errors.lock().len()
        }
    }

    fn create(id: &str) -> Value {
        json!({"createSurface": {"surfaceId": id}})
    }

    #[test]
    fn test_process_json_delivers_immediately() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::default());

        processor.process_json(&create("s1"));

        assert_eq!(sink.surface_ids(), vec!["s1"]);
        assert_eq!(processor.pending(), 0);
    }

    #[test]
    fn test_process_json_flattens_nested_arrays() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::default());

        processor.process_json(&json!([create("a"), [create("b"), [[create("c")]]], []]));

        assert_eq!(sink.surface_ids(), vec!["a", "b", "c"]);
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn test_invalid_message_reports_truncated_snippet() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::default());
        let long = "x".repeat(500);

        processor.process_json(&json!({"bogus": {"text": long}}));

        let errors = sink.errors.lock();
        let StreamError::InvalidMessage { snippet, errors: findings } = &errors[0] else {
            panic!("Expected InvalidMessage");
        };
        assert_eq!(snippet.chars().count(), INVALID_SNIPPET_CHARS);
        assert_eq!(findings, &vec!["Unknown message type: bogus".to_string()]);
        assert!(errors[0].to_string().starts_with("Invalid A2UI message: {\"bogus\""));
    }

    #[test]
    fn test_process_jsonl_continues_after_bad_line() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::default());

        processor.process_jsonl(
            "{\"createSurface\":{\"surfaceId\":\"a\"}}\n\n   \n{not json\r\n{\"createSurface\":{\"surfaceId\":\"b\"}}\n",
        );

        assert_eq!(sink.surface_ids(), vec!["a", "b"]);
        assert_eq!(
            *sink.errors.lock(),
            vec![StreamError::Parse {
                origin: Origin::Jsonl,
                snippet: "{not json".to_string()
            }]
        );
        assert_eq!(
            sink.errors.lock()[0].to_string(),
            "Failed to parse JSONL line: {not json"
        );
    }

    #[test]
    fn test_stream_origin_skips_parse_errors() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::default());

        processor.process_payload(Origin::Stream, "garbage");
        processor.process_payload(Origin::WebSocket, "garbage");

        assert_eq!(
            *sink.errors.lock(),
            vec![StreamError::Parse {
                origin: Origin::WebSocket,
                snippet: "garbage".to_string()
            }]
        );
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 4), "héll");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_window_delays_delivery() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::batched(Duration::from_millis(50)));

        processor.process_json(&create("s1"));
        processor.process_json(&create("s2"));
        assert!(sink.surface_ids().is_empty());
        assert_eq!(processor.pending(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(sink.surface_ids(), vec!["s1", "s2"]);
        assert_eq!(processor.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_delivers_before_window() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::batched(Duration::from_millis(50)));

        processor.process_json(&create("s1"));
        processor.process_json(&create("s2"));
        processor.flush();
        assert_eq!(sink.surface_ids(), vec!["s1", "s2"]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.surface_ids().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_batch_after_window() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::batched(Duration::from_millis(50)));

        processor.process_json(&create("s1"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        processor.process_json(&create("s2"));
        assert_eq!(sink.surface_ids(), vec!["s1"]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.surface_ids(), vec!["s1", "s2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_flushes_pending() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::batched(Duration::from_secs(5)));

        processor.process_json(&create("s1"));
        processor.destroy();
        processor.destroy();

        assert_eq!(sink.surface_ids(), vec!["s1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_delivered_after_destroy() {
        let sink = Sink::default();
        let batched = sink.processor(StreamOptions::batched(Duration::from_millis(50)));

        batched.process_json(&create("s1"));
        batched.destroy();
        batched.process_json(&create("late"));
        assert_eq!(batched.pending(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.surface_ids(), vec!["s1"]);

        let immediate = sink.processor(StreamOptions::default());
        immediate.destroy();
        immediate.process_jsonl("{\"createSurface\":{\"surfaceId\":\"after\"}}");
        assert_eq!(sink.surface_ids(), vec!["s1"]);
    }

    #[test]
    fn test_batching_without_runtime_delivers_immediately() {
        let sink = Sink::default();
        let processor = sink.processor(StreamOptions::batched(Duration::from_millis(50)));

        processor.process_json(&create("s1"));

        assert_eq!(sink.surface_ids(), vec!["s1"]);
    }

    #[test]
    fn test_reentrant_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<StreamProcessor>>> = Arc::new(Mutex::new(None));

        let processor = {
            let seen = seen.clone();
            let slot = slot.clone();
            StreamProcessor::new(StreamOptions::default(), move |m: A2uiMessage| {
                let id = m.surface_id().to_string();
                seen.lock().push(id.clone());
                if id == "outer" {
                    let inner = slot.lock().clone();
                    if let Some(p) = inner {
                        p.process_json(&json!({"destroySurface": {"surfaceId": "inner"}}));
                    }
                }
            })
        };
        *slot.lock() = Some(processor.clone());

        processor.process_json(&create("outer"));

        assert_eq!(*seen.lock(), vec!["outer", "inner"]);
    }
}
