//! A2UI Host
//!
//! Connects a transport to a [`SurfaceStore`]. The stream processor's
//! callbacks only push into a channel; [`A2uiHost::poll`] drains it on the
//! owner's thread and applies messages there, so the store keeps a single
//! writer no matter which thread a transport or batch timer runs on.

use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use super::message::{A2uiMessage, MessageType};
use super::stream::{StreamError, StreamOptions, StreamProcessor};
use super::surface::{StoreEvent, SurfaceStore};
use super::transport::StreamRequest;

/// Which transport `connect` opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Sse,
    Stream,
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Sse => "sse",
            TransportKind::Stream => "stream",
            TransportKind::WebSocket => "ws",
        })
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sse" => Ok(TransportKind::Sse),
            "stream" | "fetch" => Ok(TransportKind::Stream),
            "ws" | "websocket" => Ok(TransportKind::WebSocket),
            other => Err(format!("unknown transport \"{other}\" (expected sse, stream or ws)")),
        }
    }
}

/// A2UI Host configuration
#[derive(Clone, Debug, Default)]
pub struct A2uiHostConfig {
    /// Agent endpoint
    pub url: Option<String>,
    pub transport: TransportKind,
    /// Zero delivers every message as soon as it is validated
    pub batch_window: Duration,
    /// Optional authentication token, sent as a bearer token over HTTP
    pub auth_token: Option<String>,
}

/// Errors from host operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("no agent URL configured")]
    NoUrl,
}

/// Events from A2UI host
#[derive(Clone, Debug, PartialEq)]
pub enum A2uiHostEvent {
    /// A connection was opened
    Connected,
    /// A message was applied to the store
    Applied {
        message_type: MessageType,
        events: Vec<StoreEvent>,
    },
    /// Input was rejected or the transport failed
    Error(StreamError),
    /// The connection ended
    Disconnected,
}

enum Inbound {
    Connected,
    Message(A2uiMessage),
    Error(StreamError),
    Disconnected,
}

/// A2UI Host owns a surface store and the processor feeding it.
pub struct A2uiHost {
    config: A2uiHostConfig,
    store: SurfaceStore,
    processor: StreamProcessor,
    event_receiver: Receiver<Inbound>,
    event_sender: Sender<Inbound>,
    is_connected: bool,
}

impl fmt::Debug for A2uiHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("A2uiHost")
            .field("config", &self.config)
            .field("surfaces", &self.store.surface_ids().collect::<Vec<_>>())
            .field("is_connected", &self.is_connected)
            .finish()
    }
}

impl A2uiHost {
    /// Create a new A2UI host with the given configuration
    pub fn new(config: A2uiHostConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let messages = tx.clone();
        let errors = tx.clone();
        let processor = StreamProcessor::with_error_handler(
            StreamOptions::batched(config.batch_window),
            move |message| {
                let _ = messages.send(Inbound::Message(message));
            },
            move |error| {
                let _ = errors.send(Inbound::Error(error));
            },
        );

        A2uiHost {
            config,
            store: SurfaceStore::new(),
            processor,
            event_receiver: rx,
            event_sender: tx,
            is_connected: false,
        }
    }

    pub fn config(&self) -> &A2uiHostConfig {
        &self.config
    }

    /// Open the configured transport. Must be called within a tokio runtime.
    pub fn connect(&mut self) -> Result<(), HostError> {
        if self.is_connected {
            return Err(HostError::AlreadyConnected);
        }
        let url = self.config.url.clone().ok_or(HostError::NoUrl)?;
        info!("Connecting to {url} over {}", self.config.transport);

        let request = match &self.config.auth_token {
            Some(token) => StreamRequest::new(url.clone()).auth(token),
            None => StreamRequest::new(url.clone()),
        };
        let handle = match self.config.transport {
            TransportKind::Sse => self.processor.connect_sse(request),
            TransportKind::Stream => self.processor.connect_stream(request),
            TransportKind::WebSocket => self.processor.connect_websocket(url),
        };

        let tx = self.event_sender.clone();
        let _ = tx.send(Inbound::Connected);
        tokio::spawn(async move {
            handle.join().await;
            let _ = tx.send(Inbound::Disconnected);
        });

        self.is_connected = true;
        Ok(())
    }

    /// Feed newline-delimited JSON; results show up on the next `poll`
    pub fn process_jsonl(&self, text: &str) {
        self.processor.process_jsonl(text);
    }

    /// Feed an in-memory value or array of values
    pub fn process_json(&self, value: &Value) {
        self.processor.process_json(value);
    }

    /// Release any batched messages to the channel now
    pub fn flush(&self) {
        self.processor.flush();
    }

    /// Flush pending messages and close the connection.
    ///
    /// Flushed messages are still applied by the next `poll`. Input fed in
    /// afterwards is dropped.
    pub fn destroy(&mut self) {
        self.processor.destroy();
    }

    /// Poll for pending events (non-blocking), applying messages to the store
    pub fn poll(&mut self) -> Option<A2uiHostEvent> {
        let inbound = match self.event_receiver.try_recv() {
            Ok(inbound) => inbound,
            // The host keeps a sender, so the channel never disconnects
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        };

        let event = match inbound {
            Inbound::Connected => A2uiHostEvent::Connected,
            Inbound::Message(message) => {
                let message_type = message.message_type();
                let events = self.store.process_message(message);
                A2uiHostEvent::Applied {
                    message_type,
                    events,
                }
            }
            Inbound::Error(error) => {
                warn!("A2UI Host Error: {error}");
                A2uiHostEvent::Error(error)
            }
            Inbound::Disconnected => {
                info!("A2UI Host Disconnected");
                self.is_connected = false;
                A2uiHostEvent::Disconnected
            }
        };
        Some(event)
    }

    /// Poll all pending events
    pub fn poll_all(&mut self) -> Vec<A2uiHostEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.poll() {
            events.push(event);
        }
        events
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn store(&self) -> &SurfaceStore {
        &self.store
    }

    /// Direct access, e.g. to pick the active surface
    pub fn store_mut(&mut self) -> &mut SurfaceStore {
        &mut self.store
    }

    /// The processor feeding this host, for transports the host does not open itself
    pub fn processor(&self) -> &StreamProcessor {
        &self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("sse".parse::<TransportKind>(), Ok(TransportKind::Sse));
        assert_eq!("WebSocket".parse::<TransportKind>(), Ok(TransportKind::WebSocket));
        assert_eq!("fetch".parse::<TransportKind>(), Ok(TransportKind::Stream));
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
        assert_eq!(TransportKind::WebSocket.to_string(), "ws");
    }

    #[test]
    fn test_process_jsonl_applies_on_poll() {
        let mut host = A2uiHost::new(A2uiHostConfig::default());

        host.process_jsonl(concat!(
            "{\"createSurface\":{\"surfaceId\":\"s1\"}}\n",
            "{\"updateDataModel\":{\"surfaceId\":\"s1\",\"path\":\"/x\",\"value\":42}}\n",
            "{\"nope\":{}}\n",
        ));
        assert!(host.store().get_surface("s1").is_none());

        let events = host.poll_all();

        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            A2uiHostEvent::Applied { message_type: MessageType::CreateSurface, .. }
        ));
        assert!(matches!(&events[2], A2uiHostEvent::Error(StreamError::InvalidMessage { .. })));
        assert_eq!(host.store().resolve_data("s1", "/x").unwrap(), Some(&json!(42)));
        assert!(host.poll().is_none());
    }

    #[test]
    fn test_connect_without_url() {
        let mut host = A2uiHost::new(A2uiHostConfig::default());
        assert_eq!(host.connect(), Err(HostError::NoUrl));
        assert!(!host.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batched_host_flushes_on_destroy() {
        let mut host = A2uiHost::new(A2uiHostConfig {
            batch_window: Duration::from_secs(1),
            ..Default::default()
        });

        host.process_json(&json!([
            {"createSurface": {"surfaceId": "a"}},
            {"createSurface": {"surfaceId": "b"}}
        ]));
        assert!(host.poll_all().is_empty());

        host.destroy();

        assert_eq!(host.poll_all().len(), 2);
        assert_eq!(host.store().surface_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(host.store().active_surface_id(), Some("a"));
    }

    #[tokio::test]
    async fn test_connect_stream_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let n = socket.read(&mut request).await.unwrap();
            let request = String::from_utf8_lossy(&request[..n]).to_lowercase();
            assert!(request.contains("authorization: bearer t0k3n"));
            let body = "{\"createSurface\":{\"surfaceId\":\"live\"}}\n";
            let response = format!("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n{body}");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let mut host = A2uiHost::new(A2uiHostConfig {
            url: Some(format!("http://{addr}/a2ui")),
            transport: TransportKind::Stream,
            auth_token: Some("t0k3n".to_string()),
            ..Default::default()
        });
        host.connect().unwrap();
        assert_eq!(host.connect(), Err(HostError::AlreadyConnected));

        let mut events = Vec::new();
        while !events.contains(&A2uiHostEvent::Disconnected) {
            events.extend(host.poll_all());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(events.first(), Some(&A2uiHostEvent::Connected));
        assert!(host.store().get_surface("live").is_some());
        assert!(!host.is_connected());
    }
}
