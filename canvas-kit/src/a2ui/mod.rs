//! A2UI Protocol Core
//!
//! A2UI (Agent-to-UI) is a declarative JSON protocol for AI agents to stream
//! rich, incrementally updated visual surfaces. This module implements the
//! client-side state core: everything up to, but not including, the renderers.
//!
//! # Architecture
//!
//! ```text
//! transport bytes (JSONL / SSE / fetch stream / WebSocket)
//!        ↓
//! StreamProcessor ── validate, batch
//!        ↓
//!   A2uiMessage
//!        ↓
//! SurfaceStore ── DataModel (JSON Pointer) + components
//!        ↓
//! ComponentRegistry ── lazily resolved renderer per component
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_kit::a2ui::*;
//!
//! let mut store = SurfaceStore::new();
//!
//! let json = serde_json::json!({"createSurface": {"surfaceId": "main"}});
//! let message = parse_message(&json)?;
//!
//! let events = store.process_message(message);
//! ```

mod catalog;
mod component;
mod data_model;
mod host;
mod message;
pub mod pointer;
mod registry;
mod sse;
mod stream;
mod surface;
mod transport;
mod validation;

pub use catalog::*;
pub use component::*;
pub use data_model::*;
pub use host::*;
pub use message::*;
pub use pointer::{
    MAX_POINTER_DEPTH, PointerError, append_at_pointer, build_pointer, escape_token, parse_pointer, pointer_depth,
    resolve_pointer, set_pointer,
};
pub use registry::*;
pub use sse::*;
pub use stream::*;
pub use surface::*;
pub use transport::*;
pub use validation::*;
