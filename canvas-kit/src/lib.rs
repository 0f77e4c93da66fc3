//! # Description
//!
//! Canvas Kit is a Rust crate containing the protocol and state core for
//! A2UI dynamic canvases: agents stream small JSON messages, and the kit turns
//! them into live surfaces that a renderer can paint.
//!
//! # Features
//!
//! - RFC 6901 JSON Pointer addressing with immutable writes.
//! - Structural validation of the seven A2UI message kinds.
//! - A surface store with change events for every applied message.
//! - Stream ingestion from JSONL, SSE, fetch streams and WebSockets, with
//!   optional time-windowed batching.
//! - A renderer registry with lazy, cached resolution.

pub mod a2ui;

pub mod prelude;
