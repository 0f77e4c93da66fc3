//! Common imports for hosts built on Canvas Kit.

pub use crate::a2ui::{
    A2uiComponent, A2uiHost, A2uiHostConfig, A2uiHostEvent, A2uiMessage, ComponentRegistry,
    ComponentType, ComponentView, DataModel, MessageType, StoreEvent, StreamError, StreamHandle,
    StreamOptions, StreamProcessor, StreamRequest, Surface, SurfaceStore, TransportKind,
    parse_message, validate_message,
};
