//! A2UI Surface Store
//!
//! Owns every live surface and applies messages to them in delivery order.
//! The store trusts its input: messages should come through
//! [`parse_message`](super::validation::parse_message) or the stream
//! processor. Anything addressed to a surface that does not exist is a silent
//! no-op, since late updates for a destroyed surface are an ordinary race in a
//! streaming system.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{
    component::A2uiComponent,
    data_model::DataModel,
    message::*,
    pointer::PointerError,
};

/// A named UI canvas with its own data model and component list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    /// Surface ID
    pub surface_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Data referenced by the components
    pub data_model: DataModel,

    /// Components keyed by id, in insertion order
    #[serde(serialize_with = "serialize_components")]
    components: IndexMap<String, A2uiComponent>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_components<S: Serializer>(
    components: &IndexMap<String, A2uiComponent>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(components.values())
}

impl Surface {
    fn new(msg: CreateSurface) -> Self {
        let now = Utc::now();
        Surface {
            surface_id: msg.surface_id,
            catalog_id: msg.catalog_id,
            title: msg.title,
            metadata: msg.metadata,
            data_model: DataModel::new(),
            components: IndexMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Components in list order
    pub fn components(&self) -> impl ExactSizeIterator<Item = &A2uiComponent> {
        self.components.values()
    }

    /// Get a component by ID
    pub fn get_component(&self, id: &str) -> Option<&A2uiComponent> {
        self.components.get(id)
    }

    /// Get all component IDs
    pub fn component_ids(&self) -> impl Iterator<Item = &String> {
        self.components.keys()
    }

    /// Resolve a pointer against this surface's data model
    pub fn resolve(&self, pointer: &str) -> Result<Option<&Value>, PointerError> {
        self.data_model.resolve(pointer)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Changes produced by applying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SurfaceCreated {
        surface_id: String,
    },
    SurfaceDestroyed {
        surface_id: String,
    },
    /// `path` is the pointer written; a patch reports the root (`""`).
    DataModelUpdated {
        surface_id: String,
        path: String,
    },
    ComponentsUpdated {
        surface_id: String,
        ids: Vec<String>,
    },
    /// `ids` holds only the components that were actually present.
    ComponentsRemoved {
        surface_id: String,
        ids: Vec<String>,
    },
    ActiveSurfaceChanged {
        surface_id: Option<String>,
    },
}

impl StoreEvent {
    /// The surface this event concerns, if any
    pub fn surface_id(&self) -> Option<&str> {
        match self {
            StoreEvent::SurfaceCreated { surface_id }
            | StoreEvent::SurfaceDestroyed { surface_id }
            | StoreEvent::DataModelUpdated { surface_id, .. }
            | StoreEvent::ComponentsUpdated { surface_id, .. }
            | StoreEvent::ComponentsRemoved { surface_id, .. } => Some(surface_id),
            StoreEvent::ActiveSurfaceChanged { surface_id } => surface_id.as_deref(),
        }
    }
}

/// The surface state machine.
///
/// # Example
///
/// ```rust,ignore
/// let mut store = SurfaceStore::new();
///
/// let json = serde_json::json!({"createSurface": {"surfaceId": "main"}});
/// let events = store.process_message(parse_message(&json)?);
///
/// for event in events {
///     if let StoreEvent::SurfaceCreated { surface_id } = event {
///         println!("Surface created: {surface_id}");
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SurfaceStore {
    /// Live surfaces by ID, in creation order
    surfaces: IndexMap<String, Surface>,

    /// The foregrounded surface
    active_surface_id: Option<String>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a surface by ID
    pub fn get_surface(&self, surface_id: &str) -> Option<&Surface> {
        self.surfaces.get(surface_id)
    }

    /// Components of a surface, empty when the surface is absent
    pub fn get_components(&self, surface_id: &str) -> Vec<&A2uiComponent> {
        self.surfaces
            .get(surface_id)
            .map(|s| s.components().collect())
            .unwrap_or_default()
    }

    /// Resolve a pointer in a surface's data model.
    ///
    /// An absent surface reads as `Ok(None)`.
    pub fn resolve_data(&self, surface_id: &str, pointer: &str) -> Result<Option<&Value>, PointerError> {
        match self.surfaces.get(surface_id) {
            Some(surface) => surface.resolve(pointer),
            None => Ok(None),
        }
    }

    /// IDs of all live surfaces, in creation order
    pub fn surface_ids(&self) -> impl Iterator<Item = &String> {
        self.surfaces.keys()
    }

    /// All live surfaces, in creation order
    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    pub fn active_surface_id(&self) -> Option<&str> {
        self.active_surface_id.as_deref()
    }

    /// Select the foregrounded surface. The id is not checked for existence.
    pub fn set_active_surface(&mut self, surface_id: Option<String>) {
        self.active_surface_id = surface_id;
    }

    /// Drop all surfaces and the active selection
    pub fn reset(&mut self) {
        self.surfaces.clear();
        self.active_surface_id = None;
    }

    /// Apply one message and report what changed
    pub fn process_message(&mut self, message: A2uiMessage) -> Vec<StoreEvent> {
        debug!("Applying {} to surface {}", message.message_type(), message.surface_id());

        match message {
            A2uiMessage::CreateSurface(msg) => self.create_surface(msg),
            A2uiMessage::DestroySurface(msg) => self.destroy_surface(msg),
            A2uiMessage::UpdateDataModel(msg) => self.update_data_model(msg),
            A2uiMessage::UpdateComponents(msg) => self.update_components(msg),
            A2uiMessage::RemoveComponents(msg) => self.remove_components(msg),
            A2uiMessage::AppendData(msg) => self.append_data(msg),
            A2uiMessage::PatchDataModel(msg) => self.patch_data_model(msg),
        }
    }

    /// Apply messages in order
    pub fn process_messages(&mut self, messages: impl IntoIterator<Item = A2uiMessage>) -> Vec<StoreEvent> {
        messages
            .into_iter()
            .flat_map(|message| self.process_message(message))
            .collect()
    }

    fn create_surface(&mut self, msg: CreateSurface) -> Vec<StoreEvent> {
        let surface_id = msg.surface_id.clone();
        if self.surfaces.contains_key(&surface_id) {
            debug!("Re-creating surface {surface_id}, previous state discarded");
        }
        self.surfaces.insert(surface_id.clone(), Surface::new(msg));

        let mut events = vec![StoreEvent::SurfaceCreated {
            surface_id: surface_id.clone(),
        }];
        if self.active_surface_id.is_none() {
            self.active_surface_id = Some(surface_id.clone());
            events.push(StoreEvent::ActiveSurfaceChanged {
                surface_id: Some(surface_id),
            });
        }
        events
    }

    fn destroy_surface(&mut self, msg: DestroySurface) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        if self.surfaces.shift_remove(&msg.surface_id).is_some() {
            events.push(StoreEvent::SurfaceDestroyed {
                surface_id: msg.surface_id.clone(),
            });
        }
        if self.active_surface_id.as_deref() == Some(msg.surface_id.as_str()) {
            self.active_surface_id = None;
            events.push(StoreEvent::ActiveSurfaceChanged { surface_id: None });
        }
        events
    }

    fn update_data_model(&mut self, msg: UpdateDataModel) -> Vec<StoreEvent> {
        let Some(surface) = self.surfaces.get_mut(&msg.surface_id) else {
            return Vec::new();
        };
        if let Err(e) = surface.data_model.set(&msg.path, msg.value) {
            warn!("Ignoring updateDataModel for surface {}: {e}", msg.surface_id);
            return Vec::new();
        }
        surface.touch();

        vec![StoreEvent::DataModelUpdated {
            surface_id: msg.surface_id,
            path: msg.path,
        }]
    }

    fn update_components(&mut self, msg: UpdateComponents) -> Vec<StoreEvent> {
        let Some(surface) = self.surfaces.get_mut(&msg.surface_id) else {
            return Vec::new();
        };

        let mut ids = Vec::with_capacity(msg.components.len());
        for component in msg.components {
            ids.push(component.id.clone());
            // Replacing a known id keeps its position.
            surface.components.insert(component.id.clone(), component);
        }
        surface.touch();

        vec![StoreEvent::ComponentsUpdated {
            surface_id: msg.surface_id,
            ids,
        }]
    }

    fn remove_components(&mut self, msg: RemoveComponents) -> Vec<StoreEvent> {
        let Some(surface) = self.surfaces.get_mut(&msg.surface_id) else {
            return Vec::new();
        };

        let ids = msg
            .component_ids
            .into_iter()
            .filter(|id| surface.components.shift_remove(id).is_some())
            .collect();
        surface.touch();

        vec![StoreEvent::ComponentsRemoved {
            surface_id: msg.surface_id,
            ids,
        }]
    }

    fn append_data(&mut self, msg: AppendData) -> Vec<StoreEvent> {
        let Some(surface) = self.surfaces.get_mut(&msg.surface_id) else {
            return Vec::new();
        };
        if let Err(e) = surface.data_model.append(&msg.path, msg.items) {
            warn!("Ignoring appendData for surface {}: {e}", msg.surface_id);
            return Vec::new();
        }
        surface.touch();

        vec![StoreEvent::DataModelUpdated {
            surface_id: msg.surface_id,
            path: msg.path,
        }]
    }

    fn patch_data_model(&mut self, msg: PatchDataModel) -> Vec<StoreEvent> {
        let Some(surface) = self.surfaces.get_mut(&msg.surface_id) else {
            return Vec::new();
        };
        surface.data_model.patch(&msg.patch);
        surface.touch();

        vec![StoreEvent::DataModelUpdated {
            surface_id: msg.surface_id,
            path: String::new(),
        }]
    }
}
