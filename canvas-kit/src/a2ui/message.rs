//! A2UI Protocol Message Types
//!
//! This module defines the Rust types for all A2UI protocol messages.
//! Every message is a single-key envelope whose key names the message kind:
//!
//! ```text
//! {"createSurface": {"surfaceId": "main", "title": "Quarterly report"}}
//! ```
//!
//! Messages are serialized/deserialized using serde_json. Use
//! [`parse_message`](super::validation::parse_message) at trust boundaries; it
//! validates the envelope before building the typed value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::component::A2uiComponent;

/// Lenient field deserializer: a value of the wrong shape reads as `None`.
pub(crate) fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let val = Option::<Value>::deserialize(d)?.and_then(|v| serde_json::from_value(v).ok());
    Ok(val)
}

/// Keeps the string entries of an array and drops everything else.
fn string_entries<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let entries = Vec::<Value>::deserialize(d)?
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect();
    Ok(entries)
}

/// Top-level A2UI message enum.
///
/// Each variant corresponds to one of the A2UI protocol message types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum A2uiMessage {
    /// Create (or re-create) a surface
    CreateSurface(CreateSurface),

    /// Delete a surface
    DestroySurface(DestroySurface),

    /// Write a value at a JSON Pointer in the data model
    UpdateDataModel(UpdateDataModel),

    /// Add or replace components by id
    UpdateComponents(UpdateComponents),

    /// Remove components by id
    RemoveComponents(RemoveComponents),

    /// Append items to an array in the data model
    AppendData(AppendData),

    /// Deep-merge a patch into the data model
    PatchDataModel(PatchDataModel),
}

impl A2uiMessage {
    /// Get the surface ID this message applies to
    pub fn surface_id(&self) -> &str {
        match self {
            A2uiMessage::CreateSurface(m) => &m.surface_id,
            A2uiMessage::DestroySurface(m) => &m.surface_id,
            A2uiMessage::UpdateDataModel(m) => &m.surface_id,
            A2uiMessage::UpdateComponents(m) => &m.surface_id,
            A2uiMessage::RemoveComponents(m) => &m.surface_id,
            A2uiMessage::AppendData(m) => &m.surface_id,
            A2uiMessage::PatchDataModel(m) => &m.surface_id,
        }
    }

    /// The kind of this message
    pub fn message_type(&self) -> MessageType {
        match self {
            A2uiMessage::CreateSurface(_) => MessageType::CreateSurface,
            A2uiMessage::DestroySurface(_) => MessageType::DestroySurface,
            A2uiMessage::UpdateDataModel(_) => MessageType::UpdateDataModel,
            A2uiMessage::UpdateComponents(_) => MessageType::UpdateComponents,
            A2uiMessage::RemoveComponents(_) => MessageType::RemoveComponents,
            A2uiMessage::AppendData(_) => MessageType::AppendData,
            A2uiMessage::PatchDataModel(_) => MessageType::PatchDataModel,
        }
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Message kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    CreateSurface,
    DestroySurface,
    UpdateDataModel,
    UpdateComponents,
    RemoveComponents,
    AppendData,
    PatchDataModel,
    #[serde(other)]
    Unknown,
}

impl MessageType {
    const KNOWN: [MessageType; 7] = [
        MessageType::CreateSurface,
        MessageType::DestroySurface,
        MessageType::UpdateDataModel,
        MessageType::UpdateComponents,
        MessageType::RemoveComponents,
        MessageType::AppendData,
        MessageType::PatchDataModel,
    ];

    /// Classify a raw JSON value by which known top-level key it carries.
    ///
    /// Does not validate the payload shape.
    pub fn of(value: &Value) -> MessageType {
        let Some(obj) = value.as_object() else {
            return MessageType::Unknown;
        };
        Self::KNOWN
            .into_iter()
            .find(|kind| obj.contains_key(kind.as_str()))
            .unwrap_or(MessageType::Unknown)
    }

    /// Parse from an envelope key
    pub fn from_tag(tag: &str) -> MessageType {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .unwrap_or(MessageType::Unknown)
    }

    /// The envelope key, or `"unknown"`
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::CreateSurface => "createSurface",
            MessageType::DestroySurface => "destroySurface",
            MessageType::UpdateDataModel => "updateDataModel",
            MessageType::UpdateComponents => "updateComponents",
            MessageType::RemoveComponents => "removeComponents",
            MessageType::AppendData => "appendData",
            MessageType::PatchDataModel => "patchDataModel",
            MessageType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create a surface.
///
/// # Example JSON
///
/// ```text
/// {
///   "createSurface": {
///     "surfaceId": "main",
///     "catalogId": "dynamic-canvas/v1",
///     "title": "Launch timeline"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurface {
    /// Unique identifier for this surface
    pub surface_id: String,

    /// Catalog the agent negotiated, opaque here
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CreateSurface {
    pub fn new(surface_id: impl Into<String>) -> Self {
        CreateSurface {
            surface_id: surface_id.into(),
            catalog_id: None,
            title: None,
            metadata: None,
        }
    }
}

/// Delete a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroySurface {
    pub surface_id: String,
}

/// Write `value` at `path` in the data model.
///
/// ```text
/// {"updateDataModel": {"surfaceId": "main", "path": "/sales/0/revenue", "value": 1200}}
/// ```
///
/// An empty `path` replaces the whole model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataModel {
    pub surface_id: String,

    /// JSON Pointer to write at
    pub path: String,

    /// Value to write; an absent value writes `null`
    #[serde(default)]
    pub value: Value,
}

/// Add or update components on a surface.
///
/// Records merge by `id`: known ids are replaced in place, new ids are
/// appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComponents {
    pub surface_id: String,
    pub components: Vec<A2uiComponent>,
}

/// Remove components by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveComponents {
    pub surface_id: String,

    #[serde(deserialize_with = "string_entries")]
    pub component_ids: Vec<String>,
}

/// Append `items` to the array at `path`, creating it when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendData {
    pub surface_id: String,
    pub path: String,
    pub items: Vec<Value>,
}

/// Deep-merge `patch` into the data model root.
///
/// ```text
/// {"patchDataModel": {"surfaceId": "main", "patch": {"config": {"theme": "dark", "legacy": null}}}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDataModel {
    pub surface_id: String,
    pub patch: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2ui::ComponentType;
    use serde_json::json;

    #[test]
    fn test_parse_create_surface() {
        let json = r#"{"createSurface": {"surfaceId": "main", "catalogId": "dynamic-canvas/v1", "title": "Report"}}"#;

        let msg: A2uiMessage = serde_json::from_str(json).unwrap();
        match msg {
            A2uiMessage::CreateSurface(create) => {
                assert_eq!(create.surface_id, "main");
                assert_eq!(create.catalog_id.as_deref(), Some("dynamic-canvas/v1"));
                assert_eq!(create.title.as_deref(), Some("Report"));
                assert_eq!(create.metadata, None);
            }
            _ => panic!("Expected CreateSurface"),
        }
    }

    #[test]
    fn test_create_surface_optional_fields_are_lenient() {
        let json = r#"{"createSurface": {"surfaceId": "s", "title": 12, "metadata": "nope"}}"#;

        let msg: A2uiMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, A2uiMessage::CreateSurface(CreateSurface::new("s")));
    }

    #[test]
    fn test_parse_update_components() {
        let json = r#"{
            "updateComponents": {
                "surfaceId": "main",
                "components": [
                    {"id": "c1", "component": "Code", "code": "fn main() {}", "language": "rust"},
                    {"id": "c2", "component": "Chart", "chartType": "bar", "data": "/sales"}
                ]
            }
        }"#;

        let msg: A2uiMessage = serde_json::from_str(json).unwrap();
        let A2uiMessage::UpdateComponents(update) = msg else {
            panic!("Expected UpdateComponents");
        };
        assert_eq!(update.components.len(), 2);
        assert_eq!(update.components[0].component, ComponentType::Code);
        assert_eq!(update.components[1].field("data"), Some(&json!("/sales")));
    }

    #[test]
    fn test_update_data_model_missing_value_is_null() {
        let msg: A2uiMessage =
            serde_json::from_value(json!({"updateDataModel": {"surfaceId": "s", "path": "/x"}}))
                .unwrap();
        let A2uiMessage::UpdateDataModel(update) = msg else {
            panic!("Expected UpdateDataModel");
        };
        assert_eq!(update.value, Value::Null);
    }

    #[test]
    fn test_remove_components_ignores_non_strings() {
        let msg: A2uiMessage = serde_json::from_value(json!({
            "removeComponents": {"surfaceId": "s", "componentIds": ["a", 1, null, "b"]}
        }))
        .unwrap();
        let A2uiMessage::RemoveComponents(remove) = msg else {
            panic!("Expected RemoveComponents");
        };
        assert_eq!(remove.component_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_to_envelope() {
        let msg = A2uiMessage::AppendData(AppendData {
            surface_id: "s1".to_string(),
            path: "/events".to_string(),
            items: vec![json!({"date": "2024-01-01", "title": "Kickoff"})],
        });

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"appendData": {"surfaceId": "s1", "path": "/events", "items": [{"date": "2024-01-01", "title": "Kickoff"}]}})
        );
        assert_eq!(
            msg.to_json_line().unwrap(),
            r#"{"appendData":{"surfaceId":"s1","path":"/events","items":[{"date":"2024-01-01","title":"Kickoff"}]}}"#
        );
    }

    #[test]
    fn test_message_type_of() {
        assert_eq!(
            MessageType::of(&json!({"destroySurface": {"surfaceId": "s"}})),
            MessageType::DestroySurface
        );
        assert_eq!(MessageType::of(&json!({"beginRendering": {}})), MessageType::Unknown);
        assert_eq!(MessageType::of(&json!([1, 2])), MessageType::Unknown);
        assert_eq!(MessageType::from_tag("patchDataModel"), MessageType::PatchDataModel);
        assert_eq!(MessageType::from_tag("surfaceUpdate").as_str(), "unknown");
    }

    #[test]
    fn test_surface_id_and_type() {
        let msg = A2uiMessage::PatchDataModel(PatchDataModel {
            surface_id: "dash".to_string(),
            patch: Map::new(),
        });
        assert_eq!(msg.surface_id(), "dash");
        assert_eq!(msg.message_type(), MessageType::PatchDataModel);
        assert_eq!(msg.message_type().to_string(), "patchDataModel");
    }
}
