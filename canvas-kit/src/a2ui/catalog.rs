//! Component catalog for agent negotiation.
//!
//! Agents fetch the catalog to learn which components a client can render and
//! which fields they accept. It is descriptive only; the validator does not
//! consult it.

use serde::Serialize;
use serde_json::{Value, json};

use super::component::ComponentType;

/// Identifier agents put in `createSurface.catalogId`
pub const DYNAMIC_CANVAS_CATALOG_ID: &str = "dynamic-canvas/v1";

/// Field value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
}

/// One field of a catalog component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl CatalogField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        CatalogField {
            name: name.into(),
            field_type,
            required: false,
            description: None,
            enum_values: Vec::new(),
            default: None,
        }
    }

    /// An enum field with its allowed values
    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        let mut field = Self::new(name, FieldType::Enum);
        field.enum_values = values.iter().map(|v| v.to_string()).collect();
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Catalog entry for one component type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogComponentDef {
    pub component: ComponentType,
    pub description: String,
    pub fields: Vec<CatalogField>,
    /// External rendering libraries the renderer needs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub peer_deps: Vec<String>,
}

impl CatalogComponentDef {
    fn new(component: ComponentType, description: &str, fields: Vec<CatalogField>, peer_deps: &[&str]) -> Self {
        CatalogComponentDef {
            component,
            description: description.to_string(),
            fields,
            peer_deps: peer_deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&CatalogField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A capability manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCatalog {
    pub catalog_id: String,
    pub version: String,
    pub description: String,
    pub components: Vec<CatalogComponentDef>,
}

impl ComponentCatalog {
    pub fn component(&self, component_type: ComponentType) -> Option<&CatalogComponentDef> {
        self.components.iter().find(|c| c.component == component_type)
    }
}

/// The built-in `dynamic-canvas/v1` catalog
pub fn dynamic_canvas_catalog() -> ComponentCatalog {
    let pointer = |name: &str, what: &str| {
        CatalogField::new(name, FieldType::String).describe(format!("JSON Pointer to {what} array"))
    };
    let flag = |name: &str, default: bool| CatalogField::new(name, FieldType::Boolean).default_value(json!(default));

    let components = vec![
        CatalogComponentDef::new(
            ComponentType::Chart,
            "SVG charts: bar, line, scatter, pie, area, donut, radar, heatmap",
            vec![
                CatalogField::enumeration(
                    "chartType",
                    &["bar", "line", "scatter", "pie", "area", "donut", "radar", "heatmap"],
                )
                .required(),
                pointer("data", "data").required(),
                CatalogField::new("title", FieldType::String),
                CatalogField::new("xAxis", FieldType::Object),
                CatalogField::new("yAxis", FieldType::Object),
                CatalogField::new("colors", FieldType::Array),
                CatalogField::new("series", FieldType::Array),
                flag("threeD", false),
                flag("showLegend", true),
            ],
            &["d3"],
        ),
        CatalogComponentDef::new(
            ComponentType::Timeline,
            "Rich timeline with alternating, grouped, and zoomable layouts",
            vec![
                pointer("events", "events").required(),
                CatalogField::new("title", FieldType::String),
                CatalogField::enumeration("orientation", &["horizontal", "vertical"])
                    .default_value(json!("vertical")),
                CatalogField::enumeration("layout", &["default", "alternating", "grouped"])
                    .default_value(json!("default")),
                CatalogField::new("groupBy", FieldType::String),
                flag("zoomable", false),
            ],
            &[],
        ),
        CatalogComponentDef::new(
            ComponentType::KnowledgeGraph,
            "Force-directed knowledge graph (2D default, optional 3D)",
            vec![
                pointer("nodes", "nodes").required(),
                pointer("edges", "edges").required(),
                CatalogField::new("title", FieldType::String),
                CatalogField::enumeration("layout", &["force", "radial", "hierarchical"])
                    .default_value(json!("force")),
                flag("threeD", false),
                flag("directed", false),
            ],
            &["react-force-graph-2d"],
        ),
        CatalogComponentDef::new(
            ComponentType::Map,
            "Globe/map with markers (Cesium-based, lazy-loaded)",
            vec![
                CatalogField::new("center", FieldType::Object),
                CatalogField::new("zoom", FieldType::Number).default_value(json!(2)),
                pointer("markers", "markers"),
                CatalogField::new("title", FieldType::String),
                CatalogField::enumeration("baseLayer", &["satellite", "terrain", "streets", "dark"])
                    .default_value(json!("streets")),
                flag("terrain", false),
            ],
            &["@cesium/engine", "resium"],
        ),
        CatalogComponentDef::new(
            ComponentType::Media,
            "Native image, video, and audio elements",
            vec![
                CatalogField::enumeration("mediaType", &["image", "video", "audio"]).required(),
                CatalogField::new("src", FieldType::String).required(),
                CatalogField::new("alt", FieldType::String),
                CatalogField::new("caption", FieldType::String),
                flag("controls", true),
                CatalogField::enumeration("fit", &["contain", "cover", "fill", "none", "scale-down"])
                    .default_value(json!("contain")),
            ],
            &[],
        ),
        CatalogComponentDef::new(
            ComponentType::Document,
            "Markdown or HTML document with optional table of contents",
            vec![
                CatalogField::new("content", FieldType::String).required(),
                CatalogField::new("title", FieldType::String),
                CatalogField::enumeration("format", &["markdown", "html"]).default_value(json!("markdown")),
                flag("toc", false),
            ],
            &["react-markdown", "remark-gfm"],
        ),
        CatalogComponentDef::new(
            ComponentType::Code,
            "Syntax-highlighted code block with shiki",
            vec![
                CatalogField::new("code", FieldType::String).required(),
                CatalogField::new("language", FieldType::String).default_value(json!("text")),
                CatalogField::new("filename", FieldType::String),
                CatalogField::new("highlightLines", FieldType::Array),
                flag("showLineNumbers", true),
                flag("showCopyButton", true),
            ],
            &["shiki"],
        ),
        CatalogComponentDef::new(
            ComponentType::Artifact,
            "Sandboxed HTML/CSS/JS iframe",
            vec![
                CatalogField::new("html", FieldType::String),
                CatalogField::new("css", FieldType::String),
                CatalogField::new("js", FieldType::String),
                CatalogField::new("title", FieldType::String),
                CatalogField::new("sandboxPermissions", FieldType::Array),
            ],
            &[],
        ),
        CatalogComponentDef::new(
            ComponentType::Custom,
            "Client-side registry key escape hatch",
            vec![
                CatalogField::new("rendererKey", FieldType::String).required(),
                CatalogField::new("title", FieldType::String),
                CatalogField::new("props", FieldType::Object),
            ],
            &[],
        ),
    ];

    ComponentCatalog {
        catalog_id: DYNAMIC_CANVAS_CATALOG_ID.to_string(),
        version: "1.0.0".to_string(),
        description: "Dynamic Canvas: A2UI-native visualization components".to_string(),
        components,
    }
}
