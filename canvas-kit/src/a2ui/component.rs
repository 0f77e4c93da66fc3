//! A2UI Component Types
//!
//! A component is a flat record `{ "id", "component", ...fields }`. The tag
//! selects one of nine renderer kinds; the remaining fields are kind-specific
//! and mostly hold JSON Pointers into the surface data model.
//!
//! [`A2uiComponent`] keeps the record exactly as received so it round-trips
//! field for field. [`A2uiComponent::view`] offers a typed reading of it for
//! renderers. Views are lenient: a field with the wrong type or an unknown
//! enum value reads as `None`/`Unknown` and never fails.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::lenient;

/// Component type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Chart,
    Timeline,
    KnowledgeGraph,
    Map,
    Media,
    Document,
    Code,
    Artifact,

    /// Escape hatch resolved through a client-side renderer key
    Custom,
}

impl ComponentType {
    /// Get the A2UI component type name
    pub fn name(&self) -> &'static str {
        match self {
            ComponentType::Chart => "Chart",
            ComponentType::Timeline => "Timeline",
            ComponentType::KnowledgeGraph => "KnowledgeGraph",
            ComponentType::Map => "Map",
            ComponentType::Media => "Media",
            ComponentType::Document => "Document",
            ComponentType::Code => "Code",
            ComponentType::Artifact => "Artifact",
            ComponentType::Custom => "Custom",
        }
    }

    /// Parse from the wire tag
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Chart" => Some(ComponentType::Chart),
            "Timeline" => Some(ComponentType::Timeline),
            "KnowledgeGraph" => Some(ComponentType::KnowledgeGraph),
            "Map" => Some(ComponentType::Map),
            "Media" => Some(ComponentType::Media),
            "Document" => Some(ComponentType::Document),
            "Code" => Some(ComponentType::Code),
            "Artifact" => Some(ComponentType::Artifact),
            "Custom" => Some(ComponentType::Custom),
            _ => None,
        }
    }

    /// Get all component types
    pub fn all() -> &'static [ComponentType] {
        &[
            ComponentType::Chart,
            ComponentType::Timeline,
            ComponentType::KnowledgeGraph,
            ComponentType::Map,
            ComponentType::Media,
            ComponentType::Document,
            ComponentType::Code,
            ComponentType::Artifact,
            ComponentType::Custom,
        ]
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown component type \"{s}\""))
    }
}

/// A single component record as it travels on the wire.
///
/// `id` is unique within its surface only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2uiComponent {
    /// Component ID
    pub id: String,

    /// The renderer kind
    pub component: ComponentType,

    /// Every other field, verbatim
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl A2uiComponent {
    /// Create a component with no kind-specific fields
    pub fn new(id: impl Into<String>, component: ComponentType) -> Self {
        A2uiComponent {
            id: id.into(),
            component,
            fields: Map::new(),
        }
    }

    /// Add a field, builder style
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Get a raw field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The client-side renderer key of a `Custom` component
    pub fn renderer_key(&self) -> Option<&str> {
        match self.component {
            ComponentType::Custom => self.fields.get("rendererKey").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Typed, lenient reading of the kind-specific fields
    pub fn view(&self) -> ComponentView {
        let fields = Value::Object(self.fields.clone());
        match self.component {
            ComponentType::Chart => ComponentView::Chart(read_view(fields)),
            ComponentType::Timeline => ComponentView::Timeline(read_view(fields)),
            ComponentType::KnowledgeGraph => ComponentView::KnowledgeGraph(read_view(fields)),
            ComponentType::Map => ComponentView::Map(read_view(fields)),
            ComponentType::Media => ComponentView::Media(read_view(fields)),
            ComponentType::Document => ComponentView::Document(read_view(fields)),
            ComponentType::Code => ComponentView::Code(read_view(fields)),
            ComponentType::Artifact => ComponentView::Artifact(read_view(fields)),
            ComponentType::Custom => ComponentView::Custom(read_view(fields)),
        }
    }
}

fn read_view<T: serde::de::DeserializeOwned + Default>(fields: Value) -> T {
    serde_json::from_value(fields).unwrap_or_default()
}

/// Typed view of a component, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentView {
    Chart(ChartComponent),
    Timeline(TimelineComponent),
    KnowledgeGraph(KnowledgeGraphComponent),
    Map(MapComponent),
    Media(MediaComponent),
    Document(DocumentComponent),
    Code(CodeComponent),
    Artifact(ArtifactComponent),
    Custom(CustomComponent),
}

impl ComponentView {
    /// Data-model pointers this component reads from.
    pub fn data_pointers(&self) -> Vec<&str> {
        match self {
            ComponentView::Chart(c) => c.data.as_deref().into_iter().collect(),
            ComponentView::Timeline(c) => c.events.as_deref().into_iter().collect(),
            ComponentView::KnowledgeGraph(c) => {
                c.nodes.as_deref().into_iter().chain(c.edges.as_deref()).collect()
            }
            ComponentView::Map(c) => c.markers.as_deref().into_iter().collect(),
            ComponentView::Document(c) => c
                .content
                .as_deref()
                .filter(|content| content.starts_with('/'))
                .into_iter()
                .collect(),
            ComponentView::Media(_)
            | ComponentView::Code(_)
            | ComponentView::Artifact(_)
            | ComponentView::Custom(_) => Vec::new(),
        }
    }
}

/// Width/height as either pixels or a CSS length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(f64),
    Css(String),
}

// ============================================================================
// Chart
// ============================================================================

/// Chart kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Scatter,
    Pie,
    Area,
    Donut,
    Radar,
    Heatmap,
    #[serde(other)]
    Unknown,
}

/// Axis configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartAxis {
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<String>,
}

/// How a single series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Bar,
    Line,
    Area,
    #[serde(other)]
    Unknown,
}

/// One data series of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub name: String,
    pub data_key: String,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient")]
    pub series_type: Option<SeriesType>,
}

/// Chart component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub chart_type: Option<ChartType>,
    /// Pointer to the data array
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub x_axis: Option<ChartAxis>,
    #[serde(default, deserialize_with = "lenient")]
    pub y_axis: Option<ChartAxis>,
    #[serde(default, deserialize_with = "lenient")]
    pub colors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub series: Option<Vec<ChartSeries>>,
    #[serde(default, rename = "threeD", deserialize_with = "lenient")]
    pub three_d: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_legend: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_grid: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Dimension>,
}

// ============================================================================
// Timeline
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineOrientation {
    Horizontal,
    #[default]
    Vertical,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineLayout {
    #[default]
    Default,
    Alternating,
    Grouped,
    #[serde(other)]
    Unknown,
}

/// Timeline component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineComponent {
    /// Pointer to the events array
    #[serde(default, deserialize_with = "lenient")]
    pub events: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub orientation: Option<TimelineOrientation>,
    #[serde(default, deserialize_with = "lenient")]
    pub layout: Option<TimelineLayout>,
    #[serde(default, deserialize_with = "lenient")]
    pub group_by: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub zoomable: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_dates: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_descriptions: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub compact: Option<bool>,
}

/// A record in the array a timeline's `events` pointer addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

// ============================================================================
// Knowledge graph
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphLayout {
    #[default]
    Force,
    Radial,
    Hierarchical,
    #[serde(other)]
    Unknown,
}

/// Knowledge graph component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraphComponent {
    /// Pointer to the nodes array
    #[serde(default, deserialize_with = "lenient")]
    pub nodes: Option<String>,
    /// Pointer to the edges array
    #[serde(default, deserialize_with = "lenient")]
    pub edges: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub layout: Option<GraphLayout>,
    #[serde(default, rename = "threeD", deserialize_with = "lenient")]
    pub three_d: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub directed: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_labels: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphEdge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directed: Option<bool>,
}

// ============================================================================
// Map
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlyTo {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseLayer {
    Satellite,
    Terrain,
    #[default]
    Streets,
    Dark,
    #[serde(other)]
    Unknown,
}

/// Map component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub center: Option<LatLng>,
    #[serde(default, deserialize_with = "lenient")]
    pub zoom: Option<f64>,
    /// Pointer to the markers array
    #[serde(default, deserialize_with = "lenient")]
    pub markers: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub base_layer: Option<BaseLayer>,
    #[serde(default, deserialize_with = "lenient")]
    pub fly_to: Option<FlyTo>,
    #[serde(default, deserialize_with = "lenient")]
    pub terrain: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

// ============================================================================
// Media, Document, Code, Artifact, Custom
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaFit {
    #[default]
    Contain,
    Cover,
    Fill,
    None,
    ScaleDown,
    #[serde(other)]
    Unknown,
}

/// Media component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub media_type: Option<MediaType>,
    #[serde(default, deserialize_with = "lenient")]
    pub src: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub controls: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub autoplay: Option<bool>,
    #[serde(default, rename = "loop", deserialize_with = "lenient")]
    pub looping: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub muted: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub fit: Option<MediaFit>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Dimension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Markdown,
    Html,
    #[serde(other)]
    Unknown,
}

/// Document component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentComponent {
    /// Markdown/HTML text, or a pointer to it
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<DocumentFormat>,
    #[serde(default, deserialize_with = "lenient")]
    pub toc: Option<bool>,
}

/// Code component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub highlight_lines: Option<Vec<u32>>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_line_numbers: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub show_copy_button: Option<bool>,
}

/// Artifact component: sandboxed HTML/CSS/JS
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub html: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub css: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub js: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sandbox_permissions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<Dimension>,
}

/// Custom component
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomComponent {
    #[serde(default, deserialize_with = "lenient")]
    pub renderer_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub props: Option<Map<String, Value>>,
}
