//! Value types describing parsed CVAT annotations.
//!
//! [`Element`] and [`AnnotationPath`] are created once by the parsing layer
//! and are immutable afterwards; the layout algorithms only ever read them.

use serde::{Deserialize, Serialize};

use crate::geometry::{bbox_enclosing_rotated_rect, BoundingBox, Point};

/// The kind of document element an annotated region represents.
///
/// A closed set: promotion and export behavior dispatch on the tag through
/// predicate methods rather than trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocItemLabel {
    Caption,
    Checkbox,
    Code,
    DocumentIndex,
    Footnote,
    Form,
    Formula,
    KeyValueRegion,
    ListItem,
    PageFooter,
    PageHeader,
    Picture,
    SectionHeader,
    Table,
    Text,
    Title,
}

impl DocItemLabel {
    /// Whether this element is a table for cross-boundary promotion purposes.
    pub fn is_table(&self) -> bool {
        matches!(self, DocItemLabel::Table)
    }

    /// Parse a CVAT box label string into a label, if it is a known kind.
    pub fn from_cvat_label(label: &str) -> Option<Self> {
        let label = match label.to_ascii_lowercase().as_str() {
            "caption" => DocItemLabel::Caption,
            "checkbox" => DocItemLabel::Checkbox,
            "code" => DocItemLabel::Code,
            "document_index" => DocItemLabel::DocumentIndex,
            "footnote" => DocItemLabel::Footnote,
            "form" => DocItemLabel::Form,
            "formula" => DocItemLabel::Formula,
            "key_value_region" => DocItemLabel::KeyValueRegion,
            "list_item" => DocItemLabel::ListItem,
            "page_footer" => DocItemLabel::PageFooter,
            "page_header" => DocItemLabel::PageHeader,
            "picture" => DocItemLabel::Picture,
            "section_header" => DocItemLabel::SectionHeader,
            "table" => DocItemLabel::Table,
            "text" => DocItemLabel::Text,
            "title" => DocItemLabel::Title,
            _ => return None,
        };
        Some(label)
    }
}

/// Which layer of the page an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentLayer {
    /// Main body content, included in the reading order.
    Body,
    /// Page furniture such as headers and footers.
    Furniture,
    /// Background regions.
    Background,
}

impl ContentLayer {
    /// Parse a CVAT `content_layer` attribute value; unknown values
    /// default to [`ContentLayer::Body`].
    pub fn from_cvat_attribute(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "FURNITURE" => ContentLayer::Furniture,
            "BACKGROUND" => ContentLayer::Background,
            _ => ContentLayer::Body,
        }
    }
}

/// A single annotated page region.
///
/// When the region was drawn with a non-zero rotation, `bbox` holds the
/// axis-aligned box enclosing the rotated rectangle and `bbox_unrotated`
/// holds the box as originally drawn. For unrotated regions both the
/// rotation and the unrotated box are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique element id within the page.
    pub id: u32,
    /// Document-element kind.
    pub label: DocItemLabel,
    /// Axis-aligned bounding box in page coordinates.
    pub bbox: BoundingBox,
    /// Content-layer classification.
    pub content_layer: ContentLayer,
    /// Rotation applied to the drawn box, in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_deg: Option<f64>,
    /// The box as originally drawn, before enclosing-box conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_unrotated: Option<BoundingBox>,
}

impl Element {
    /// Create an unrotated element.
    pub fn new(id: u32, label: DocItemLabel, bbox: BoundingBox, content_layer: ContentLayer) -> Self {
        Self {
            id,
            label,
            bbox,
            content_layer,
            rotation_deg: None,
            bbox_unrotated: None,
        }
    }

    /// Create an element from a drawn box and rotation.
    ///
    /// For a non-zero rotation the stored `bbox` becomes the axis-aligned
    /// enclosing box of the rotated rectangle and the drawn box is kept in
    /// `bbox_unrotated`. A zero rotation behaves exactly like
    /// [`Element::new`].
    pub fn from_drawn_box(
        id: u32,
        label: DocItemLabel,
        drawn: BoundingBox,
        rotation_deg: f64,
        content_layer: ContentLayer,
    ) -> Self {
        if rotation_deg == 0.0 {
            return Self::new(id, label, drawn, content_layer);
        }
        Self {
            id,
            label,
            bbox: bbox_enclosing_rotated_rect(&drawn, rotation_deg),
            content_layer,
            rotation_deg: Some(rotation_deg),
            bbox_unrotated: Some(drawn),
        }
    }
}

/// An ordering directive drawn over the page as a polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPath {
    /// Unique path id within the page.
    pub id: u32,
    /// Semantic kind of the path, e.g. `"reading_order"`.
    pub label: String,
    /// Ordered polyline vertices; always at least two.
    pub points: Vec<Point>,
    /// Nesting depth: 1 is the outermost page-level path, higher levels
    /// are scoped to a container such as a table.
    pub level: u32,
}

impl AnnotationPath {
    /// Create a path at the outermost level.
    pub fn new(id: u32, label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id,
            label: label.into(),
            points,
            level: 1,
        }
    }

    /// Create a path at an explicit nesting level.
    pub fn with_level(id: u32, label: impl Into<String>, points: Vec<Point>, level: u32) -> Self {
        Self {
            id,
            label: label.into(),
            points,
            level,
        }
    }
}
