//! # CVAT Layout
//!
//! Convert manually-drawn CVAT page annotations into a single linear
//! reading order of document elements, preserving the spatial containment
//! hierarchy and handling rotated bounding regions.
//!
//! ## Core Features
//!
//! - **Rotated-box geometry**: axis-aligned enclosing box of a rotated
//!   rectangle, so downstream consumers only ever see axis-aligned boxes
//! - **Containment tree**: forest over elements by bbox containment, with
//!   deterministic tie-breaks for hand-drawn annotation noise
//! - **Multi-level conflict resolution**: an outer ordering path defers to
//!   a nested path's container as a single subsumed unit
//! - **Table cross-boundary promotion**: a path that dips into a table to
//!   sequence a cell registers the table itself at the point of entry
//! - **Global order assembly**: one deterministic total order per page
//! - **CVAT XML parsing**: boxes, polylines, content layers, rotation
//!
//! ## Quick Start
//!
//! ```
//! use cvat_layout::geometry::{BoundingBox, Point};
//! use cvat_layout::models::{AnnotationPath, ContentLayer, DocItemLabel, Element};
//! use cvat_layout::path_mappings::{resolve_page_reading_order, PathMappings};
//! use indexmap::IndexMap;
//!
//! let table = Element::new(1, DocItemLabel::Table,
//!     BoundingBox::new(0.0, 0.0, 100.0, 100.0), ContentLayer::Body);
//! let cell = Element::new(2, DocItemLabel::ListItem,
//!     BoundingBox::new(10.0, 10.0, 90.0, 40.0), ContentLayer::Body);
//!
//! // A reading-order path entering the table from above to sequence the cell.
//! let path = AnnotationPath::new(10, "reading_order",
//!     vec![Point::new(50.0, -10.0), Point::new(50.0, 50.0)]);
//!
//! let mut mappings = PathMappings::default();
//! mappings.reading_order.insert(10, vec![2]);
//!
//! let (order, mappings) = resolve_page_reading_order(
//!     &[table, cell], &[path], mappings, &IndexMap::new(), 0.0);
//!
//! // The table is promoted into the order at the point of entry.
//! assert_eq!(order, vec![1, 2]);
//! assert_eq!(mappings.reading_order[&10], vec![1, 2]);
//! ```
//!
//! All operations are synchronous and deterministic; independent pages can
//! be resolved in parallel with no shared state.

pub mod error;
pub mod geometry;
pub mod models;
pub mod parser;
pub mod path_mappings;
pub mod tree;

pub use error::{Error, Result};
pub use geometry::{bbox_enclosing_rotated_rect, BoundingBox, CoordOrigin, Point};
pub use models::{AnnotationPath, ContentLayer, DocItemLabel, Element};
pub use parser::{parse_cvat_file, parse_cvat_str, AnnotatedImage, ParsedAnnotations};
pub use path_mappings::{
    promote_table_cross_boundary_reading_order, resolve_page_reading_order,
    resolve_reading_order_conflicts, PathMappings,
};
pub use tree::{build_containment_forest, build_global_reading_order, TreeNode};
