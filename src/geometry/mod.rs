//! Geometric primitives for annotation layout analysis.
//!
//! This module provides the basic geometric types shared across the crate
//! and the rotated-rectangle enclosing-box routine used when CVAT boxes
//! carry a non-zero rotation.

use serde::{Deserialize, Serialize};

/// A 2D point in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use cvat_layout::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Coordinate-origin convention for a bounding box.
///
/// CVAT annotation files use a top-left origin with y increasing downward;
/// `BottomLeft` is carried for consumers that work in PDF-style coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoordOrigin {
    /// Origin at the top-left corner, y grows downward.
    TopLeft,
    /// Origin at the bottom-left corner, y grows upward.
    BottomLeft,
}

/// An axis-aligned rectangle in page coordinates.
///
/// Stored as left/top/right/bottom edges plus the origin convention the
/// edges are expressed in. With [`CoordOrigin::TopLeft`], `t <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub l: f64,
    /// Top edge y-coordinate
    pub t: f64,
    /// Right edge x-coordinate
    pub r: f64,
    /// Bottom edge y-coordinate
    pub b: f64,
    /// Origin convention of the coordinates
    pub coord_origin: CoordOrigin,
}

impl BoundingBox {
    /// Create a new bounding box with a top-left origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use cvat_layout::geometry::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(bbox.width(), 100.0);
    /// assert_eq!(bbox.height(), 50.0);
    /// ```
    pub fn new(l: f64, t: f64, r: f64, b: f64) -> Self {
        Self {
            l,
            t,
            r,
            b,
            coord_origin: CoordOrigin::TopLeft,
        }
    }

    /// Get the width of the box.
    pub fn width(&self) -> f64 {
        self.r - self.l
    }

    /// Get the height of the box.
    pub fn height(&self) -> f64 {
        (self.b - self.t).abs()
    }

    /// Compute the area of the box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Get the center point of the box.
    ///
    /// # Examples
    ///
    /// ```
    /// use cvat_layout::geometry::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(30.0, 10.0, 70.0, 90.0);
    /// let center = bbox.center();
    /// assert_eq!(center.x, 50.0);
    /// assert_eq!(center.y, 50.0);
    /// ```
    pub fn center(&self) -> Point {
        Point {
            x: (self.l + self.r) / 2.0,
            y: (self.t + self.b) / 2.0,
        }
    }

    /// Check if this box contains a point (boundary inclusive).
    ///
    /// # Examples
    ///
    /// ```
    /// use cvat_layout::geometry::{BoundingBox, Point};
    ///
    /// let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
    /// assert!(bbox.contains_point(&Point::new(50.0, 50.0)));
    /// assert!(!bbox.contains_point(&Point::new(150.0, 50.0)));
    /// ```
    pub fn contains_point(&self, p: &Point) -> bool {
        let (top, bottom) = (self.t.min(self.b), self.t.max(self.b));
        p.x >= self.l && p.x <= self.r && p.y >= top && p.y <= bottom
    }

    /// Check if this box fully contains another box, within `eps` of slack
    /// on each edge.
    ///
    /// Annotation boxes are drawn by hand, so containment checks need a
    /// small tolerance to absorb near-coincident edges.
    pub fn contains_bbox(&self, other: &BoundingBox, eps: f64) -> bool {
        self.l - eps <= other.l
            && self.r + eps >= other.r
            && self.t - eps <= other.t
            && self.b + eps >= other.b
    }

    /// Return this box expanded by `margin` on every side.
    ///
    /// A negative margin shrinks the box.
    pub fn expanded(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            l: self.l - margin,
            t: self.t - margin,
            r: self.r + margin,
            b: self.b + margin,
            coord_origin: self.coord_origin,
        }
    }
}

/// Compute the minimal axis-aligned box enclosing `bbox` after rotating it
/// by `rotation_deg` about its center.
///
/// Positive angles rotate clockwise in a top-left-origin page (the CVAT
/// convention). The result preserves the input's coordinate origin.
///
/// For any multiple of 360 degrees the input is returned unchanged, with
/// no floating-point drift. For 90 degrees the extents swap about the
/// center.
///
/// # Examples
///
/// ```
/// use cvat_layout::geometry::{bbox_enclosing_rotated_rect, BoundingBox};
///
/// let bbox = BoundingBox::new(30.0, 10.0, 70.0, 90.0);
/// let rotated = bbox_enclosing_rotated_rect(&bbox, 90.0);
/// assert!((rotated.l - 10.0).abs() < 1e-9);
/// assert!((rotated.t - 30.0).abs() < 1e-9);
/// assert!((rotated.r - 90.0).abs() < 1e-9);
/// assert!((rotated.b - 70.0).abs() < 1e-9);
/// ```
pub fn bbox_enclosing_rotated_rect(bbox: &BoundingBox, rotation_deg: f64) -> BoundingBox {
    if rotation_deg.rem_euclid(360.0) == 0.0 {
        return *bbox;
    }

    let center = bbox.center();
    let theta = rotation_deg.to_radians();
    let (sin, cos) = theta.sin_cos();

    let corners = [
        Point::new(bbox.l, bbox.t),
        Point::new(bbox.r, bbox.t),
        Point::new(bbox.r, bbox.b),
        Point::new(bbox.l, bbox.b),
    ];

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for corner in &corners {
        let dx = corner.x - center.x;
        let dy = corner.y - center.y;
        let x = center.x + dx * cos - dy * sin;
        let y = center.y + dx * sin + dy * cos;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    BoundingBox {
        l: min_x,
        t: min_y,
        r: max_x,
        b: max_y,
        coord_origin: bbox.coord_origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(p.x, 10.0);
        assert_eq!(p.y, 20.0);
    }

    #[test]
    fn test_bbox_extents() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn test_bbox_center() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let center = bbox.center();
        assert_eq!(center.x, 50.0);
        assert_eq!(center.y, 25.0);
    }

    #[test]
    fn test_bbox_contains_point() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(bbox.contains_point(&Point::new(50.0, 50.0)));
        assert!(bbox.contains_point(&Point::new(0.0, 0.0)));
        assert!(bbox.contains_point(&Point::new(100.0, 100.0)));
        assert!(!bbox.contains_point(&Point::new(150.0, 150.0)));
        assert!(!bbox.contains_point(&Point::new(50.0, -10.0)));
    }

    #[test]
    fn test_bbox_contains_bbox() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let inner = BoundingBox::new(10.0, 10.0, 90.0, 40.0);
        let overlapping = BoundingBox::new(50.0, 50.0, 150.0, 150.0);

        assert!(outer.contains_bbox(&inner, 0.0));
        assert!(!inner.contains_bbox(&outer, 0.0));
        assert!(!outer.contains_bbox(&overlapping, 0.0));
    }

    #[test]
    fn test_bbox_contains_bbox_with_tolerance() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        // Leaks half a unit past the right edge, as hand-drawn boxes do.
        let nearly_inside = BoundingBox::new(10.0, 10.0, 100.5, 40.0);

        assert!(!outer.contains_bbox(&nearly_inside, 0.0));
        assert!(outer.contains_bbox(&nearly_inside, 1.0));
    }

    #[test]
    fn test_bbox_expanded() {
        let bbox = BoundingBox::new(10.0, 10.0, 90.0, 90.0);
        let grown = bbox.expanded(5.0);
        assert_eq!(grown.l, 5.0);
        assert_eq!(grown.t, 5.0);
        assert_eq!(grown.r, 95.0);
        assert_eq!(grown.b, 95.0);

        let shrunk = bbox.expanded(-5.0);
        assert_eq!(shrunk.l, 15.0);
        assert_eq!(shrunk.r, 85.0);
    }

    #[test]
    fn test_rotation_zero_is_exact_identity() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox_enclosing_rotated_rect(&bbox, 0.0), bbox);
        assert_eq!(bbox_enclosing_rotated_rect(&bbox, 360.0), bbox);
        assert_eq!(bbox_enclosing_rotated_rect(&bbox, -720.0), bbox);
    }

    #[test]
    fn test_rotation_90_swaps_extents() {
        // Center is (50, 50). Width 40, height 80 -> rotated AABB 80 x 40.
        let bbox = BoundingBox::new(30.0, 10.0, 70.0, 90.0);
        let rotated = bbox_enclosing_rotated_rect(&bbox, 90.0);

        assert_eq!(rotated.coord_origin, CoordOrigin::TopLeft);
        assert!((rotated.l - 10.0).abs() < 1e-9);
        assert!((rotated.t - 30.0).abs() < 1e-9);
        assert!((rotated.r - 90.0).abs() < 1e-9);
        assert!((rotated.b - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_negative_90_matches_positive() {
        // The enclosing box is symmetric in the rotation direction.
        let bbox = BoundingBox::new(30.0, 10.0, 70.0, 90.0);
        let cw = bbox_enclosing_rotated_rect(&bbox, 90.0);
        let ccw = bbox_enclosing_rotated_rect(&bbox, -90.0);

        assert!((cw.l - ccw.l).abs() < 1e-9);
        assert!((cw.t - ccw.t).abs() < 1e-9);
        assert!((cw.r - ccw.r).abs() < 1e-9);
        assert!((cw.b - ccw.b).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_45_grows_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let rotated = bbox_enclosing_rotated_rect(&bbox, 45.0);

        // A square rotated 45 degrees needs a box sqrt(2) times as wide.
        let expected = 10.0 * std::f64::consts::SQRT_2;
        assert!((rotated.width() - expected).abs() < 1e-9);
        assert!((rotated.height() - expected).abs() < 1e-9);

        // Center must not move.
        let center = rotated.center();
        assert!((center.x - 5.0).abs() < 1e-9);
        assert!((center.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_of_degenerate_box_is_defined() {
        // Zero-area boxes must not produce NaN.
        let bbox = BoundingBox::new(50.0, 50.0, 50.0, 50.0);
        let rotated = bbox_enclosing_rotated_rect(&bbox, 33.0);
        assert!((rotated.l - 50.0).abs() < 1e-9);
        assert!((rotated.area() - 0.0).abs() < 1e-9);
    }
}
