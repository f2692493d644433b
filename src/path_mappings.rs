//! Path-to-element relation mappings and reading-order resolution passes.
//!
//! [`PathMappings`] bundles every relation an annotated page carries. Only
//! `reading_order` is touched by the passes in this module: conflict
//! resolution between ordering paths at different nesting levels, and
//! promotion of tables that a path crosses into without listing them.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::models::{AnnotationPath, Element};
use crate::tree::{
    build_containment_forest, build_global_reading_order, element_ancestors, TreeNode,
};

/// Relation mappings extracted from a page's annotation paths.
///
/// `reading_order` maps a path id to the ordered element ids the path
/// threads through. The remaining mappings (merge, group, caption,
/// footnote, key-value) are carried through untouched for downstream
/// consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMappings {
    /// Path id -> ordered element ids (the primary ordering relation).
    pub reading_order: IndexMap<u32, Vec<u32>>,
    /// Path id -> element ids to merge into one item.
    pub merge: IndexMap<u32, Vec<u32>>,
    /// Path id -> element ids forming a group.
    pub group: IndexMap<u32, Vec<u32>>,
    /// Path id -> [target, caption] element ids.
    pub to_caption: IndexMap<u32, Vec<u32>>,
    /// Path id -> [target, footnote] element ids.
    pub to_footnote: IndexMap<u32, Vec<u32>>,
    /// Path id -> [key, value] element ids.
    pub to_value: IndexMap<u32, Vec<u32>>,
}

/// Whether `ancestor` strictly contains `id`, judged from the flat element
/// list's containment chains.
fn is_element_ancestor(elements: &[Element], ancestor: u32, id: u32) -> bool {
    element_ancestors(elements, id).contains(&ancestor)
}

/// Resolve ordering conflicts between level-1 paths and nested paths.
///
/// A level-1 path may loosely list elements that a nested path orders
/// authoritatively inside their container. Each such element is replaced,
/// at its original index, by the container that represents the nested
/// sub-order as a whole; every other member of that sub-order is dropped
/// from the level-1 list so the container appears exactly once.
///
/// The chosen container is the outermost ancestor of the element that does
/// not also swallow level-1 entries unrelated to any nested sub-order.
/// An element with no containing ancestor is left in place (the outer
/// path's original order wins when no subsumption is possible).
///
/// Returns an updated mapping; the input is not modified.
pub fn resolve_reading_order_conflicts(
    reading_order: &IndexMap<u32, Vec<u32>>,
    paths: &[AnnotationPath],
    elements: &[Element],
) -> IndexMap<u32, Vec<u32>> {
    let level_of = |path_id: u32| -> u32 {
        paths
            .iter()
            .find(|p| p.id == path_id)
            .map(|p| p.level)
            .unwrap_or(1)
    };

    // Elements claimed by a nested (level > 1) path.
    let nested_elements: HashSet<u32> = reading_order
        .iter()
        .filter(|(path_id, _)| level_of(**path_id) > 1)
        .flat_map(|(_, ids)| ids.iter().copied())
        .collect();

    let mut updated = IndexMap::new();

    for (&path_id, list) in reading_order {
        if level_of(path_id) > 1 {
            updated.insert(path_id, list.clone());
            continue;
        }

        let mut new_list: Vec<u32> = Vec::new();
        let mut subsumed: HashSet<u32> = HashSet::new();

        for &id in list {
            if subsumed.contains(&id) {
                continue;
            }
            if !nested_elements.contains(&id) {
                new_list.push(id);
                continue;
            }

            let chain = element_ancestors(elements, id);
            // Outermost first, but never an ancestor that also contains
            // level-1 entries outside the nested sub-order.
            let container = chain
                .iter()
                .rev()
                .find(|&&anc| {
                    list.iter().all(|&other| {
                        other == id
                            || nested_elements.contains(&other)
                            || !is_element_ancestor(elements, anc, other)
                    })
                })
                .or_else(|| chain.first())
                .copied();

            match container {
                Some(container) => {
                    log::debug!(
                        "path {}: element {} deferred to container {}",
                        path_id,
                        id,
                        container
                    );
                    if !new_list.contains(&container) {
                        new_list.push(container);
                    }
                    for &other in list {
                        if other == container
                            || is_element_ancestor(elements, container, other)
                        {
                            subsumed.insert(other);
                        }
                    }
                }
                None => new_list.push(id),
            }
        }

        updated.insert(path_id, new_list);
    }

    updated
}

/// Whether every vertex of `path` lies inside `bbox` grown by `tolerance`.
fn path_fully_inside(path: &AnnotationPath, bbox: &BoundingBox, tolerance: f64) -> bool {
    let lenient = bbox.expanded(tolerance);
    path.points.iter().all(|p| lenient.contains_point(p))
}

/// Collect every table node in the forest, in pre-order.
fn table_nodes(tree_roots: &[TreeNode]) -> Vec<&TreeNode> {
    fn walk<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
        if node.element.label.is_table() {
            out.push(node);
        }
        for child in &node.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for root in tree_roots {
        walk(root, &mut out);
    }
    out
}

/// Register tables that a reading-order path crosses into without listing.
///
/// A path drawn into a table to sequence a cell implies the table's own
/// position in the order. For every table whose descendants a path lists:
/// if the path's polyline stays fully inside the table's bbox (grown by
/// `tolerance`) nothing happens; if it crosses the boundary, the table id
/// is inserted immediately before its first listed descendant. Tables
/// already present in the list are never duplicated, so the pass is
/// idempotent.
///
/// Mutates `mappings.reading_order` in place.
pub fn promote_table_cross_boundary_reading_order(
    mappings: &mut PathMappings,
    paths: &[AnnotationPath],
    tree_roots: &[TreeNode],
    tolerance: f64,
) {
    let tables = table_nodes(tree_roots);

    for path in paths {
        let Some(list) = mappings.reading_order.get_mut(&path.id) else {
            continue;
        };

        for table in &tables {
            let table_id = table.element.id;
            if list.contains(&table_id) {
                continue;
            }
            let descendants: HashSet<u32> = table.descendant_ids().into_iter().collect();
            let Some(pos) = list.iter().position(|id| descendants.contains(id)) else {
                continue;
            };
            if path_fully_inside(path, &table.element.bbox, tolerance) {
                log::debug!(
                    "path {} stays inside table {}; no promotion",
                    path.id,
                    table_id
                );
                continue;
            }
            log::debug!(
                "path {} crosses table {} boundary; promoting before element {}",
                path.id,
                table_id,
                list[pos]
            );
            list.insert(pos, table_id);
        }
    }
}

/// Run the full per-page resolution pipeline.
///
/// Builds the containment forest, resolves multi-level ordering conflicts,
/// promotes boundary-crossing tables, and assembles the global order. The
/// returned mapping carries the updated `reading_order` alongside the
/// untouched pass-through relations.
pub fn resolve_page_reading_order(
    elements: &[Element],
    paths: &[AnnotationPath],
    mappings: PathMappings,
    path_to_container: &IndexMap<u32, u32>,
    tolerance: f64,
) -> (Vec<u32>, PathMappings) {
    let tree_roots = build_containment_forest(elements);

    let mut mappings = mappings;
    mappings.reading_order =
        resolve_reading_order_conflicts(&mappings.reading_order, paths, elements);
    promote_table_cross_boundary_reading_order(&mut mappings, paths, &tree_roots, tolerance);

    let order = build_global_reading_order(
        paths,
        &mappings.reading_order,
        path_to_container,
        &tree_roots,
    );
    (order, mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Point};
    use crate::models::{ContentLayer, DocItemLabel};

    fn elem(id: u32, label: DocItemLabel, l: f64, t: f64, r: f64, b: f64) -> Element {
        Element::new(id, label, BoundingBox::new(l, t, r, b), ContentLayer::Body)
    }

    fn table_with_cell() -> (Vec<TreeNode>, Vec<Element>) {
        let table = elem(1, DocItemLabel::Table, 0.0, 0.0, 100.0, 100.0);
        let cell = elem(2, DocItemLabel::ListItem, 10.0, 10.0, 90.0, 40.0);
        let elements = vec![table, cell];
        (build_containment_forest(&elements), elements)
    }

    #[test]
    fn test_promotion_inserts_table_before_descendant() {
        let (roots, _) = table_with_cell();
        let path = AnnotationPath::new(
            10,
            "reading_order",
            vec![Point::new(50.0, -10.0), Point::new(50.0, 50.0)],
        );

        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(10, vec![2]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path], &roots, 0.0);
        assert_eq!(mappings.reading_order[&10], vec![1, 2]);
    }

    #[test]
    fn test_promotion_skips_path_fully_inside() {
        let (roots, _) = table_with_cell();
        let path = AnnotationPath::new(
            11,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(80.0, 30.0)],
        );

        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(11, vec![2]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path], &roots, 0.0);
        assert_eq!(mappings.reading_order[&11], vec![2]);
    }

    #[test]
    fn test_promotion_tolerance_treats_near_boundary_as_inside() {
        let (roots, _) = table_with_cell();
        // Endpoint pokes 2 units above the table's top edge.
        let path = AnnotationPath::new(
            12,
            "reading_order",
            vec![Point::new(50.0, -2.0), Point::new(50.0, 50.0)],
        );

        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(12, vec![2]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path.clone()], &roots, 5.0);
        assert_eq!(mappings.reading_order[&12], vec![2]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path], &roots, 0.0);
        assert_eq!(mappings.reading_order[&12], vec![1, 2]);
    }

    #[test]
    fn test_promotion_is_idempotent() {
        let (roots, _) = table_with_cell();
        let path = AnnotationPath::new(
            10,
            "reading_order",
            vec![Point::new(50.0, -10.0), Point::new(50.0, 50.0)],
        );

        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(10, vec![2]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path.clone()], &roots, 0.0);
        promote_table_cross_boundary_reading_order(&mut mappings, &[path], &roots, 0.0);
        assert_eq!(mappings.reading_order[&10], vec![1, 2]);
    }

    #[test]
    fn test_promotion_ignores_paths_without_descendants() {
        let (roots, _) = table_with_cell();
        let path = AnnotationPath::new(
            13,
            "reading_order",
            vec![Point::new(50.0, -10.0), Point::new(50.0, 150.0)],
        );

        let mut mappings = PathMappings::default();
        // Lists an element unrelated to the table.
        mappings.reading_order.insert(13, vec![99]);

        promote_table_cross_boundary_reading_order(&mut mappings, &[path], &roots, 0.0);
        assert_eq!(mappings.reading_order[&13], vec![99]);
    }

    #[test]
    fn test_conflict_resolution_substitutes_container_at_index() {
        let table = elem(50, DocItemLabel::Table, 0.0, 0.0, 100.0, 100.0);
        let cell = elem(51, DocItemLabel::ListItem, 10.0, 10.0, 40.0, 40.0);
        let later = elem(52, DocItemLabel::Text, 0.0, 150.0, 100.0, 180.0);
        let elements = vec![table, cell, later];

        let level1 = AnnotationPath::new(
            100,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(20.0, 160.0)],
        );
        let level2 = AnnotationPath::with_level(
            101,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(30.0, 25.0)],
            2,
        );

        let mut reading_order = IndexMap::new();
        reading_order.insert(100, vec![51, 52]);
        reading_order.insert(101, vec![51]);

        let updated =
            resolve_reading_order_conflicts(&reading_order, &[level1, level2], &elements);

        assert_eq!(updated[&100], vec![50, 52]);
        assert!(!updated[&100].contains(&51));
        assert_eq!(updated[&101], vec![51]);
    }

    #[test]
    fn test_conflict_resolution_subsumes_whole_sub_order_once() {
        let table = elem(50, DocItemLabel::Table, 0.0, 0.0, 100.0, 100.0);
        let cell_a = elem(51, DocItemLabel::ListItem, 10.0, 10.0, 40.0, 40.0);
        let cell_b = elem(52, DocItemLabel::ListItem, 60.0, 10.0, 90.0, 40.0);
        let later = elem(53, DocItemLabel::Text, 0.0, 150.0, 100.0, 180.0);
        let elements = vec![table, cell_a, cell_b, later];

        let level1 = AnnotationPath::new(
            100,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(20.0, 160.0)],
        );
        let level2 = AnnotationPath::with_level(
            101,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(80.0, 20.0)],
            2,
        );

        let mut reading_order = IndexMap::new();
        reading_order.insert(100, vec![51, 52, 53]);
        reading_order.insert(101, vec![51, 52]);

        let updated =
            resolve_reading_order_conflicts(&reading_order, &[level1, level2], &elements);

        // Both cells collapse into one table entry at the first cell's index.
        assert_eq!(updated[&100], vec![50, 53]);
    }

    #[test]
    fn test_conflict_resolution_leaves_unrelated_paths_alone() {
        let a = elem(1, DocItemLabel::Text, 0.0, 0.0, 100.0, 40.0);
        let b = elem(2, DocItemLabel::Text, 0.0, 50.0, 100.0, 90.0);
        let elements = vec![a, b];

        let path = AnnotationPath::new(
            10,
            "reading_order",
            vec![Point::new(50.0, 20.0), Point::new(50.0, 70.0)],
        );

        let mut reading_order = IndexMap::new();
        reading_order.insert(10, vec![1, 2]);

        let updated = resolve_reading_order_conflicts(&reading_order, &[path], &elements);
        assert_eq!(updated[&10], vec![1, 2]);
    }

    #[test]
    fn test_conflict_resolution_keeps_rootless_element() {
        // The nested path claims an element that has no container at all;
        // the outer order must win unchanged.
        let orphan = elem(1, DocItemLabel::Text, 0.0, 0.0, 40.0, 40.0);
        let other = elem(2, DocItemLabel::Text, 0.0, 50.0, 40.0, 90.0);
        let elements = vec![orphan, other];

        let level1 = AnnotationPath::new(
            10,
            "reading_order",
            vec![Point::new(20.0, 20.0), Point::new(20.0, 70.0)],
        );
        let level2 = AnnotationPath::with_level(
            11,
            "reading_order",
            vec![Point::new(10.0, 10.0), Point::new(30.0, 30.0)],
            2,
        );

        let mut reading_order = IndexMap::new();
        reading_order.insert(10, vec![1, 2]);
        reading_order.insert(11, vec![1]);

        let updated =
            resolve_reading_order_conflicts(&reading_order, &[level1, level2], &elements);
        assert_eq!(updated[&10], vec![1, 2]);
    }

    #[test]
    fn test_resolve_page_reading_order_pipeline() {
        let table = elem(1, DocItemLabel::Table, 0.0, 0.0, 100.0, 100.0);
        let cell = elem(2, DocItemLabel::ListItem, 10.0, 10.0, 90.0, 40.0);
        let tail = elem(3, DocItemLabel::Text, 0.0, 150.0, 100.0, 180.0);
        let elements = vec![table, cell, tail];

        // Path dips into the table for the cell, then continues below it.
        let path = AnnotationPath::new(
            10,
            "reading_order",
            vec![Point::new(50.0, 20.0), Point::new(50.0, 160.0)],
        );

        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(10, vec![2, 3]);

        let (order, updated) =
            resolve_page_reading_order(&elements, &[path], mappings, &IndexMap::new(), 0.0);

        assert_eq!(updated.reading_order[&10], vec![1, 2, 3]);
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_mappings_serde_round_trip() {
        let mut mappings = PathMappings::default();
        mappings.reading_order.insert(10, vec![1, 2, 3]);
        mappings.to_caption.insert(11, vec![4, 5]);

        let json = serde_json::to_string(&mappings).unwrap();
        let back: PathMappings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mappings);
    }
}
