//! Spatial containment tree and global reading-order assembly.
//!
//! Elements on a page nest: a table contains its cells, a text region may
//! contain an inline heading. This module builds that containment forest
//! and merges the per-path orderings into one total order over the page.
//!
//! Each [`TreeNode`] exclusively owns its children, so the forest is built
//! once per resolution call and dropped afterwards with no shared mutable
//! state.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::models::{AnnotationPath, Element};

/// Tolerance, in page units, used when testing bbox containment. Hand-drawn
/// boxes routinely leak a fraction of a unit past their container's edge.
pub const CONTAINMENT_EPS: f64 = 0.5;

/// Area slack below which two boxes count as equally sized when picking the
/// tightest container.
const AREA_EPS: f64 = 1e-9;

/// A node in the containment forest, wrapping one element and owning the
/// nodes for the elements nested inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// The element at this node.
    pub element: Element,
    /// Children in spatial reading order (top-to-bottom, left-to-right).
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a leaf node for an element.
    pub fn new(element: Element) -> Self {
        Self {
            element,
            children: Vec::new(),
        }
    }

    /// Attach a child node.
    pub fn add_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    /// Find the node for `id` in this subtree.
    pub fn find(&self, id: u32) -> Option<&TreeNode> {
        if self.element.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Ids of all elements strictly below this node, in pre-order.
    pub fn descendant_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        for child in &self.children {
            ids.push(child.element.id);
            ids.extend(child.descendant_ids());
        }
        ids
    }
}

/// Spatial ordering used for siblings with no explicit path coverage:
/// top edge first, then left edge, then element id as the final tie-break.
fn spatial_order(a: &Element, b: &Element) -> Ordering {
    a.bbox
        .t
        .partial_cmp(&b.bbox.t)
        .unwrap_or(Ordering::Equal)
        .then(a.bbox.l.partial_cmp(&b.bbox.l).unwrap_or(Ordering::Equal))
        .then(a.id.cmp(&b.id))
}

/// Whether element `container` may act as a containment parent of `inner`.
///
/// Containment is checked with [`CONTAINMENT_EPS`] of slack. Boxes of
/// (near-)equal area could contain each other, so the lower id wins there
/// to keep the relation acyclic.
fn is_valid_container(container: &Element, inner: &Element) -> bool {
    if container.id == inner.id {
        return false;
    }
    if !container.bbox.contains_bbox(&inner.bbox, CONTAINMENT_EPS) {
        return false;
    }
    let area_diff = container.bbox.area() - inner.bbox.area();
    area_diff > AREA_EPS || (area_diff.abs() <= AREA_EPS && container.id < inner.id)
}

/// Index of the tightest containing element of `elements[i]`, if any.
///
/// The smallest-area container wins; area ties break toward the lower id.
fn tightest_container_index(elements: &[Element], i: usize) -> Option<usize> {
    let inner = &elements[i];
    elements
        .iter()
        .enumerate()
        .filter(|(j, c)| *j != i && is_valid_container(c, inner))
        .min_by(|(_, a), (_, b)| {
            a.bbox
                .area()
                .partial_cmp(&b.bbox.area())
                .unwrap_or(Ordering::Equal)
                .then(a.id.cmp(&b.id))
        })
        .map(|(j, _)| j)
}

/// Ancestor ids of element `id`, tightest container first, computed from
/// the flat element list.
pub fn element_ancestors(elements: &[Element], id: u32) -> Vec<u32> {
    let mut chain = Vec::new();
    let Some(mut idx) = elements.iter().position(|e| e.id == id) else {
        return chain;
    };
    while let Some(parent) = tightest_container_index(elements, idx) {
        chain.push(elements[parent].id);
        idx = parent;
    }
    chain
}

/// Build the containment forest over a page's elements.
///
/// Every element becomes a child of its tightest containing element, or a
/// root when nothing contains it. Overlapping-but-not-nested boxes are not
/// linked. Siblings and roots are sorted by [`spatial_order`].
///
/// # Examples
///
/// ```
/// use cvat_layout::geometry::BoundingBox;
/// use cvat_layout::models::{ContentLayer, DocItemLabel, Element};
/// use cvat_layout::tree::build_containment_forest;
///
/// let table = Element::new(1, DocItemLabel::Table,
///     BoundingBox::new(0.0, 0.0, 100.0, 100.0), ContentLayer::Body);
/// let cell = Element::new(2, DocItemLabel::Text,
///     BoundingBox::new(10.0, 10.0, 90.0, 40.0), ContentLayer::Body);
///
/// let roots = build_containment_forest(&[table, cell]);
/// assert_eq!(roots.len(), 1);
/// assert_eq!(roots[0].element.id, 1);
/// assert_eq!(roots[0].children[0].element.id, 2);
/// ```
pub fn build_containment_forest(elements: &[Element]) -> Vec<TreeNode> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); elements.len()];
    let mut roots: Vec<usize> = Vec::new();

    for i in 0..elements.len() {
        match tightest_container_index(elements, i) {
            Some(parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    fn assemble(idx: usize, elements: &[Element], children: &[Vec<usize>]) -> TreeNode {
        let mut node = TreeNode::new(elements[idx].clone());
        let mut kids = children[idx].clone();
        kids.sort_by(|&a, &b| spatial_order(&elements[a], &elements[b]));
        for kid in kids {
            node.add_child(assemble(kid, elements, children));
        }
        node
    }

    roots.sort_by(|&a, &b| spatial_order(&elements[a], &elements[b]));
    roots
        .into_iter()
        .map(|idx| assemble(idx, elements, &children))
        .collect()
}

/// Map from element id to its parent's element id across the forest.
pub fn parent_map(tree_roots: &[TreeNode]) -> HashMap<u32, u32> {
    fn walk(node: &TreeNode, parents: &mut HashMap<u32, u32>) {
        for child in &node.children {
            parents.insert(child.element.id, node.element.id);
            walk(child, parents);
        }
    }
    let mut parents = HashMap::new();
    for root in tree_roots {
        walk(root, &mut parents);
    }
    parents
}

/// Whether `ancestor` lies on `id`'s parent chain.
fn is_ancestor_of(parents: &HashMap<u32, u32>, ancestor: u32, id: u32) -> bool {
    let mut cur = parents.get(&id);
    while let Some(&p) = cur {
        if p == ancestor {
            return true;
        }
        cur = parents.get(&p);
    }
    false
}

/// Tightest element containing every id in `ids`, if one exists.
fn nearest_common_container(parents: &HashMap<u32, u32>, ids: &[u32]) -> Option<u32> {
    let first = *ids.first()?;
    let mut cur = parents.get(&first);
    while let Some(&candidate) = cur {
        if ids
            .iter()
            .all(|&id| id == candidate || is_ancestor_of(parents, candidate, id))
        {
            return Some(candidate);
        }
        cur = parents.get(&candidate);
    }
    None
}

/// Index just past the last emitted member of `container`'s subtree.
fn subtree_end(out: &[u32], parents: &HashMap<u32, u32>, container: u32) -> usize {
    out.iter()
        .rposition(|&id| id == container || is_ancestor_of(parents, container, id))
        .map(|i| i + 1)
        .unwrap_or(out.len())
}

/// Pre-order element ids of the whole forest.
fn preorder_ids(tree_roots: &[TreeNode]) -> Vec<u32> {
    let mut ids = Vec::new();
    for root in tree_roots {
        ids.push(root.element.id);
        ids.extend(root.descendant_ids());
    }
    ids
}

/// Emit an element, then expand any nested paths scoped to it.
fn emit(
    id: u32,
    out: &mut Vec<u32>,
    emitted: &mut HashSet<u32>,
    container_to_paths: &HashMap<u32, Vec<u32>>,
    path_to_elements: &IndexMap<u32, Vec<u32>>,
) {
    if !emitted.insert(id) {
        return;
    }
    out.push(id);
    if let Some(path_ids) = container_to_paths.get(&id) {
        for path_id in path_ids {
            if let Some(ids) = path_to_elements.get(path_id) {
                for &nested in ids {
                    emit(nested, out, emitted, container_to_paths, path_to_elements);
                }
            }
        }
    }
}

/// Merge per-path orderings into one total order over the page's elements.
///
/// The contract, in priority order:
///
/// 1. Elements listed by a level-1 path keep that path's relative order.
/// 2. A container scoped by a nested path is expanded in place: the nested
///    path's elements follow the container the moment it is emitted.
/// 3. A containment ancestor absent from every path is bracketed between
///    the listed element it contains and the first following listed element
///    it does not contain.
/// 4. Elements with no path coverage are inserted right after the emitted
///    subtree of their nearest emitted ancestor, in spatial order, and
///    appended at the end otherwise.
///
/// The output is fully deterministic: paths are processed by (level, id)
/// and every fallback tie-break is documented on [`build_containment_forest`].
///
/// # Arguments
///
/// * `paths` - All annotation paths for the page
/// * `path_to_elements` - Ordered element ids each path threads through
/// * `path_to_container` - Optional container element scoping a nested path
/// * `tree_roots` - The containment forest from [`build_containment_forest`]
pub fn build_global_reading_order(
    paths: &[AnnotationPath],
    path_to_elements: &IndexMap<u32, Vec<u32>>,
    path_to_container: &IndexMap<u32, u32>,
    tree_roots: &[TreeNode],
) -> Vec<u32> {
    let parents = parent_map(tree_roots);
    let in_any_path: HashSet<u32> = path_to_elements.values().flatten().copied().collect();

    let mut sorted_paths: Vec<&AnnotationPath> = paths.iter().collect();
    sorted_paths.sort_by_key(|p| (p.level, p.id));

    // Resolve each nested path to the container it orders, falling back to
    // the tightest common container of its elements.
    let mut container_to_paths: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut nested_containers: HashMap<u32, Option<u32>> = HashMap::new();
    for path in sorted_paths.iter().filter(|p| p.level > 1) {
        let container = path_to_container.get(&path.id).copied().or_else(|| {
            path_to_elements
                .get(&path.id)
                .and_then(|ids| nearest_common_container(&parents, ids))
        });
        nested_containers.insert(path.id, container);
        if let Some(container) = container {
            container_to_paths
                .entry(container)
                .or_default()
                .push(path.id);
        }
    }

    let level1_seq: Vec<u32> = sorted_paths
        .iter()
        .filter(|p| p.level == 1)
        .filter_map(|p| path_to_elements.get(&p.id))
        .flatten()
        .copied()
        .collect();

    let mut out: Vec<u32> = Vec::new();
    let mut emitted: HashSet<u32> = HashSet::new();
    let mut last_explicit: Option<u32> = None;

    for (idx, &id) in level1_seq.iter().enumerate() {
        if emitted.contains(&id) {
            continue;
        }

        // Un-pathed containers of this element that do not reach back over
        // the previous listed element are opened before it.
        if let Some(prev) = last_explicit {
            let mut pending = Vec::new();
            let mut cur = parents.get(&id);
            while let Some(&anc) = cur {
                if emitted.contains(&anc)
                    || in_any_path.contains(&anc)
                    || is_ancestor_of(&parents, anc, prev)
                {
                    break;
                }
                pending.push(anc);
                cur = parents.get(&anc);
            }
            for anc in pending.into_iter().rev() {
                emit(anc, &mut out, &mut emitted, &container_to_paths, path_to_elements);
            }
        }

        emit(id, &mut out, &mut emitted, &container_to_paths, path_to_elements);
        last_explicit = Some(id);

        // Close out un-pathed containers the path has now left: each is
        // emitted right after its last listed descendant, before the next
        // listed element outside of it.
        let next = level1_seq[idx + 1..]
            .iter()
            .find(|n| !emitted.contains(*n))
            .copied();
        let mut cur = parents.get(&id);
        while let Some(&anc) = cur {
            cur = parents.get(&anc);
            if emitted.contains(&anc) || in_any_path.contains(&anc) {
                break;
            }
            if let Some(n) = next {
                if is_ancestor_of(&parents, anc, n) {
                    break;
                }
            }
            emit(anc, &mut out, &mut emitted, &container_to_paths, path_to_elements);
        }
    }

    // Nested paths whose container never appeared in a level-1 path: the
    // container brackets its sub-order at the position of the first of its
    // descendants already emitted, or at the end of the order.
    for path in sorted_paths.iter().filter(|p| p.level > 1) {
        let Some(ids) = path_to_elements.get(&path.id) else {
            continue;
        };
        if ids.iter().all(|id| emitted.contains(id)) {
            continue;
        }
        match nested_containers.get(&path.id).copied().flatten() {
            Some(container) => {
                emit(container, &mut out, &mut emitted, &container_to_paths, path_to_elements);
            }
            None => {
                log::debug!(
                    "nested path {} has no containing element; appending its order",
                    path.id
                );
                for &id in ids {
                    emit(id, &mut out, &mut emitted, &container_to_paths, path_to_elements);
                }
            }
        }
    }

    // Spatial fallback for elements no path covers.
    for id in preorder_ids(tree_roots) {
        if emitted.contains(&id) {
            continue;
        }
        let mut anchor = parents.get(&id).copied();
        while let Some(a) = anchor {
            if emitted.contains(&a) {
                break;
            }
            anchor = parents.get(&a).copied();
        }
        match anchor {
            Some(a) => {
                let pos = subtree_end(&out, &parents, a);
                out.insert(pos, id);
            }
            None => out.push(id),
        }
        emitted.insert(id);
    }

    out
}
