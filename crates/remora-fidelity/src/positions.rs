//! Node position extraction.
//!
//! A node is any element carrying the `node` class token and an `id`. Its position is taken
//! from, in order: its own `translate(..)`, the first descendant carrying a `translate(..)`,
//! the center of the first descendant `rect`. Positions are absolute: ancestor translates are
//! added in.

use indexmap::IndexMap;
use remora_geom::shapes::local_shape_bounds;
use remora_geom::transform::translate_or_identity;
use remora_geom::{Document, Element, Translate, parse_translate};
use serde::{Deserialize, Serialize};

pub const NODE_CLASS: &str = "node";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePositionMap {
    positions: IndexMap<String, Point>,
}

impl NodePositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &Document) -> Self {
        let mut out = Self::new();
        collect(&doc.root, Translate::IDENTITY, &mut out);
        out
    }

    /// Keeps the first position seen for an id.
    pub fn insert(&mut self, id: impl Into<String>, point: Point) {
        self.positions.entry(id.into()).or_insert(point);
    }

    pub fn get(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> {
        self.positions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Ids present in both maps, in `self`'s order.
    pub fn common_ids<'a>(&'a self, other: &NodePositionMap) -> Vec<&'a str> {
        self.positions
            .keys()
            .filter(|id| other.contains(id))
            .map(String::as_str)
            .collect()
    }

    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            positions: self
                .positions
                .iter()
                .map(|(k, v)| (k.clone(), f(*v)))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Point)> for NodePositionMap {
    fn from_iter<T: IntoIterator<Item = (K, Point)>>(iter: T) -> Self {
        let mut out = Self::new();
        for (k, p) in iter {
            out.insert(k, p);
        }
        out
    }
}

fn collect(el: &Element, parent: Translate, out: &mut NodePositionMap) {
    let offset = parent.then(translate_or_identity(el.attr("transform")));
    if el.has_class(NODE_CLASS) {
        if let Some(id) = el.id() {
            match node_position(el, parent) {
                Some(p) => out.insert(id, p),
                None => tracing::trace!(id, "node has no usable position"),
            }
        }
    }
    for child in el.child_elements() {
        collect(child, offset, out);
    }
}

/// Position of `node` given the summed translate of its ancestors.
pub fn node_position(node: &Element, ancestors: Translate) -> Option<Point> {
    let at = |t: Translate| Point::new(t.dx, t.dy);
    if let Some(own) = node.attr("transform").and_then(parse_translate) {
        return Some(at(ancestors.then(own)));
    }
    // Preorder: the first translated descendant has no translated ancestor below `node`.
    let inner = node
        .descendants()
        .skip(1)
        .find_map(|d| d.attr("transform").and_then(parse_translate));
    if let Some(inner) = inner {
        return Some(at(ancestors.then(inner)));
    }
    let rect = node.descendants().skip(1).find(|d| d.is("rect"))?;
    let (cx, cy) = local_shape_bounds(rect)?.center();
    let p = Point::new(ancestors.dx + cx, ancestors.dy + cy);
    (p.x.is_finite() && p.y.is_finite()).then_some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(svg: &str) -> NodePositionMap {
        NodePositionMap::from_document(&Document::parse(svg).unwrap())
    }

    #[test]
    fn own_translate_plus_ancestors() {
        let m = positions(
            r#"<svg><g transform="translate(10, 20)"><g class="node default" id="A" transform="translate(5, 5)"/></g></svg>"#,
        );
        assert_eq!(m.get("A"), Some(Point::new(15.0, 25.0)));
    }

    #[test]
    fn falls_back_to_descendant_translate_then_rect_center() {
        let m = positions(
            r#"<svg>
                <g class="node" id="B"><g class="label" transform="translate(-7, 3)"/></g>
                <g class="node" id="C"><rect x="0" y="10" width="40" height="20"/></g>
                <g class="node" id="D"><circle r="3"/></g>
                <g class="node"><rect width="4" height="4"/></g>
            </svg>"#,
        );
        assert_eq!(m.get("B"), Some(Point::new(-7.0, 3.0)));
        assert_eq!(m.get("C"), Some(Point::new(20.0, 20.0)));
        assert!(!m.contains("D"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn class_token_must_match_exactly() {
        let m = positions(
            r#"<svg><g class="nodes" id="X" transform="translate(1,1)"/><g class="edgeLabel node" id="Y" transform="translate(2,2)"/></svg>"#,
        );
        assert!(!m.contains("X"));
        assert!(m.contains("Y"));
    }

    #[test]
    fn common_ids_follow_receiver_order() {
        let a: NodePositionMap = [("x", Point::default()), ("y", Point::default()), ("z", Point::default())]
            .into_iter()
            .collect();
        let b: NodePositionMap = [("z", Point::default()), ("x", Point::default())]
            .into_iter()
            .collect();
        assert_eq!(a.common_ids(&b), ["x", "z"]);
    }
}
