//! Simple-mode per-feature comparison: node boxes, edge paths and the viewport are matched by
//! id and flagged when any coordinate or size moves by more than a fixed threshold.

use crate::positions::{NODE_CLASS, node_position};
use indexmap::IndexMap;
use remora_geom::bbox::include_bounds;
use remora_geom::shapes::local_bounds_with_paths;
use remora_geom::transform::translate_or_identity;
use remora_geom::{Bounds, Document, Element, Translate, bounds_of_path};
use serde::{Deserialize, Serialize};

pub const VIEWPORT_ID: &str = "viewBox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchKind {
    Node,
    Edge,
    Viewport,
    /// Present in only one of the two documents.
    Structural,
}

/// Position and size of one compared feature. For nodes `x`/`y` is the node position, for
/// edges and the viewport it is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Feature {
    fn from_bounds(b: Bounds) -> Self {
        Self {
            x: b.min_x,
            y: b.min_y,
            width: b.width(),
            height: b.height(),
        }
    }

    /// Largest absolute difference over the four components.
    pub fn variation(&self, other: &Feature) -> f64 {
        [
            self.x - other.x,
            self.y - other.y,
            self.width - other.width,
            self.height - other.height,
        ]
        .into_iter()
        .map(f64::abs)
        .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mismatch {
    #[serde(rename = "type")]
    pub kind: MismatchKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Feature>,
    /// `+inf` (JSON `null`) for structural mismatches.
    #[serde(with = "crate::finite")]
    pub variation: f64,
}

impl Mismatch {
    pub fn structural(id: &str, candidate: Option<Feature>, reference: Option<Feature>) -> Self {
        Self {
            kind: MismatchKind::Structural,
            id: id.to_string(),
            candidate,
            reference,
            variation: f64::INFINITY,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind == MismatchKind::Structural
    }
}

/// Comparable features of one rendered document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub nodes: IndexMap<String, Feature>,
    pub edges: IndexMap<String, Feature>,
    pub viewport: Option<Feature>,
}

impl Features {
    pub fn from_document(doc: &Document) -> Self {
        let mut out = Self {
            viewport: doc.view_box().map(|vb| Feature {
                x: vb.min_x,
                y: vb.min_y,
                width: vb.width,
                height: vb.height,
            }),
            ..Self::default()
        };
        out.collect(&doc.root, Translate::IDENTITY, false);
        out
    }

    fn collect(&mut self, el: &Element, parent: Translate, in_node: bool) {
        let offset = parent.then(translate_or_identity(el.attr("transform")));
        let is_node = el.has_class(NODE_CLASS);
        match el.id() {
            Some(id) if is_node => {
                if let Some(p) = node_position(el, parent) {
                    let size = node_size(el);
                    self.nodes.entry(id.to_string()).or_insert(Feature {
                        x: p.x,
                        y: p.y,
                        width: size.map_or(0.0, |b| b.width()),
                        height: size.map_or(0.0, |b| b.height()),
                    });
                }
            }
            Some(id) if el.is("path") && !in_node => {
                let bounds = el
                    .attr("d")
                    .and_then(bounds_of_path)
                    .map(|b| Bounds::from_bbox(b).translate(offset.dx, offset.dy));
                match bounds {
                    Some(b) => {
                        self.edges
                            .entry(id.to_string())
                            .or_insert(Feature::from_bounds(b));
                    }
                    None => tracing::trace!(id, "edge path has no usable data"),
                }
            }
            _ => {}
        }
        for child in el.child_elements() {
            self.collect(child, offset, in_node || is_node);
        }
    }
}

/// Union of the shapes drawn by a node, relative to the node's own origin.
fn node_size(node: &Element) -> Option<Bounds> {
    fn fold(el: &Element, offset: Translate, acc: &mut Option<Bounds>) {
        if let Some(b) = local_bounds_with_paths(el) {
            let b = Bounds::from_bbox(b).translate(offset.dx, offset.dy);
            if b.is_finite() {
                include_bounds(acc, b);
            }
        }
        for child in el.child_elements() {
            fold(
                child,
                offset.then(translate_or_identity(child.attr("transform"))),
                acc,
            );
        }
    }
    let mut acc = None;
    fold(node, Translate::IDENTITY, &mut acc);
    acc
}

/// Matches `candidate` against `reference` feature by feature. Matched features above
/// `threshold` and features missing on either side are reported; the output lists nodes,
/// then edges, then the viewport.
pub fn classify(candidate: &Features, reference: &Features, threshold: f64) -> Vec<Mismatch> {
    let mut out = Vec::new();
    match_group(
        MismatchKind::Node,
        &candidate.nodes,
        &reference.nodes,
        threshold,
        &mut out,
    );
    match_group(
        MismatchKind::Edge,
        &candidate.edges,
        &reference.edges,
        threshold,
        &mut out,
    );
    match (candidate.viewport, reference.viewport) {
        (Some(c), Some(r)) => {
            push_if_over(MismatchKind::Viewport, VIEWPORT_ID, c, r, threshold, &mut out)
        }
        (None, None) => {}
        (c, r) => out.push(Mismatch::structural(VIEWPORT_ID, c, r)),
    }
    out
}

fn match_group(
    kind: MismatchKind,
    candidate: &IndexMap<String, Feature>,
    reference: &IndexMap<String, Feature>,
    threshold: f64,
    out: &mut Vec<Mismatch>,
) {
    for (id, c) in candidate {
        match reference.get(id) {
            Some(r) => push_if_over(kind, id, *c, *r, threshold, out),
            None => out.push(Mismatch::structural(id, Some(*c), None)),
        }
    }
    for (id, r) in reference {
        if !candidate.contains_key(id) {
            out.push(Mismatch::structural(id, None, Some(*r)));
        }
    }
}

fn push_if_over(
    kind: MismatchKind,
    id: &str,
    candidate: Feature,
    reference: Feature,
    threshold: f64,
    out: &mut Vec<Mismatch>,
) {
    let variation = candidate.variation(&reference);
    if variation > threshold {
        out.push(Mismatch {
            kind,
            id: id.to_string(),
            candidate: Some(candidate),
            reference: Some(reference),
            variation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(svg: &str) -> Features {
        Features::from_document(&Document::parse(svg).unwrap())
    }

    #[test]
    fn extracts_nodes_edges_and_viewport() {
        let f = features(
            r#"<svg viewBox="0 0 200 100">
                <g transform="translate(10, 0)">
                    <g class="node" id="A" transform="translate(20, 30)">
                        <rect x="-15" y="-10" width="30" height="20"/>
                        <path id="inner" d="M0 0 L100 100"/>
                    </g>
                </g>
                <g class="edgePaths"><path id="L_A_B" d="M10 10 L50 40" transform="translate(1, 1)"/></g>
                <path d="M0 0 L1 1"/>
            </svg>"#,
        );
        assert_eq!(
            f.nodes["A"],
            Feature {
                x: 30.0,
                y: 30.0,
                width: 100.0 + 15.0,
                height: 100.0 + 10.0
            }
        );
        assert_eq!(
            f.edges["L_A_B"],
            Feature {
                x: 11.0,
                y: 11.0,
                width: 40.0,
                height: 30.0
            }
        );
        assert_eq!(f.edges.len(), 1);
        assert_eq!(f.viewport.map(|v| v.width), Some(200.0));
    }

    #[test]
    fn only_features_over_threshold_are_reported() {
        let a = features(
            r#"<svg viewBox="0 0 100 100"><g class="node" id="A" transform="translate(10, 10)"/><g class="node" id="B" transform="translate(50, 50)"/></svg>"#,
        );
        let b = features(
            r#"<svg viewBox="0 0 103 100"><g class="node" id="A" transform="translate(14, 10)"/><g class="node" id="B" transform="translate(56, 50)"/></svg>"#,
        );
        let m = classify(&a, &b, 5.0);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].kind, MismatchKind::Node);
        assert_eq!(m[0].id, "B");
        assert_eq!(m[0].variation, 6.0);
    }

    #[test]
    fn one_sided_features_are_structural() {
        let a = features(r#"<svg><g class="node" id="A" transform="translate(1, 1)"/></svg>"#);
        let b = features(r#"<svg viewBox="0 0 1 1"><g class="node" id="Z" transform="translate(1, 1)"/></svg>"#);
        let m = classify(&a, &b, 5.0);
        let ids: Vec<_> = m.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["A", "Z", VIEWPORT_ID]);
        assert!(m.iter().all(|m| m.is_structural() && m.variation.is_infinite()));
    }

    #[test]
    fn structural_variation_serializes_as_null() {
        let m = Mismatch::structural("A", None, Some(Feature::default()));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "structural");
        assert!(json["variation"].is_null());
        assert!(json.get("candidate").is_none());
        let back: Mismatch = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
