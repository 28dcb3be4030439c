//! Deviation scores between two node position maps.
//!
//! Every score is a mean over the ids common to both maps and is `+inf` when there are none.

use crate::mismatch::{Feature, Features, Mismatch, classify};
use crate::positions::{NodePositionMap, Point};
use remora_geom::Document;
use serde::{Deserialize, Serialize};

/// Stand-in for a zero distance from the centroid when forming scale ratios.
pub const SCALE_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationReport {
    /// Mean distance between unaligned positions. Diagnostic only.
    #[serde(with = "crate::finite")]
    pub raw_deviation: f64,
    /// Mean distance after rescaling each map into the unit square.
    #[serde(with = "crate::finite")]
    pub normalized_deviation: f64,
    /// Mean distance after mapping reference points onto the candidate with [`Alignment`].
    #[serde(with = "crate::finite")]
    pub aligned_deviation: f64,
    pub per_element_mismatches: Vec<Mismatch>,
    /// Number of ids both documents share.
    pub sample_count: usize,
}

impl DeviationReport {
    pub fn is_comparable(&self) -> bool {
        self.sample_count > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareOptions {
    /// Also report node, edge and viewport features that moved more than `simple_threshold`.
    /// Node ids missing on one side are reported either way.
    pub simple: bool,
    pub simple_threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            simple: true,
            simple_threshold: crate::config::DEFAULT_SIMPLE_THRESHOLD,
        }
    }
}

/// Centroid translation plus uniform scale mapping reference points onto candidate points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub candidate_centroid: Point,
    pub reference_centroid: Point,
    pub scale: f64,
}

impl Alignment {
    /// Fits over `(candidate, reference)` pairs. The scale is the mean ratio of each candidate
    /// point's distance from its centroid to the matching reference point's distance.
    pub fn fit(pairs: &[(Point, Point)]) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }
        let candidate_centroid = centroid(pairs.iter().map(|p| p.0));
        let reference_centroid = centroid(pairs.iter().map(|p| p.1));
        let guarded = |d: f64| if d > 0.0 { d } else { SCALE_EPSILON };
        let sum: f64 = pairs
            .iter()
            .map(|(c, r)| {
                guarded(c.distance(candidate_centroid)) / guarded(r.distance(reference_centroid))
            })
            .sum();
        let scale = sum / pairs.len() as f64;
        Some(Self {
            candidate_centroid,
            reference_centroid,
            scale: if scale.is_finite() { scale } else { 1.0 },
        })
    }

    pub fn apply(&self, reference: Point) -> Point {
        Point::new(
            self.candidate_centroid.x + (reference.x - self.reference_centroid.x) * self.scale,
            self.candidate_centroid.y + (reference.y - self.reference_centroid.y) * self.scale,
        )
    }
}

fn centroid(points: impl Iterator<Item = Point>) -> Point {
    let (mut x, mut y, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        x += p.x;
        y += p.y;
        n += 1;
    }
    if n == 0 {
        return Point::default();
    }
    Point::new(x / n as f64, y / n as f64)
}

/// `(candidate, reference)` positions of the ids both maps share, in candidate order.
pub fn paired_points(
    candidate: &NodePositionMap,
    reference: &NodePositionMap,
) -> Vec<(Point, Point)> {
    candidate
        .iter()
        .filter_map(|(id, c)| reference.get(id).map(|r| (c, r)))
        .collect()
}

fn mean_distance(pairs: impl ExactSizeIterator<Item = (Point, Point)>) -> f64 {
    let n = pairs.len();
    if n == 0 {
        return f64::INFINITY;
    }
    pairs.map(|(a, b)| a.distance(b)).sum::<f64>() / n as f64
}

pub fn raw_deviation(pairs: &[(Point, Point)]) -> f64 {
    mean_distance(pairs.iter().copied())
}

pub fn normalized_deviation(pairs: &[(Point, Point)]) -> f64 {
    let candidate = UnitFrame::of(pairs.iter().map(|p| p.0));
    let reference = UnitFrame::of(pairs.iter().map(|p| p.1));
    mean_distance(
        pairs
            .iter()
            .map(|(c, r)| (candidate.apply(*c), reference.apply(*r))),
    )
}

pub fn aligned_deviation(pairs: &[(Point, Point)]) -> f64 {
    let Some(alignment) = Alignment::fit(pairs) else {
        return f64::INFINITY;
    };
    mean_distance(pairs.iter().map(|(c, r)| (*c, alignment.apply(*r))))
}

/// Maps a point set's bounding box onto the unit square; a zero span counts as 1.
struct UnitFrame {
    min: Point,
    span: Point,
}

impl UnitFrame {
    fn of(points: impl Iterator<Item = Point>) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        let span = |lo: f64, hi: f64| {
            let s = hi - lo;
            if s > 0.0 && s.is_finite() { s } else { 1.0 }
        };
        Self {
            span: Point::new(span(min.x, max.x), span(min.y, max.y)),
            min,
        }
    }

    fn apply(&self, p: Point) -> Point {
        Point::new((p.x - self.min.x) / self.span.x, (p.y - self.min.y) / self.span.y)
    }
}

/// Scores two position maps. Ids present in only one map come back as structural mismatches.
pub fn compare_maps(candidate: &NodePositionMap, reference: &NodePositionMap) -> DeviationReport {
    let pairs = paired_points(candidate, reference);
    let mut mismatches = Vec::new();
    for (id, p) in candidate.iter().filter(|(id, _)| !reference.contains(id)) {
        mismatches.push(Mismatch::structural(id, Some(point_feature(p)), None));
    }
    for (id, p) in reference.iter().filter(|(id, _)| !candidate.contains(id)) {
        mismatches.push(Mismatch::structural(id, None, Some(point_feature(p))));
    }
    report(&pairs, mismatches)
}

fn point_feature(p: Point) -> Feature {
    Feature {
        x: p.x,
        y: p.y,
        ..Default::default()
    }
}

fn report(pairs: &[(Point, Point)], per_element_mismatches: Vec<Mismatch>) -> DeviationReport {
    let out = DeviationReport {
        raw_deviation: raw_deviation(pairs),
        normalized_deviation: normalized_deviation(pairs),
        aligned_deviation: aligned_deviation(pairs),
        per_element_mismatches,
        sample_count: pairs.len(),
    };
    tracing::debug!(
        common = out.sample_count,
        raw = out.raw_deviation,
        normalized = out.normalized_deviation,
        mismatches = out.per_element_mismatches.len(),
        "compared renderings"
    );
    out
}

pub fn compare(candidate: &Document, reference: &Document) -> DeviationReport {
    compare_with(candidate, reference, &CompareOptions::default())
}

pub fn compare_with(
    candidate: &Document,
    reference: &Document,
    options: &CompareOptions,
) -> DeviationReport {
    let candidate_nodes = NodePositionMap::from_document(candidate);
    let reference_nodes = NodePositionMap::from_document(reference);
    if !options.simple {
        return compare_maps(&candidate_nodes, &reference_nodes);
    }
    let pairs = paired_points(&candidate_nodes, &reference_nodes);
    let mismatches = classify(
        &Features::from_document(candidate),
        &Features::from_document(reference),
        options.simple_threshold,
    );
    report(&pairs, mismatches)
}

/// [`compare_with`] over serialized documents.
pub fn compare_svgs(
    candidate: &str,
    reference: &str,
    options: &CompareOptions,
) -> crate::Result<DeviationReport> {
    let candidate = Document::parse(candidate)?;
    let reference = Document::parse(reference)?;
    Ok(compare_with(&candidate, &reference, options))
}
