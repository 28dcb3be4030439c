//! Recording of measurement calls and comparison of two recordings.
//!
//! A profile captured from the reference environment and one captured here line up call by call
//! when both ran the same layout; the first diverging value usually points at the approximation
//! that pushed the layout off.

use crate::element::Measure;
use indexmap::IndexMap;
use remora_geom::{BoundingBox, Element};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureMethod {
    #[serde(
        rename = "getBBox",
        alias = "Element.getBBox",
        alias = "SVGElement.getBBox",
        alias = "SVGGraphicsElement.getBBox"
    )]
    BoundingBox,
    #[serde(
        rename = "getComputedTextLength",
        alias = "SVGElement.getComputedTextLength",
        alias = "SVGTextContentElement.getComputedTextLength"
    )]
    TextLength,
}

impl MeasureMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BoundingBox => "getBBox",
            Self::TextLength => "getComputedTextLength",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSummary {
    pub tag: String,
    pub id: String,
    pub classes: String,
}

impl ElementSummary {
    pub fn of(el: &Element) -> Self {
        Self {
            tag: el.name.to_ascii_lowercase(),
            id: el.attr("id").unwrap_or_default().to_string(),
            classes: el.attr("class").unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasureValue {
    Rect(BoundingBox),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureCall {
    pub call_id: u64,
    pub method: MeasureMethod,
    #[serde(default)]
    pub element: Option<ElementSummary>,
    pub result: Option<MeasureValue>,
    /// Milliseconds.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSummary {
    pub total_calls: usize,
    pub method_counts: IndexMap<String, usize>,
    pub element_counts: IndexMap<String, usize>,
    pub total_duration: f64,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasureProfile {
    pub call_count: usize,
    pub calls: Vec<MeasureCall>,
    pub summary: ProfileSummary,
}

impl MeasureProfile {
    pub fn from_calls(calls: Vec<MeasureCall>) -> Self {
        let mut summary = ProfileSummary {
            total_calls: calls.len(),
            ..Default::default()
        };
        for call in &calls {
            *summary
                .method_counts
                .entry(call.method.as_str().to_string())
                .or_default() += 1;
            let tag = call
                .element
                .as_ref()
                .map(|e| e.tag.clone())
                .unwrap_or_else(|| "unknown".to_string());
            *summary.element_counts.entry(tag).or_default() += 1;
            summary.total_duration += call.duration;
        }
        if !calls.is_empty() {
            summary.avg_duration = summary.total_duration / calls.len() as f64;
        }
        Self {
            call_count: calls.len(),
            calls,
            summary,
        }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Wraps a measurer and records every call made through it.
#[derive(Debug)]
pub struct RecordingMeasurer<M> {
    inner: M,
    calls: Mutex<Vec<MeasureCall>>,
}

impl<M: Measure> RecordingMeasurer<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, method: MeasureMethod, el: &Element, result: MeasureValue, started: Instant) {
        let duration = started.elapsed().as_secs_f64() * 1000.0;
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let call_id = calls.len() as u64;
        calls.push(MeasureCall {
            call_id,
            method,
            element: Some(ElementSummary::of(el)),
            result: Some(result),
            duration,
        });
    }

    pub fn profile(&self) -> MeasureProfile {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone();
        MeasureProfile::from_calls(calls)
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: Measure> Measure for RecordingMeasurer<M> {
    fn measure_bounding_box(&self, el: &Element) -> BoundingBox {
        let started = Instant::now();
        let b = self.inner.measure_bounding_box(el);
        self.record(MeasureMethod::BoundingBox, el, MeasureValue::Rect(b), started);
        b
    }

    fn measure_text_length(&self, el: &Element) -> f64 {
        let started = Instant::now();
        let v = self.inner.measure_text_length(el);
        self.record(MeasureMethod::TextLength, el, MeasureValue::Number(v), started);
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueDiff {
    /// One side returned nothing.
    Missing,
    Numeric {
        absolute: f64,
        /// `absolute / |reference|`; infinite when the reference value is 0.
        relative: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        total: f64,
    },
    /// A number on one side and a rect on the other.
    Shape,
}

impl ValueDiff {
    /// `None` when the values agree (rects within 0.01 in total).
    pub fn between(reference: Option<MeasureValue>, candidate: Option<MeasureValue>) -> Option<Self> {
        match (reference, candidate) {
            (None, None) => None,
            (None, _) | (_, None) => Some(Self::Missing),
            (Some(MeasureValue::Number(a)), Some(MeasureValue::Number(b))) => {
                if a == b {
                    return None;
                }
                let absolute = (a - b).abs();
                let relative = if a != 0.0 {
                    absolute / a.abs()
                } else {
                    f64::INFINITY
                };
                Some(Self::Numeric { absolute, relative })
            }
            (Some(MeasureValue::Rect(a)), Some(MeasureValue::Rect(b))) => {
                let x = (a.x - b.x).abs();
                let y = (a.y - b.y).abs();
                let width = (a.width - b.width).abs();
                let height = (a.height - b.height).abs();
                let total = x + y + width + height;
                (total > 0.01).then_some(Self::Rect {
                    x,
                    y,
                    width,
                    height,
                    total,
                })
            }
            _ => Some(Self::Shape),
        }
    }

    pub fn severity(&self, method: MeasureMethod) -> Severity {
        match (method, self) {
            (MeasureMethod::BoundingBox, Self::Rect { total, .. }) if *total > 5.0 => {
                Severity::High
            }
            (MeasureMethod::BoundingBox, Self::Numeric { absolute, .. }) if *absolute > 5.0 => {
                Severity::High
            }
            (MeasureMethod::TextLength, Self::Numeric { absolute, .. }) if *absolute > 2.0 => {
                Severity::High
            }
            (_, Self::Rect { total, .. }) if *total > 1.0 => Severity::Medium,
            (_, Self::Numeric { absolute, .. }) if *absolute > 1.0 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProfileMismatch {
    ExtraCall {
        index: usize,
        candidate: MeasureCall,
    },
    MissingCall {
        index: usize,
        reference: MeasureCall,
    },
    MethodMismatch {
        index: usize,
        reference: MeasureMethod,
        candidate: MeasureMethod,
    },
    ValueMismatch {
        index: usize,
        method: MeasureMethod,
        element: String,
        reference: Option<MeasureValue>,
        candidate: Option<MeasureValue>,
        diff: ValueDiff,
        severity: Severity,
    },
}

impl ProfileMismatch {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::ValueMismatch { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDelta {
    pub reference: usize,
    pub candidate: usize,
    pub diff: i64,
}

impl CountDelta {
    fn new(reference: usize, candidate: usize) -> Self {
        Self {
            reference,
            candidate,
            diff: candidate as i64 - reference as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub total_mismatches: usize,
    pub value_mismatches: usize,
    pub high_severity_mismatches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileComparison {
    pub total_calls: CountDelta,
    /// Only methods whose counts differ.
    pub method_differences: IndexMap<String, CountDelta>,
    pub mismatches: Vec<ProfileMismatch>,
    pub summary: ComparisonSummary,
}

/// Compares two profiles call by call (matched by position).
pub fn compare_profiles(reference: &MeasureProfile, candidate: &MeasureProfile) -> ProfileComparison {
    let mut method_differences = IndexMap::new();
    let methods = reference
        .summary
        .method_counts
        .keys()
        .chain(candidate.summary.method_counts.keys());
    for method in methods {
        if method_differences.contains_key(method) {
            continue;
        }
        let r = reference.summary.method_counts.get(method).copied().unwrap_or(0);
        let c = candidate.summary.method_counts.get(method).copied().unwrap_or(0);
        if r != c {
            method_differences.insert(method.clone(), CountDelta::new(r, c));
        }
    }

    let mut mismatches = Vec::new();
    let n = reference.calls.len().max(candidate.calls.len());
    for index in 0..n {
        let mismatch = match (reference.calls.get(index), candidate.calls.get(index)) {
            (None, Some(c)) => ProfileMismatch::ExtraCall {
                index,
                candidate: c.clone(),
            },
            (Some(r), None) => ProfileMismatch::MissingCall {
                index,
                reference: r.clone(),
            },
            (Some(r), Some(c)) if r.method != c.method => ProfileMismatch::MethodMismatch {
                index,
                reference: r.method,
                candidate: c.method,
            },
            (Some(r), Some(c)) => {
                let Some(diff) = ValueDiff::between(r.result, c.result) else {
                    continue;
                };
                ProfileMismatch::ValueMismatch {
                    index,
                    method: r.method,
                    element: r
                        .element
                        .as_ref()
                        .map(|e| e.tag.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                    reference: r.result,
                    candidate: c.result,
                    severity: diff.severity(r.method),
                    diff,
                }
            }
            (None, None) => continue,
        };
        mismatches.push(mismatch);
    }

    let summary = ComparisonSummary {
        total_mismatches: mismatches.len(),
        value_mismatches: mismatches
            .iter()
            .filter(|m| matches!(m, ProfileMismatch::ValueMismatch { .. }))
            .count(),
        high_severity_mismatches: mismatches
            .iter()
            .filter(|m| m.severity() == Some(Severity::High))
            .count(),
    };

    ProfileComparison {
        total_calls: CountDelta::new(reference.call_count, candidate.call_count),
        method_differences,
        mismatches,
        summary,
    }
}
