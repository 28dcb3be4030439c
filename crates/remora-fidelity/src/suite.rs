//! Corpus-wide deviation suite.

use crate::config::SuiteConfig;
use crate::deviation::{CompareOptions, compare_with};
use crate::error::{Error, ReferenceError, Result};
use crate::mismatch::Mismatch;
use crate::renderer::{CancelToken, CandidateRenderer, ReferenceRenderer, RenderRequest};
use remora_geom::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE_EXTENSION: &str = "mmd";

/// Every `.mmd` file below `dir`, sorted, truncated to `max` when given.
pub fn list_samples(dir: &Path, max: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk(dir, &mut out)?;
    out.sort();
    if let Some(max) = max {
        out.truncate(max);
    }
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let io = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().is_some_and(|e| e == SAMPLE_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleItem {
    pub file: String,
    /// Ids the two renderings share.
    pub count: usize,
    pub raw: f64,
    pub norm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Mismatch>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviationMetric {
    Normalized,
    Raw,
}

impl fmt::Display for DeviationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normalized => "normalized",
            Self::Raw => "raw",
        })
    }
}

/// A deviation above its acceptance threshold. Signals a fidelity regression, not a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{metric} deviation {value:.4} exceeds threshold {threshold}")]
pub struct ThresholdViolation {
    pub metric: DeviationMetric,
    pub value: f64,
    pub threshold: f64,
}

/// A single sample over one of the per-metric thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleViolation {
    pub file: String,
    #[serde(flatten)]
    pub violation: ThresholdViolation,
}

impl ThresholdViolation {
    fn check(metric: DeviationMetric, value: f64, threshold: f64) -> Option<Self> {
        (value > threshold).then_some(Self {
            metric,
            value,
            threshold,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub samples_processed: usize,
    pub compared: usize,
    pub avg_normalized_deviation: f64,
    pub avg_raw_deviation: f64,
    pub threshold_normalized: f64,
    pub threshold_raw: f64,
    pub failures: Vec<Failure>,
    pub failures_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SampleItem>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_violations: Vec<SampleViolation>,
}

impl SuiteReport {
    /// Fails when either average exceeds its threshold, normalized first.
    pub fn check_thresholds(&self) -> std::result::Result<(), ThresholdViolation> {
        let failed = ThresholdViolation::check(
            DeviationMetric::Normalized,
            self.avg_normalized_deviation,
            self.threshold_normalized,
        )
        .or_else(|| {
            ThresholdViolation::check(
                DeviationMetric::Raw,
                self.avg_raw_deviation,
                self.threshold_raw,
            )
        });
        match failed {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }

    /// Compared samples whose own deviation exceeds a threshold.
    pub fn violations(&self) -> Vec<(String, ThresholdViolation)> {
        self.sample_violations
            .iter()
            .map(|v| (v.file.clone(), v.violation.clone()))
            .collect()
    }
}

fn sample_violations(
    scored: &[SampleItem],
    threshold_normalized: f64,
    threshold_raw: f64,
) -> Vec<SampleViolation> {
    let mut out = Vec::new();
    for item in scored {
        let checks = [
            (DeviationMetric::Normalized, item.norm, threshold_normalized),
            (DeviationMetric::Raw, item.raw, threshold_raw),
        ];
        for (metric, value, threshold) in checks {
            if let Some(violation) = ThresholdViolation::check(metric, value, threshold) {
                out.push(SampleViolation {
                    file: item.file.clone(),
                    violation,
                });
            }
        }
    }
    out
}

/// Renders and compares every sample in order. Per-sample failures are recorded and skipped;
/// cancellation aborts the whole run without a report.
pub fn run_suite(
    samples: &[PathBuf],
    candidate: &dyn CandidateRenderer,
    reference: &dyn ReferenceRenderer,
    config: &SuiteConfig,
    cancel: &CancelToken,
) -> Result<SuiteReport> {
    let options = CompareOptions {
        simple: true,
        simple_threshold: config.simple_threshold,
    };
    let mut failures = Vec::new();
    let mut scored = Vec::new();

    for (index, sample) in samples.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(processed = index, "suite cancelled");
            return Err(Error::Cancelled);
        }
        let file = display_name(sample, &config.sample_dir);
        tracing::info!(sample = %file, index, total = samples.len(), "comparing sample");

        match score_sample(sample, &file, candidate, reference, config, &options, cancel) {
            Ok(item) => scored.push(item),
            Err(SampleError::Cancelled) => {
                tracing::info!(sample = %file, "suite cancelled");
                return Err(Error::Cancelled);
            }
            Err(SampleError::Failed(error)) => {
                tracing::warn!(sample = %file, %error, "sample failed");
                failures.push(Failure { file, error });
            }
        }
    }

    let compared = scored.len();
    let mean = |f: fn(&SampleItem) -> f64| {
        if compared == 0 {
            0.0
        } else {
            scored.iter().map(f).sum::<f64>() / compared as f64
        }
    };
    let report = SuiteReport {
        samples_processed: samples.len(),
        compared,
        avg_normalized_deviation: mean(|i| i.norm),
        avg_raw_deviation: mean(|i| i.raw),
        threshold_normalized: config.normalized_threshold,
        threshold_raw: config.raw_threshold,
        failures_count: failures.len(),
        failures,
        sample_violations: sample_violations(
            &scored,
            config.normalized_threshold,
            config.raw_threshold,
        ),
        items: config.include_items.then_some(scored),
    };
    tracing::info!(
        processed = report.samples_processed,
        compared = report.compared,
        failures = report.failures_count,
        avg_normalized = report.avg_normalized_deviation,
        avg_raw = report.avg_raw_deviation,
        "suite finished"
    );
    Ok(report)
}

enum SampleError {
    Cancelled,
    Failed(String),
}

impl From<ReferenceError> for SampleError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::Cancelled => Self::Cancelled,
            other => Self::Failed(other.to_string()),
        }
    }
}

fn score_sample(
    sample: &Path,
    file: &str,
    candidate: &dyn CandidateRenderer,
    reference: &dyn ReferenceRenderer,
    config: &SuiteConfig,
    options: &CompareOptions,
    cancel: &CancelToken,
) -> std::result::Result<SampleItem, SampleError> {
    let source = fs::read_to_string(sample)
        .map_err(|e| SampleError::Failed(format!("failed to read sample: {e}")))?;
    let request = RenderRequest {
        sample,
        source: &source,
        width: config.render_width,
        height: config.render_height,
    };
    let candidate_svg = candidate.render_candidate(&request, cancel)?;
    let reference_svg = reference.render_reference(&request, cancel)?;

    let parse = |svg: &str, side: &str| {
        Document::parse(svg).map_err(|e| SampleError::Failed(format!("{side} SVG: {e}")))
    };
    let report = compare_with(
        &parse(&candidate_svg, "candidate")?,
        &parse(&reference_svg, "reference")?,
        options,
    );
    if !report.normalized_deviation.is_finite() {
        return Err(SampleError::Failed("no common node identifiers".to_string()));
    }
    Ok(SampleItem {
        file: file.to_string(),
        count: report.sample_count,
        raw: report.raw_deviation,
        norm: report.normalized_deviation,
        details: (!report.per_element_mismatches.is_empty())
            .then_some(report.per_element_mismatches),
    })
}

fn display_name(sample: &Path, root: &Path) -> String {
    sample
        .strip_prefix(root)
        .unwrap_or(sample)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(norm: f64, raw: f64, scored: Vec<SampleItem>) -> SuiteReport {
        SuiteReport {
            samples_processed: scored.len(),
            compared: scored.len(),
            avg_normalized_deviation: norm,
            avg_raw_deviation: raw,
            threshold_normalized: 0.12,
            threshold_raw: 130.0,
            failures: Vec::new(),
            failures_count: 0,
            items: None,
            sample_violations: sample_violations(&scored, 0.12, 130.0),
        }
    }

    fn item(file: &str, norm: f64, raw: f64) -> SampleItem {
        SampleItem {
            file: file.to_string(),
            count: 3,
            raw,
            norm,
            details: None,
        }
    }

    #[test]
    fn thresholds_check_normalized_before_raw() {
        assert!(report(0.1, 100.0, vec![]).check_thresholds().is_ok());
        let err = report(0.2, 200.0, vec![]).check_thresholds().unwrap_err();
        assert_eq!(err.metric, DeviationMetric::Normalized);
        let err = report(0.1, 200.0, vec![]).check_thresholds().unwrap_err();
        assert_eq!(err.metric, DeviationMetric::Raw);
        assert_eq!(err.to_string(), "raw deviation 200.0000 exceeds threshold 130");
    }

    #[test]
    fn violations_are_per_sample() {
        let r = report(
            0.05,
            50.0,
            vec![item("a.mmd", 0.01, 10.0), item("b.mmd", 0.3, 140.0)],
        );
        let v = r.violations();
        assert_eq!(v.len(), 2);
        assert!(v.iter().all(|(file, _)| file == "b.mmd"));
    }

    #[test]
    fn report_keys_are_camel_case_and_items_optional() {
        let json = serde_json::to_value(report(0.0, 0.0, vec![item("a.mmd", 0.0, 0.0)])).unwrap();
        for key in [
            "samplesProcessed",
            "compared",
            "avgNormalizedDeviation",
            "avgRawDeviation",
            "thresholdNormalized",
            "thresholdRaw",
            "failures",
            "failuresCount",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("items").is_none());
        assert!(json.get("sampleViolations").is_none());
    }

    #[test]
    fn violations_survive_json_round_trip() {
        let r = report(0.05, 50.0, vec![item("a.mmd", 0.01, 10.0), item("b.mmd", 0.3, 10.0)]);
        let json = serde_json::to_string(&r).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["sampleViolations"][0],
            serde_json::json!({"file": "b.mmd", "metric": "normalized", "value": 0.3, "threshold": 0.12})
        );
        let back: SuiteReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.violations(), r.violations());
        assert_eq!(back.violations().len(), 1);
    }

    #[test]
    fn lists_only_mmd_files_recursively_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("flow/nested")).unwrap();
        fs::write(dir.path().join("b.mmd"), "").unwrap();
        fs::write(dir.path().join("flow/a.mmd"), "").unwrap();
        fs::write(dir.path().join("flow/nested/c.mmd"), "").unwrap();
        fs::write(dir.path().join("flow/readme.md"), "").unwrap();
        let all = list_samples(dir.path(), None).unwrap();
        let names: Vec<_> = all.iter().map(|p| display_name(p, dir.path())).collect();
        assert_eq!(names, ["b.mmd", "flow/a.mmd", "flow/nested/c.mmd"]);
        assert_eq!(list_samples(dir.path(), Some(2)).unwrap().len(), 2);
        assert!(list_samples(&dir.path().join("missing"), None).is_err());
    }
}
