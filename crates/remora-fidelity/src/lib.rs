#![forbid(unsafe_code)]

//! Fidelity scoring for headless diagram renderings.
//!
//! Two renderings of the same diagram are reduced to node positions (and, in simple mode, node,
//! edge and viewport boxes), then scored as raw, normalized and aligned mean deviations. The
//! suite runs that comparison over a corpus with an external reference renderer.

pub mod config;
pub mod deviation;
pub mod error;
mod finite;
pub mod mismatch;
pub mod positions;
pub mod renderer;
pub mod suite;

pub use config::SuiteConfig;
pub use deviation::{
    Alignment, CompareOptions, DeviationReport, compare, compare_maps, compare_svgs, compare_with,
};
pub use error::{Error, ReferenceError, Result};
pub use mismatch::{Feature, Mismatch, MismatchKind};
pub use positions::{NodePositionMap, Point};
pub use renderer::{
    CancelToken, CandidateRenderer, CommandRenderer, ReferenceRenderer, RenderRequest,
    SvgDirRenderer,
};
pub use suite::{
    DeviationMetric, Failure, SampleItem, SampleViolation, SuiteReport, ThresholdViolation,
    list_samples, run_suite,
};
