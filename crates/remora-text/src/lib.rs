#![forbid(unsafe_code)]

//! Text and element measurement for headless rendering.
//!
//! A layout engine running without a browser has no `getBBox()` or `getComputedTextLength()`.
//! [`ElementMeasurer`] provides both through the [`Measure`] trait: text is laid out with real font
//! metrics from a [`FontBackend`] and then mapped onto the reference renderer's boxes with the
//! constants in [`Calibration`].
//!
//! Font registration happens once, when the backend is built ([`SystemFonts::new`]); a missing
//! backend is reported there and never per measurement.

pub mod backend;
pub mod calibration;
pub mod config;
pub mod element;
pub mod error;
pub mod font;
pub mod measure;
pub mod profile;

pub use backend::{DeterministicFonts, FaceAlias, FontBackend, LineMetrics, SystemFonts};
pub use calibration::{Calibration, CalibrationSample};
pub use config::FontConfig;
pub use element::{ElementMeasurer, Measure};
pub use error::{Error, Result};
pub use font::{FontHints, FontSpec};
pub use measure::{TextLine, TextMeasurement, TextMeasurer};
pub use profile::{
    MeasureProfile, ProfileComparison, RecordingMeasurer, Severity, compare_profiles,
};
