#![forbid(unsafe_code)]

//! `remora` lets a diagram layout engine run without a browser and still land where a browser
//! would put things.
//!
//! - [`Remora::init`] registers fonts once and hands out an [`ElementMeasurer`], the
//!   `getBBox()`/`getComputedTextLength()` replacement the layout engine is built with.
//! - [`Remora::post_process`] refits the rendered document's `viewBox` and sizing.
//! - With the `fidelity` feature (default), [`fidelity`] scores renderings against a reference
//!   renderer.
//!
//! # Features
//!
//! - `fidelity`: deviation scoring and the corpus suite (`remora::fidelity`)

use std::sync::Arc;

pub use remora_geom as geom;
pub use remora_text as text;

#[cfg(feature = "fidelity")]
pub use remora_fidelity as fidelity;

pub use remora_geom::{
    BoundingBox, Document, Element, PathBoundsMode, PostProcessOptions, ViewBox, bounds_of_path,
    bounds_of_path_with, post_process,
};
pub use remora_text::{
    Calibration, DeterministicFonts, ElementMeasurer, FontBackend, FontConfig, FontHints,
    FontSpec, Measure, SystemFonts, TextMeasurement, TextMeasurer,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geom(#[from] remora_geom::Error),
    #[error(transparent)]
    Text(#[from] remora_text::Error),
    #[cfg(feature = "fidelity")]
    #[error(transparent)]
    Fidelity(#[from] remora_fidelity::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything read from the environment at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub font: FontConfig,
    #[cfg(feature = "fidelity")]
    pub suite: remora_fidelity::SuiteConfig,
    pub calibration: Calibration,
}

impl Settings {
    /// Reads `REMORA_`-prefixed variables, e.g. `REMORA_FONT_PATH`.
    pub fn from_env() -> Self {
        Self::from_pairs(remora_text::config::prefixed_env_vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = Self::default();
        for (k, v) in pairs {
            let (k, v) = (k.as_ref(), v.as_ref());
            let owned = out.font.apply(k, v);
            #[cfg(feature = "fidelity")]
            let owned = owned || out.suite.apply(k, v);
            if !owned {
                tracing::trace!(key = k, "ignoring unknown setting");
            }
        }
        out
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }
}

/// Initialized measurement capability. Build once per process and share; clones are cheap.
#[derive(Debug, Clone)]
pub struct Remora {
    measurer: Arc<ElementMeasurer>,
}

impl Remora {
    /// Registers fonts (system fonts, then `FONT_PATH`) and builds the measurer.
    ///
    /// Fails when no font face could be loaded at all.
    pub fn init(settings: &Settings) -> Result<Self> {
        let fonts = SystemFonts::new(&settings.font)?;
        tracing::info!(faces = fonts.face_count(), "font backend ready");
        Ok(Self::with_backend(Arc::new(fonts), settings))
    }

    /// Same as [`Remora::init`] over a caller-supplied backend, e.g. [`DeterministicFonts`].
    pub fn with_backend(backend: Arc<dyn FontBackend>, settings: &Settings) -> Self {
        let text = TextMeasurer::new(backend)
            .with_calibration(settings.calibration.clone())
            .with_process_font(settings.font.process_font());
        Self {
            measurer: Arc::new(ElementMeasurer::new(text)),
        }
    }

    pub fn measurer(&self) -> Arc<ElementMeasurer> {
        Arc::clone(&self.measurer)
    }

    pub fn text(&self) -> &TextMeasurer {
        self.measurer.text()
    }

    pub fn post_process(&self, svg: &str, options: &PostProcessOptions) -> Result<String> {
        Ok(post_process(svg, options)?)
    }
}
