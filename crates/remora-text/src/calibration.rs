//! Calibration constants mapping raw font metrics onto a reference renderer's text boxes.
//!
//! The defaults were fitted against DejaVu Sans output of a headless Chrome reference; other
//! font stacks need their own fit (see [`Calibration::fit`]).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Calibration {
    /// Free-form label identifying the backend/reference pair the constants were fitted for.
    pub version: String,
    pub width_scale: f64,
    pub height_scale: f64,
    /// Added to both dimensions of a text block after scaling.
    pub block_padding: f64,
    /// Added to both dimensions of a text element's bounding box.
    pub bbox_padding: f64,
    /// Line height as a multiple of font size when the backend has no vertical metrics.
    pub line_height_factor: f64,
    pub text_length_scale: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            version: "dejavu-sans/chrome-1".to_string(),
            width_scale: 0.43,
            height_scale: 0.53,
            block_padding: 2.0,
            bbox_padding: 6.0,
            line_height_factor: 1.2,
            text_length_scale: 1.0,
        }
    }
}

/// One observation: raw (unscaled) block size next to the reference renderer's block size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSample {
    pub raw_width: f64,
    pub raw_height: f64,
    pub target_width: f64,
    pub target_height: f64,
}

impl Calibration {
    pub fn scale_block(&self, raw_width: f64, raw_height: f64) -> (f64, f64) {
        (
            raw_width * self.width_scale + self.block_padding,
            raw_height * self.height_scale + self.block_padding,
        )
    }

    /// Least-squares refit of `width_scale` and `height_scale` with paddings held fixed:
    /// minimizes `sum((raw * s + padding - target)^2)` per axis. Axes without usable samples
    /// keep the value from `base`.
    pub fn fit(base: &Calibration, samples: &[CalibrationSample]) -> Calibration {
        let usable = samples.iter().filter(|s| {
            s.raw_width.is_finite()
                && s.raw_height.is_finite()
                && s.target_width.is_finite()
                && s.target_height.is_finite()
        });

        let (mut wx, mut wy, mut hx, mut hy) = (0.0, 0.0, 0.0, 0.0);
        for s in usable {
            wx += s.raw_width * s.raw_width;
            wy += s.raw_width * (s.target_width - base.block_padding);
            hx += s.raw_height * s.raw_height;
            hy += s.raw_height * (s.target_height - base.block_padding);
        }

        let mut out = base.clone();
        if wx > f64::EPSILON {
            out.width_scale = wy / wx;
        }
        if hx > f64::EPSILON {
            out.height_scale = hy / hx;
        }
        tracing::debug!(
            width_scale = out.width_scale,
            height_scale = out.height_scale,
            samples = samples.len(),
            "fitted text calibration"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_recovers_exact_scales() {
        let base = Calibration::default();
        let samples: Vec<_> = [(100.0, 20.0), (40.0, 14.0), (250.0, 40.0)]
            .into_iter()
            .map(|(w, h)| CalibrationSample {
                raw_width: w,
                raw_height: h,
                target_width: w * 0.5 + base.block_padding,
                target_height: h * 0.75 + base.block_padding,
            })
            .collect();
        let fitted = Calibration::fit(&base, &samples);
        assert!((fitted.width_scale - 0.5).abs() < 1e-12);
        assert!((fitted.height_scale - 0.75).abs() < 1e-12);
        assert_eq!(fitted.bbox_padding, base.bbox_padding);
        assert_eq!(fitted.version, base.version);
    }

    #[test]
    fn degenerate_input_keeps_base() {
        let base = Calibration::default();
        assert_eq!(Calibration::fit(&base, &[]), base);
        let zero = CalibrationSample {
            raw_width: 0.0,
            raw_height: f64::NAN,
            target_width: 10.0,
            target_height: 10.0,
        };
        assert_eq!(Calibration::fit(&base, &[zero]), base);
    }

    #[test]
    fn serde_uses_camel_case_and_defaults() {
        let c: Calibration = serde_json::from_str(r#"{"widthScale": 0.5}"#).unwrap();
        assert_eq!(c.width_scale, 0.5);
        assert_eq!(c.height_scale, 0.53);
    }
}
