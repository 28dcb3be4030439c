use crate::backend::FontBackend;
use crate::calibration::Calibration;
use crate::font::{FontHints, FontSpec};
use remora_geom::Element;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Class mermaid puts on the `tspan` of each rendered label line.
pub const LINE_TSPAN_CLASS: &str = "text-outer-tspan";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMeasurement {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

/// One line of a text block together with the font it is drawn in.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font: FontSpec,
}

/// Calibrated text measurement over a [`FontBackend`].
///
/// Holds no mutable state; clones share the backend.
#[derive(Debug, Clone)]
pub struct TextMeasurer {
    backend: Arc<dyn FontBackend>,
    calibration: Calibration,
    process_font: FontSpec,
    caller_font: FontHints,
}

impl TextMeasurer {
    pub fn new(backend: Arc<dyn FontBackend>) -> Self {
        Self {
            backend,
            calibration: Calibration::default(),
            process_font: FontSpec::default(),
            caller_font: FontHints::default(),
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_process_font(mut self, font: FontSpec) -> Self {
        self.process_font = font;
        self
    }

    /// Defaults applied before the process-wide font, e.g. a diagram theme's font family.
    pub fn with_caller_font(mut self, hints: FontHints) -> Self {
        self.caller_font = hints;
        self
    }

    pub fn backend(&self) -> &dyn FontBackend {
        self.backend.as_ref()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn font_for(&self, el: &Element) -> FontSpec {
        self.process_font.resolve_for(el, &self.caller_font)
    }

    /// Uncalibrated width of a single line.
    pub fn line_width(&self, text: &str, font: &FontSpec) -> f64 {
        self.backend.measure_line(text, font).width()
    }

    /// Measures `text` in the font of `el`, one line per `\n`.
    pub fn measure_text(&self, el: &Element, text: &str) -> TextMeasurement {
        let font = self.font_for(el);
        let lines: Vec<TextLine> = text
            .split('\n')
            .map(|t| TextLine {
                text: t.to_string(),
                font: font.clone(),
            })
            .collect();
        self.measure_lines(&lines)
    }

    /// Measures the text content of `el`. Line `tspan`s are preferred when present (each may
    /// override the element's font); otherwise the content is split on `\n`.
    pub fn measure_block(&self, el: &Element) -> TextMeasurement {
        self.measure_lines(&self.block_lines(el))
    }

    pub fn block_lines(&self, el: &Element) -> Vec<TextLine> {
        let font = self.font_for(el);
        let tspans: Vec<&Element> = el
            .descendants()
            .skip(1)
            .filter(|d| d.is("tspan") && d.has_class(LINE_TSPAN_CLASS))
            .collect();
        if tspans.is_empty() {
            return el
                .text_content()
                .split('\n')
                .map(|t| TextLine {
                    text: t.to_string(),
                    font: font.clone(),
                })
                .collect();
        }
        let inherited = FontHints {
            family: Some(font.family.clone()),
            size: Some(font.size),
            weight: Some(font.weight.clone()),
            style: Some(font.style.clone()),
        };
        tspans
            .into_iter()
            .map(|t| TextLine {
                text: t.text_content(),
                font: FontHints::of_element(t).or(&inherited).resolve(&font),
            })
            .collect()
    }

    /// Raw block size: widest line, summed line heights.
    pub fn raw_block(&self, lines: &[TextLine]) -> (f64, f64) {
        let mut width = 0.0_f64;
        let mut height = 0.0_f64;
        for line in lines {
            let m = self.backend.measure_line(&line.text, &line.font);
            width = width.max(m.width());
            height += m.height_or(line.font.size * self.calibration.line_height_factor);
        }
        if lines.is_empty() {
            height = self.process_font.size * self.calibration.line_height_factor;
        }
        (width, height)
    }

    pub fn measure_lines(&self, lines: &[TextLine]) -> TextMeasurement {
        let (raw_w, raw_h) = self.raw_block(lines);
        let (width, height) = self.calibration.scale_block(raw_w, raw_h);
        TextMeasurement {
            width,
            height,
            line_count: lines.len().max(1),
        }
    }

    /// Length of the element's whole text content on one line, as `getComputedTextLength` reports
    /// it.
    pub fn text_length(&self, el: &Element) -> f64 {
        let font = self.font_for(el);
        self.line_width(&el.text_content(), &font) * self.calibration.text_length_scale
    }
}
