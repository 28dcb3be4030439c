//! Element measurement handed to the layout engine in place of browser `getBBox()` and
//! `getComputedTextLength()`.

use crate::measure::TextMeasurer;
use remora_geom::{Bounds, BoundingBox, Element, bounds_of_path};
use std::sync::Arc;

pub trait Measure {
    fn measure_bounding_box(&self, el: &Element) -> BoundingBox;

    fn measure_text_length(&self, el: &Element) -> f64;
}

impl<M: Measure + ?Sized> Measure for &M {
    fn measure_bounding_box(&self, el: &Element) -> BoundingBox {
        (**self).measure_bounding_box(el)
    }

    fn measure_text_length(&self, el: &Element) -> f64 {
        (**self).measure_text_length(el)
    }
}

impl<M: Measure + ?Sized> Measure for Arc<M> {
    fn measure_bounding_box(&self, el: &Element) -> BoundingBox {
        (**self).measure_bounding_box(el)
    }

    fn measure_text_length(&self, el: &Element) -> f64 {
        (**self).measure_text_length(el)
    }
}

#[derive(Debug, Clone)]
pub struct ElementMeasurer {
    text: TextMeasurer,
}

impl ElementMeasurer {
    pub fn new(text: TextMeasurer) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &TextMeasurer {
        &self.text
    }
}

impl Measure for ElementMeasurer {
    /// - `text`/`tspan`: calibrated block size plus `bbox_padding`, at the origin
    /// - `path`: conservative path bounds, zero box when the data is unusable
    /// - numeric `width` and `height` attributes: that size at the origin
    /// - anything else: union of the children's boxes (untransformed), zero box when empty
    fn measure_bounding_box(&self, el: &Element) -> BoundingBox {
        match el.name.as_str() {
            "text" | "tspan" => {
                let block = self.text.measure_block(el);
                let pad = self.text.calibration().bbox_padding;
                return BoundingBox::new(0.0, 0.0, block.width + pad, block.height + pad);
            }
            "path" => {
                return el
                    .attr("d")
                    .and_then(bounds_of_path)
                    .unwrap_or(BoundingBox::ZERO);
            }
            _ => {}
        }

        if let (Some(w), Some(h)) = (el.number_attr("width"), el.number_attr("height")) {
            return BoundingBox::new(0.0, 0.0, w, h);
        }

        let children = el
            .child_elements()
            .map(|c| Bounds::from_bbox(self.measure_bounding_box(c)));
        let mut acc: Option<Bounds> = None;
        for b in children {
            remora_geom::bbox::include_bounds(&mut acc, b);
        }
        acc.filter(Bounds::is_finite)
            .map(Bounds::to_bbox)
            .unwrap_or(BoundingBox::ZERO)
    }

    fn measure_text_length(&self, el: &Element) -> f64 {
        self.text.text_length(el)
    }
}
