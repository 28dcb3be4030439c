//! Post-render viewport rewriting: recompute the `viewBox` from content, move the origin to
//! `(0, 0)`, and size the root element.

use crate::document::{Document, Element, Node, ViewBox};
use crate::num::fmt_number;
use crate::shapes::union_of_shapes;
use crate::transform::Translate;
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIEWBOX_MARGIN: f64 = 4.0;
/// Width budget used by auto-sizing when no explicit maximum is given.
pub const DEFAULT_AUTO_SIZE_CAP: f64 = 1000.0;

/// Fits the `viewBox` to the union of all primitive shapes plus `margin` on every side, and drops
/// root `width`/`height`/`style` so the viewBox alone governs scale.
///
/// Returns `false` (document untouched) when there are no shapes to measure.
pub fn recompute_viewport(doc: &mut Document, margin: f64) -> bool {
    let Some(b) = union_of_shapes(&doc.root) else {
        tracing::debug!("no primitive shapes; viewBox left as is");
        return false;
    };
    let vb = ViewBox {
        min_x: (b.min_x - margin).floor(),
        min_y: (b.min_y - margin).floor(),
        width: (b.width() + 2.0 * margin).ceil().max(1.0),
        height: (b.height() + 2.0 * margin).ceil().max(1.0),
    };
    doc.set_view_box(vb);
    for key in ["width", "height", "style"] {
        doc.root.remove_attr(key);
    }
    true
}

/// Rewrites `viewBox` to start at the origin and wraps the previous children in a group carrying
/// the compensating translate, so rendered output is unchanged.
pub fn normalize_origin(doc: &mut Document) -> bool {
    let Some(vb) = doc.view_box() else {
        return false;
    };
    if vb.min_x == 0.0 && vb.min_y == 0.0 {
        return false;
    }

    let shift = Translate::new(-vb.min_x, -vb.min_y);
    let mut group = Element::new("g").with_attr("transform", shift.to_attr());
    group.children = std::mem::take(&mut doc.root.children);
    doc.root.children.push(Node::Element(group));
    doc.set_view_box(ViewBox {
        min_x: 0.0,
        min_y: 0.0,
        ..vb
    });
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
    pub auto_size: bool,
}

impl SizeOptions {
    fn wants_auto_fit(&self) -> bool {
        self.auto_size || self.max_width.is_some() || self.max_height.is_some()
    }
}

/// Writes explicit root `width`/`height` when given. Otherwise, when auto-fitting is requested,
/// scales the viewBox dimensions down (never up) into the budget. A scaled size is rounded to
/// whole units; a viewBox that already fits is written unchanged.
pub fn apply_size(doc: &mut Document, opts: &SizeOptions) -> bool {
    if opts.width.is_some() || opts.height.is_some() {
        if let Some(w) = &opts.width {
            doc.root.set_attr("width", w.clone());
        }
        if let Some(h) = &opts.height {
            doc.root.set_attr("height", h.clone());
        }
        return true;
    }
    if !opts.wants_auto_fit() {
        return false;
    }
    let Some(vb) = doc.view_box() else {
        return false;
    };
    if !(vb.width > 0.0 && vb.height > 0.0) {
        return false;
    }

    let max_width = match (opts.max_width, opts.max_height) {
        (None, None) => Some(DEFAULT_AUTO_SIZE_CAP),
        (w, _) => w,
    };
    let mut scale = 1.0_f64;
    if let Some(mw) = max_width.filter(|v| *v > 0.0) {
        scale = scale.min(mw / vb.width);
    }
    if let Some(mh) = opts.max_height.filter(|v| *v > 0.0) {
        scale = scale.min(mh / vb.height);
    }

    // Only a real shrink rounds; a fitting viewBox keeps its exact size.
    let (width, height) = if scale < 1.0 {
        ((vb.width * scale).round(), (vb.height * scale).round())
    } else {
        (vb.width, vb.height)
    };
    doc.root.set_attr("width", fmt_number(width));
    doc.root.set_attr("height", fmt_number(height));
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostProcessOptions {
    pub normalize_viewbox: bool,
    pub viewbox_margin: f64,
    pub normalize_origin: bool,
    #[serde(flatten)]
    pub size: SizeOptions,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self {
            normalize_viewbox: true,
            viewbox_margin: DEFAULT_VIEWBOX_MARGIN,
            normalize_origin: false,
            size: SizeOptions::default(),
        }
    }
}

/// Runs the enabled steps in order: viewport, origin, size.
pub fn post_process_document(doc: &mut Document, opts: &PostProcessOptions) {
    if opts.normalize_viewbox {
        recompute_viewport(doc, opts.viewbox_margin);
    }
    if opts.normalize_origin {
        normalize_origin(doc);
    }
    apply_size(doc, &opts.size);
}

pub fn post_process(svg: &str, opts: &PostProcessOptions) -> Result<String> {
    let mut doc = Document::parse(svg)?;
    post_process_document(&mut doc, opts);
    Ok(doc.to_svg_string())
}
