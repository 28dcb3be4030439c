//! Local bounds of SVG primitives and their union across a translated tree.

use crate::bbox::{BoundingBox, Bounds, include_bounds};
use crate::document::Element;
use crate::path::bounds_of_path;
use crate::transform::{Translate, translate_or_identity};

/// Tags whose geometry is fully described by their own attributes.
pub const PRIMITIVE_SHAPES: &[&str] = &["rect", "circle", "ellipse", "polygon", "polyline"];

pub fn is_primitive_shape(el: &Element) -> bool {
    PRIMITIVE_SHAPES.contains(&el.name.as_str())
}

fn num(el: &Element, key: &str) -> f64 {
    el.number_attr(key).unwrap_or(0.0)
}

/// Bounds of a primitive in its own coordinate space (its `transform` is not applied).
/// Missing numeric attributes read as 0; `None` for non-shapes and empty point lists.
pub fn local_shape_bounds(el: &Element) -> Option<BoundingBox> {
    match el.name.as_str() {
        "rect" => Some(BoundingBox::new(
            num(el, "x"),
            num(el, "y"),
            num(el, "width"),
            num(el, "height"),
        )),
        "circle" => {
            let r = num(el, "r").abs();
            Some(BoundingBox::new(
                num(el, "cx") - r,
                num(el, "cy") - r,
                2.0 * r,
                2.0 * r,
            ))
        }
        "ellipse" => {
            let (rx, ry) = (num(el, "rx").abs(), num(el, "ry").abs());
            Some(BoundingBox::new(
                num(el, "cx") - rx,
                num(el, "cy") - ry,
                2.0 * rx,
                2.0 * ry,
            ))
        }
        "polygon" | "polyline" => {
            let points = el.attr("points")?;
            Bounds::from_points(svgtypes::PointsParser::from(points)).map(Bounds::to_bbox)
        }
        _ => None,
    }
}

/// Like [`local_shape_bounds`] but also accepts `path` elements (conservative bounds).
pub fn local_bounds_with_paths(el: &Element) -> Option<BoundingBox> {
    if el.is("path") {
        return el.attr("d").and_then(bounds_of_path);
    }
    local_shape_bounds(el)
}

/// Union of every primitive shape under `root`, each offset by its own translate plus the sum of
/// its ancestors' (including `root`'s). Paths are not visited.
pub fn union_of_shapes(root: &Element) -> Option<Bounds> {
    let mut acc = None;
    fold_shapes(root, Translate::IDENTITY, &mut acc);
    acc
}

fn fold_shapes(el: &Element, parent: Translate, acc: &mut Option<Bounds>) {
    let offset = parent.then(translate_or_identity(el.attr("transform")));
    if is_primitive_shape(el) {
        if let Some(b) = local_shape_bounds(el) {
            let b = Bounds::from_bbox(b).translate(offset.dx, offset.dy);
            if b.is_finite() {
                include_bounds(acc, b);
            }
        }
        return;
    }
    for child in el.child_elements() {
        fold_shapes(child, offset, acc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn circle_and_ellipse_bounds() {
        let c = Element::new("circle")
            .with_attr("cx", "10")
            .with_attr("cy", "20")
            .with_attr("r", "5");
        assert_eq!(
            local_shape_bounds(&c),
            Some(BoundingBox::new(5.0, 15.0, 10.0, 10.0))
        );
        let e = Element::new("ellipse")
            .with_attr("rx", "3")
            .with_attr("ry", "2");
        assert_eq!(
            local_shape_bounds(&e),
            Some(BoundingBox::new(-3.0, -2.0, 6.0, 4.0))
        );
    }

    #[test]
    fn polygon_points_and_empty_polyline() {
        let p = Element::new("polygon").with_attr("points", "0,0 10,-5 20,15");
        assert_eq!(
            local_shape_bounds(&p),
            Some(BoundingBox::new(0.0, -5.0, 20.0, 20.0))
        );
        let empty = Element::new("polyline").with_attr("points", "");
        assert_eq!(local_shape_bounds(&empty), None);
    }

    #[test]
    fn rect_with_px_units() {
        let r = Element::new("rect")
            .with_attr("x", "1px")
            .with_attr("width", "10px")
            .with_attr("height", "4");
        assert_eq!(
            local_shape_bounds(&r),
            Some(BoundingBox::new(1.0, 0.0, 10.0, 4.0))
        );
    }

    #[test]
    fn union_composes_nested_translates_and_skips_paths() {
        let doc = Document::parse(
            r#"<svg><g transform="translate(100, 0)"><g transform="translate(0,50)"><rect x="0" y="0" width="10" height="10" transform="translate(5 5)"/></g></g><path d="M-1000 -1000 L0 0"/></svg>"#,
        )
        .unwrap();
        let b = union_of_shapes(&doc.root).unwrap();
        assert_eq!(b.to_bbox(), BoundingBox::new(105.0, 55.0, 10.0, 10.0));
    }

    #[test]
    fn no_shapes_is_none() {
        let doc = Document::parse(r#"<svg><g><text>hi</text></g></svg>"#).unwrap();
        assert_eq!(union_of_shapes(&doc.root), None);
    }

    #[test]
    fn paths_are_opt_in() {
        let p = Element::new("path").with_attr("d", "M0 0 L4 3");
        assert_eq!(local_shape_bounds(&p), None);
        assert_eq!(
            local_bounds_with_paths(&p),
            Some(BoundingBox::new(0.0, 0.0, 4.0, 3.0))
        );
    }
}
