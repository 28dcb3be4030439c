use proptest::prelude::*;
use remora_geom::{BoundingBox, PathBoundsMode, bounds_of_path, bounds_of_path_with};

type Pt = (f64, f64);

fn coord() -> impl Strategy<Value = f64> {
    -500.0f64..500.0
}

fn point() -> impl Strategy<Value = Pt> {
    (coord(), coord())
}

fn cubic_at(p: [Pt; 4], t: f64) -> Pt {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p[0].0 + b * p[1].0 + c * p[2].0 + d * p[3].0,
        a * p[0].1 + b * p[1].1 + c * p[2].1 + d * p[3].1,
    )
}

fn quad_at(p: [Pt; 3], t: f64) -> Pt {
    let mt = 1.0 - t;
    (
        mt * mt * p[0].0 + 2.0 * mt * t * p[1].0 + t * t * p[2].0,
        mt * mt * p[0].1 + 2.0 * mt * t * p[1].1 + t * t * p[2].1,
    )
}

fn assert_contains(b: &BoundingBox, pts: impl Iterator<Item = Pt>) {
    for (x, y) in pts {
        assert!(b.contains_point(x, y, 1e-6), "{b:?} misses ({x}, {y})");
    }
}

fn samples() -> impl Iterator<Item = f64> {
    (0..=64).map(|i| i as f64 / 64.0)
}

#[test]
fn square_scenario() {
    assert_eq!(
        bounds_of_path("M10,10 L90,10 L90,90 L10,90 Z"),
        Some(BoundingBox::new(10.0, 10.0, 80.0, 80.0))
    );
    assert_eq!(bounds_of_path(""), None);
}

#[test]
fn mermaid_edge_path() {
    let d = "M174.5,47L174.5,51.167C174.5,55.333,174.5,63.667,174.5,71.333C174.5,79,174.5,86,174.5,89.5L174.5,93";
    let b = bounds_of_path(d).unwrap();
    assert_eq!(b.x, 174.5);
    assert_eq!(b.width, 0.0);
    assert_eq!(b.y, 47.0);
    assert_eq!(b.max_y(), 93.0);
}

#[test]
fn relative_smooth_quadratic_chain() {
    // q then t: reflected control of (5,-10) about (10,0) is (15,10).
    let b = bounds_of_path("M0 0 q5 -10 10 0 t10 0").unwrap();
    assert_eq!(b, BoundingBox::new(0.0, -10.0, 20.0, 20.0));
}

#[test]
fn vertical_quadratic_with_interior_turn() {
    // All x equal; y dips to about -75.48 before rising to the end point.
    let pts = [(0.0, 0.0), (0.0, -282.4888370151618), (0.0, 492.29089212526185)];
    let d = "M0 0 q0 -282.4888370151618 0 492.29089212526185";
    for mode in [PathBoundsMode::Conservative, PathBoundsMode::Tight] {
        let b = bounds_of_path_with(d, mode).unwrap();
        assert_contains(&b, samples().map(|t| quad_at(pts, t)));
        assert_contains(&b, std::iter::once((0.0, -74.33914543068943)));
        assert_eq!(b.width, 0.0);
    }
    let tight = bounds_of_path_with(d, PathBoundsMode::Tight).unwrap();
    assert!((tight.y - (-75.47745728253823)).abs() < 1e-9, "y: {}", tight.y);
    assert!((tight.max_y() - 492.29089212526185).abs() < 1e-9);
}

#[test]
fn vertical_cubic_with_two_turns() {
    // Degenerate in x; y overshoots both ends.
    let pts = [(3.0, 0.0), (3.0, -40.0), (3.0, 140.0), (3.0, 100.0)];
    let d = "M3 0 C3 -40 3 140 3 100";
    for mode in [PathBoundsMode::Conservative, PathBoundsMode::Tight] {
        let b = bounds_of_path_with(d, mode).unwrap();
        assert_contains(&b, samples().map(|t| cubic_at(pts, t)));
        assert_eq!((b.x, b.width), (3.0, 0.0));
    }
    let tight = bounds_of_path_with(d, PathBoundsMode::Tight).unwrap();
    assert!(tight.y < 0.0 && tight.max_y() > 100.0);
}

proptest! {
    #[test]
    fn cubic_curve_is_contained(p0 in point(), p1 in point(), p2 in point(), p3 in point()) {
        let d = format!(
            "M{} {} C{} {} {} {} {} {}",
            p0.0, p0.1, p1.0, p1.1, p2.0, p2.1, p3.0, p3.1
        );
        let pts = [p0, p1, p2, p3];
        for mode in [PathBoundsMode::Conservative, PathBoundsMode::Tight] {
            let b = bounds_of_path_with(&d, mode).unwrap();
            assert_contains(&b, samples().map(|t| cubic_at(pts, t)));
        }
    }

    #[test]
    fn relative_quadratic_curve_is_contained(p0 in point(), p1 in point(), p2 in point()) {
        let d = format!(
            "M{} {} q{} {} {} {}",
            p0.0, p0.1, p1.0 - p0.0, p1.1 - p0.1, p2.0 - p0.0, p2.1 - p0.1
        );
        let pts = [p0, p1, p2];
        for mode in [PathBoundsMode::Conservative, PathBoundsMode::Tight] {
            let b = bounds_of_path_with(&d, mode).unwrap();
            assert_contains(&b, samples().map(|t| quad_at(pts, t)));
        }
    }

    #[test]
    fn tight_never_exceeds_conservative(p0 in point(), p1 in point(), p2 in point(), p3 in point()) {
        let d = format!(
            "M{} {} C{} {} {} {} {} {}",
            p0.0, p0.1, p1.0, p1.1, p2.0, p2.1, p3.0, p3.1
        );
        let c = bounds_of_path(&d).unwrap();
        let t = bounds_of_path_with(&d, PathBoundsMode::Tight).unwrap();
        prop_assert!(t.x >= c.x - 1e-9 && t.y >= c.y - 1e-9);
        prop_assert!(t.max_x() <= c.max_x() + 1e-9 && t.max_y() <= c.max_y() + 1e-9);
    }

    #[test]
    fn never_panics_on_path_like_input(d in "[MmLlHhVvCcSsQqTtAaZzX0-9eE.,+ -]{0,80}") {
        if let Some(b) = bounds_of_path(&d) {
            prop_assert!(b.width >= 0.0 && b.height >= 0.0);
        }
        let _ = bounds_of_path_with(&d, PathBoundsMode::Tight);
    }
}
