use proptest::prelude::*;
use remora_fidelity::{
    CompareOptions, MismatchKind, NodePositionMap, Point, compare, compare_maps, compare_svgs,
};
use remora_geom::{Document, normalize_origin};

const FLOWCHART: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" id="my-svg" viewBox="-8 -8 241.5 390" style="max-width: 241.5px;">
  <g>
    <g class="root">
      <g class="edgePaths">
        <path id="L_A_B_0" class="edge-thickness-normal flowchart-link" d="M112.75,62L112.75,66.167C112.75,70.333,112.75,78.667,112.82,86.417L112.89,94.167"/>
        <path id="L_B_C_0" class="flowchart-link" d="M84.37,186.63L73.78,199.32C63.18,212.02,41.99,237.42,31.39,259.28L20.8,282.5"/>
      </g>
      <g class="nodes">
        <g class="node default" id="flowchart-A-0" transform="translate(112.75, 35)">
          <rect class="basic label-container" x="-58.18" y="-27" width="116.36" height="54"/>
          <g class="label" transform="translate(-28.18, -12)"><text><tspan class="text-outer-tspan">Start</tspan></text></g>
        </g>
        <g class="node default" id="flowchart-B-1" transform="translate(112.75, 151.25)">
          <polygon points="57.25,0 114.5,-57.25 57.25,-114.5 0,-57.25" transform="translate(-56.75,57.25)"/>
        </g>
        <g class="node default" id="flowchart-C-3" transform="translate(48.5, 315.5)">
          <rect x="-48.5" y="-27" width="97" height="54"/>
        </g>
      </g>
    </g>
  </g>
</svg>"#;

fn nodes_svg(view_box: &str, nodes: &[(String, f64, f64)]) -> String {
    let mut out = format!(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{view_box}"><g class="nodes">"#);
    for (id, x, y) in nodes {
        out.push_str(&format!(
            r#"<g class="node" id="{id}" transform="translate({x}, {y})"><rect x="-10" y="-5" width="20" height="10"/></g>"#
        ));
    }
    out.push_str("</g></svg>");
    out
}

#[test]
fn document_against_itself_is_exact() {
    let doc = Document::parse(FLOWCHART).unwrap();
    let r = compare(&doc, &doc);
    assert_eq!(r.sample_count, 3);
    assert_eq!(r.raw_deviation, 0.0);
    assert_eq!(r.normalized_deviation, 0.0);
    assert!(r.aligned_deviation.abs() < 1e-9);
    assert!(r.per_element_mismatches.is_empty());
}

#[test]
fn two_point_scenario() {
    let a: NodePositionMap = [("A", Point::new(0.0, 0.0)), ("B", Point::new(100.0, 0.0))]
        .into_iter()
        .collect();
    let r = compare_maps(&a, &a.clone());
    assert_eq!(r.raw_deviation, 0.0);
    assert_eq!(r.normalized_deviation, 0.0);
}

#[test]
fn one_sided_node_is_structural_and_excluded_from_scores() {
    let base = vec![
        ("A".to_string(), 0.0, 0.0),
        ("B".to_string(), 100.0, 0.0),
    ];
    let mut extra = base.clone();
    extra.push(("Ghost".to_string(), 5000.0, 5000.0));
    let r = compare_svgs(
        &nodes_svg("0 0 10 10", &extra),
        &nodes_svg("0 0 10 10", &base),
        &CompareOptions::default(),
    )
    .unwrap();
    assert_eq!(r.sample_count, 2);
    assert_eq!(r.normalized_deviation, 0.0);
    let ghost: Vec<_> = r
        .per_element_mismatches
        .iter()
        .filter(|m| m.id == "Ghost")
        .collect();
    assert_eq!(ghost.len(), 1);
    assert_eq!(ghost[0].kind, MismatchKind::Structural);
    assert!(ghost[0].variation.is_infinite());
    assert!(ghost[0].candidate.is_some() && ghost[0].reference.is_none());
}

#[test]
fn structural_reporting_does_not_need_simple_mode() {
    let r = compare_svgs(
        &nodes_svg("0 0 10 10", &[("A".into(), 0.0, 0.0)]),
        &nodes_svg("0 0 10 10", &[("B".into(), 0.0, 0.0)]),
        &CompareOptions {
            simple: false,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(r.normalized_deviation.is_infinite());
    assert_eq!(r.per_element_mismatches.len(), 2);
    assert!(r.per_element_mismatches.iter().all(|m| m.is_structural()));
}

#[test]
fn simple_mode_flags_moved_edges() {
    let moved = FLOWCHART.replace("M84.37,186.63L73.78", "M94.37,186.63L73.78");
    let r = compare_svgs(&moved, FLOWCHART, &CompareOptions::default()).unwrap();
    assert_eq!(r.per_element_mismatches.len(), 1);
    let m = &r.per_element_mismatches[0];
    assert_eq!(m.kind, MismatchKind::Edge);
    assert_eq!(m.id, "L_B_C_0");
    assert!((m.variation - 10.0).abs() < 1e-9);
}

#[test]
fn malformed_input_is_an_error() {
    assert!(compare_svgs("<svg", FLOWCHART, &CompareOptions::default()).is_err());
}

fn point_sets() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 2..12)
}

fn named(points: &[(f64, f64)]) -> Vec<(String, f64, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, (x, y))| (format!("n{i}"), *x, *y))
        .collect()
}

proptest! {
    #[test]
    fn similarity_transforms_are_absorbed(
        points in point_sets(),
        k in 0.1f64..10.0,
        tx in -500.0f64..500.0,
        ty in -500.0f64..500.0,
    ) {
        let original = named(&points);
        let moved: Vec<_> = original
            .iter()
            .map(|(id, x, y)| (id.clone(), x * k + tx, y * k + ty))
            .collect();
        let r = compare_svgs(
            &nodes_svg("0 0 10 10", &moved),
            &nodes_svg("0 0 10 10", &original),
            &CompareOptions { simple: false, ..Default::default() },
        )
        .unwrap();
        prop_assert!(r.normalized_deviation < 1e-6, "normalized {}", r.normalized_deviation);
        prop_assert!(r.normalized_deviation < 0.12);
    }

    #[test]
    fn normalize_origin_shifts_positions_by_the_old_origin(
        points in point_sets(),
        ox in -300.0f64..300.0,
        oy in -300.0f64..300.0,
    ) {
        prop_assume!(ox != 0.0 || oy != 0.0);
        let svg = nodes_svg(&format!("{ox} {oy} 400 300"), &named(&points));
        let mut doc = Document::parse(&svg).unwrap();
        let before = NodePositionMap::from_document(&doc);
        prop_assert!(normalize_origin(&mut doc));
        let vb = doc.view_box().unwrap();
        prop_assert_eq!((vb.min_x, vb.min_y), (0.0, 0.0));
        let after = NodePositionMap::from_document(&Document::parse(&doc.to_svg_string()).unwrap());
        prop_assert_eq!(before.len(), after.len());
        for (id, p) in before.iter() {
            let q = after.get(id).unwrap();
            prop_assert!((q.x - (p.x - ox)).abs() < 1e-5);
            prop_assert!((q.y - (p.y - oy)).abs() < 1e-5);
        }
    }
}
