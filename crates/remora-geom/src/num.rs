/// Formats a number for an SVG attribute: shortest round-trippable decimal, no `-0`, and
/// sub-micro float noise snapped to the nearest integer.
pub fn fmt_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

/// Parses a length attribute such as `12`, `12.5px` or ` 3 `. Percentages and other units are
/// rejected.
pub fn parse_length(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches("px").trim();
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}
