//! Bounding boxes for SVG path data (`d` attributes).
//!
//! The default [`PathBoundsMode::Conservative`] mode records every visited point, including all
//! Bézier control points, and treats an elliptical arc as the `rx`×`ry` boxes around its start and
//! end points. For Béziers the result always contains the true curve (convex hull property) and
//! may be larger than it. [`PathBoundsMode::Tight`] solves for the real curve/arc extrema instead.

use crate::bbox::{BoundingBox, Bounds};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathBoundsMode {
    #[default]
    Conservative,
    Tight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(u8),
    Number(f64),
}

/// Splits path data into command letters and numbers. Separators and stray bytes are skipped.
/// The two flag operands of an arc are single `0`/`1` characters and may be written without
/// separators, as in `A5 5 0 0120 10`.
fn tokenize(d: &str) -> Vec<Token> {
    let bytes = d.as_bytes();
    let mut out = Vec::new();
    // Operand index within the current arc's 7-number group.
    let mut arc_operand: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() {
            out.push(Token::Command(b));
            arc_operand = matches!(b, b'A' | b'a').then_some(0);
            i += 1;
            continue;
        }
        if let Some(k) = arc_operand.filter(|k| *k == 3 || *k == 4) {
            if b == b'0' || b == b'1' {
                out.push(Token::Number(f64::from(b - b'0')));
                arc_operand = Some(k + 1);
                i += 1;
                continue;
            }
        }
        match scan_number(bytes, i) {
            Some((v, end)) => {
                out.push(Token::Number(v));
                if let Some(k) = arc_operand.as_mut() {
                    *k = (*k + 1) % 7;
                }
                i = end;
            }
            None => i += 1,
        }
    }
    out
}

fn is_digit(bytes: &[u8], i: usize) -> bool {
    bytes.get(i).is_some_and(u8::is_ascii_digit)
}

/// Reads `[+-]digits[.digits][e[+-]digits]` starting at `start`; returns the value and the index
/// just past it. A second `.` or a sign starts the next number.
fn scan_number(bytes: &[u8], start: usize) -> Option<(f64, usize)> {
    let mut i = start;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while is_digit(bytes, i) {
        i += 1;
    }
    let mut digits = i - int_start;
    if bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while is_digit(bytes, j) {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while is_digit(bytes, j) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    let v = std::str::from_utf8(&bytes[start..i]).ok()?.parse::<f64>().ok()?;
    Some((v, i))
}

/// Conservative bounds of a path. `None` when the data yields no coordinates (empty or
/// malformed); callers treat that as "contributes nothing".
pub fn bounds_of_path(d: &str) -> Option<BoundingBox> {
    bounds_of_path_with(d, PathBoundsMode::Conservative)
}

pub fn bounds_of_path_with(d: &str, mode: PathBoundsMode) -> Option<BoundingBox> {
    let tokens = tokenize(d);
    if tokens.is_empty() {
        return None;
    }
    let mut scanner = PathScanner::new(tokens, mode);
    scanner.run();
    match scanner.bounds {
        Some(b) if b.is_finite() => Some(b.to_bbox()),
        _ => {
            tracing::debug!(d, "path data produced no usable coordinates");
            None
        }
    }
}

type Pt = (f64, f64);

struct PathScanner {
    tokens: Vec<Token>,
    i: usize,
    mode: PathBoundsMode,
    current: Pt,
    subpath_start: Pt,
    last_cubic_ctrl: Option<Pt>,
    last_quad_ctrl: Option<Pt>,
    bounds: Option<Bounds>,
}

impl PathScanner {
    fn new(tokens: Vec<Token>, mode: PathBoundsMode) -> Self {
        Self {
            tokens,
            i: 0,
            mode,
            current: (0.0, 0.0),
            subpath_start: (0.0, 0.0),
            last_cubic_ctrl: None,
            last_quad_ctrl: None,
            bounds: None,
        }
    }

    fn add_point(&mut self, (x, y): Pt) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        match self.bounds.as_mut() {
            Some(b) => b.include_point(x, y),
            None => self.bounds = Some(Bounds::from_point(x, y)),
        }
    }

    fn bounds_mut(&mut self) -> &mut Bounds {
        let (x, y) = self.current;
        self.bounds.get_or_insert_with(|| Bounds::from_point(x, y))
    }

    fn next_is_number(&self) -> bool {
        matches!(self.tokens.get(self.i), Some(Token::Number(_)))
    }

    fn read_number(&mut self) -> Option<f64> {
        match self.tokens.get(self.i) {
            Some(Token::Number(v)) => {
                self.i += 1;
                Some(*v)
            }
            _ => None,
        }
    }

    fn read_pair(&mut self, relative: bool) -> Option<Pt> {
        let x = self.read_number()?;
        let y = self.read_number()?;
        if relative {
            Some((self.current.0 + x, self.current.1 + y))
        } else {
            Some((x, y))
        }
    }

    fn reflect(&self, ctrl: Option<Pt>) -> Pt {
        let (cx, cy) = self.current;
        match ctrl {
            Some((px, py)) => (2.0 * cx - px, 2.0 * cy - py),
            None => self.current,
        }
    }

    fn run(&mut self) {
        while self.i < self.tokens.len() {
            let Token::Command(letter) = self.tokens[self.i] else {
                // Stray operand outside any command.
                self.i += 1;
                continue;
            };
            self.i += 1;
            let relative = letter.is_ascii_lowercase();
            let cmd = letter.to_ascii_uppercase();
            self.command(cmd, relative);
            if !matches!(cmd, b'C' | b'S') {
                self.last_cubic_ctrl = None;
            }
            if !matches!(cmd, b'Q' | b'T') {
                self.last_quad_ctrl = None;
            }
        }
    }

    fn command(&mut self, cmd: u8, relative: bool) {
        match cmd {
            b'M' => {
                let Some(p) = self.read_pair(relative) else {
                    return;
                };
                self.current = p;
                self.subpath_start = p;
                self.add_point(p);
                self.line_to_pairs(relative);
            }
            b'L' => self.line_to_pairs(relative),
            b'H' => {
                while let Some(v) = self.read_number() {
                    let x = if relative { self.current.0 + v } else { v };
                    self.current = (x, self.current.1);
                    self.add_point(self.current);
                }
            }
            b'V' => {
                while let Some(v) = self.read_number() {
                    let y = if relative { self.current.1 + v } else { v };
                    self.current = (self.current.0, y);
                    self.add_point(self.current);
                }
            }
            b'C' => {
                while self.next_is_number() {
                    let (Some(c1), Some(c2), Some(end)) = (
                        self.read_pair(relative),
                        self.read_pair(relative),
                        self.read_pair(relative),
                    ) else {
                        break;
                    };
                    self.cubic(c1, c2, end);
                }
            }
            b'S' => {
                while self.next_is_number() {
                    let (Some(c2), Some(end)) =
                        (self.read_pair(relative), self.read_pair(relative))
                    else {
                        break;
                    };
                    let c1 = self.reflect(self.last_cubic_ctrl);
                    self.cubic(c1, c2, end);
                }
            }
            b'Q' => {
                while self.next_is_number() {
                    let (Some(ctrl), Some(end)) =
                        (self.read_pair(relative), self.read_pair(relative))
                    else {
                        break;
                    };
                    self.quadratic(ctrl, end);
                }
            }
            b'T' => {
                while self.next_is_number() {
                    let Some(end) = self.read_pair(relative) else {
                        break;
                    };
                    let ctrl = self.reflect(self.last_quad_ctrl);
                    self.quadratic(ctrl, end);
                }
            }
            b'A' => {
                while self.next_is_number() {
                    let nums: Vec<f64> = (0..5).map_while(|_| self.read_number()).collect();
                    let [rx, ry, rotation, large, sweep] = nums[..] else {
                        break;
                    };
                    let Some(end) = self.read_pair(relative) else {
                        break;
                    };
                    self.arc(rx, ry, rotation, large != 0.0, sweep != 0.0, end);
                }
            }
            b'Z' => {
                self.current = self.subpath_start;
                self.add_point(self.current);
            }
            other => {
                tracing::trace!(command = %(other as char), "skipping unsupported path command");
                while self.read_number().is_some() {}
            }
        }
    }

    fn line_to_pairs(&mut self, relative: bool) {
        while self.next_is_number() {
            let Some(p) = self.read_pair(relative) else {
                break;
            };
            self.current = p;
            self.add_point(p);
        }
    }

    fn cubic(&mut self, c1: Pt, c2: Pt, end: Pt) {
        let start = self.current;
        match self.mode {
            PathBoundsMode::Conservative => {
                self.add_point(c1);
                self.add_point(c2);
                self.add_point(end);
            }
            PathBoundsMode::Tight => {
                cubic_include_bounds(self.bounds_mut(), start, c1, c2, end);
            }
        }
        self.last_cubic_ctrl = Some(c2);
        self.current = end;
    }

    fn quadratic(&mut self, ctrl: Pt, end: Pt) {
        let start = self.current;
        match self.mode {
            PathBoundsMode::Conservative => {
                self.add_point(ctrl);
                self.add_point(end);
            }
            PathBoundsMode::Tight => {
                quadratic_include_bounds(self.bounds_mut(), start, ctrl, end);
            }
        }
        self.last_quad_ctrl = Some(ctrl);
        self.current = end;
    }

    fn arc(&mut self, rx: f64, ry: f64, rotation: f64, large: bool, sweep: bool, end: Pt) {
        let start = self.current;
        match self.mode {
            PathBoundsMode::Conservative => {
                let (rx, ry) = (rx.abs(), ry.abs());
                for (x, y) in [start, end] {
                    self.add_point((x - rx, y - ry));
                    self.add_point((x + rx, y + ry));
                }
                self.add_point(end);
            }
            PathBoundsMode::Tight => {
                arc_include_bounds(self.bounds_mut(), start, rx, ry, rotation, large, sweep, end);
            }
        }
        self.current = end;
    }
}

fn cubic_eval(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 3.0 * p0 - 6.0 * p1 + 3.0 * p2;
    let c = -3.0 * p0 + 3.0 * p1;
    ((a * t + b) * t + c) * t + p0
}

/// Parameters in (0, 1) where the derivative of one cubic coordinate vanishes.
fn cubic_extrema_params(p0: f64, p1: f64, p2: f64, p3: f64) -> impl Iterator<Item = f64> {
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 3.0 * p0 - 6.0 * p1 + 3.0 * p2;
    let c = -3.0 * p0 + 3.0 * p1;
    let (qa, qb, qc) = (3.0 * a, 2.0 * b, c);

    // Relative to the other coefficients: rounding leaves `qa` slightly off zero for curves that
    // are really quadratic, and dividing by it would amplify the error.
    const EPS: f64 = 1e-12;
    let mut roots = [f64::NAN; 2];
    if qa.abs() <= EPS * (qb.abs() + qc.abs()) {
        if qb != 0.0 {
            roots[0] = -qc / qb;
        }
    } else {
        let disc = qb * qb - 4.0 * qa * qc;
        let tol = 1e-12 * (qb * qb + (4.0 * qa * qc).abs());
        if disc >= -tol {
            let s = disc.max(0.0).sqrt();
            // Cancellation-free pair: q / qa and qc / q.
            let q = -0.5 * (qb + qb.signum() * s);
            roots[0] = q / qa;
            if q != 0.0 {
                roots[1] = qc / q;
            }
        }
    }
    roots.into_iter().filter(|t| *t > 0.0 && *t < 1.0)
}

fn cubic_include_bounds(b: &mut Bounds, p0: Pt, p1: Pt, p2: Pt, p3: Pt) {
    b.include_point(p0.0, p0.1);
    b.include_point(p3.0, p3.1);
    let params = cubic_extrema_params(p0.0, p1.0, p2.0, p3.0)
        .chain(cubic_extrema_params(p0.1, p1.1, p2.1, p3.1));
    for t in params {
        b.include_point(
            cubic_eval(p0.0, p1.0, p2.0, p3.0, t),
            cubic_eval(p0.1, p1.1, p2.1, p3.1, t),
        );
    }
}

/// Parameter in (0, 1) where the derivative of one quadratic coordinate vanishes.
fn quadratic_extremum_param(p0: f64, p1: f64, p2: f64) -> Option<f64> {
    let denom = p0 - 2.0 * p1 + p2;
    if denom == 0.0 {
        return None;
    }
    let t = (p0 - p1) / denom;
    (t > 0.0 && t < 1.0).then_some(t)
}

fn quadratic_eval(p0: f64, p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * p0 + 2.0 * mt * t * p1 + t * t * p2
}

fn quadratic_include_bounds(b: &mut Bounds, p0: Pt, p1: Pt, p2: Pt) {
    b.include_point(p0.0, p0.1);
    b.include_point(p2.0, p2.1);
    let params = quadratic_extremum_param(p0.0, p1.0, p2.0)
        .into_iter()
        .chain(quadratic_extremum_param(p0.1, p1.1, p2.1));
    for t in params {
        b.include_point(
            quadratic_eval(p0.0, p1.0, p2.0, t),
            quadratic_eval(p0.1, p1.1, p2.1, t),
        );
    }
}

fn normalize_angle(a: f64) -> f64 {
    let a = a % (2.0 * PI);
    if a < 0.0 { a + 2.0 * PI } else { a }
}

fn angle_between(theta: f64, start: f64, delta: f64) -> bool {
    let eps = 1e-9;
    let t = normalize_angle(theta - start);
    if delta >= 0.0 {
        t <= delta + eps
    } else {
        t >= 2.0 * PI + delta - eps
    }
}

fn vec_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let dot = ux * vx + uy * vy;
    let det = ux * vy - uy * vx;
    det.atan2(dot)
}

/// Exact extent of an elliptical arc via the endpoint-to-center conversion from the SVG
/// implementation notes (radii are scaled up when too small to span the endpoints).
#[allow(clippy::too_many_arguments)]
fn arc_include_bounds(
    b: &mut Bounds,
    (x0, y0): Pt,
    rx0: f64,
    ry0: f64,
    x_axis_rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    (x1, y1): Pt,
) {
    b.include_point(x0, y0);
    b.include_point(x1, y1);
    if rx0.abs() < 1e-12 || ry0.abs() < 1e-12 {
        return;
    }

    let phi = x_axis_rotation_deg.to_radians();
    let (cos_phi, sin_phi) = (phi.cos(), phi.sin());
    let mut rx = rx0.abs();
    let mut ry = ry0.abs();

    let dx2 = (x0 - x1) / 2.0;
    let dy2 = (y0 - y1) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;
    let (x1p2, y1p2) = (x1p * x1p, y1p * y1p);

    let lam = x1p2 / (rx * rx) + y1p2 / (ry * ry);
    if lam > 1.0 {
        let s = lam.sqrt();
        rx *= s;
        ry *= s;
    }

    let (rx2, ry2) = (rx * rx, ry * ry);
    let num = (rx2 * ry2) - (rx2 * y1p2) - (ry2 * x1p2);
    let den = (rx2 * y1p2) + (ry2 * x1p2);
    if den.abs() < 1e-24 {
        return;
    }
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();

    let cxp = coef * (rx * y1p) / ry;
    let cyp = coef * (-ry * x1p) / rx;
    let cx = cos_phi * cxp - sin_phi * cyp + (x0 + x1) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y0 + y1) / 2.0;

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let start = vec_angle(1.0, 0.0, ux, uy);
    let mut delta = vec_angle(ux, uy, vx, vy);
    if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    }

    let arc_point = |theta: f64| -> Pt {
        let (ct, st) = (theta.cos(), theta.sin());
        (
            cx + rx * ct * cos_phi - ry * st * sin_phi,
            cy + rx * ct * sin_phi + ry * st * cos_phi,
        )
    };

    let tx_base = (-ry * sin_phi).atan2(rx * cos_phi);
    let ty_base = (ry * cos_phi).atan2(rx * sin_phi);
    for base in [tx_base, ty_base] {
        for k in 0..2 {
            let t = base + (k as f64) * PI;
            if angle_between(t, start, delta) {
                let (x, y) = arc_point(t);
                b.include_point(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: f64, y: f64, w: f64, h: f64) -> Option<BoundingBox> {
        Some(BoundingBox::new(x, y, w, h))
    }

    #[test]
    fn closed_square() {
        assert_eq!(
            bounds_of_path("M10,10 L90,10 L90,90 L10,90 Z"),
            bb(10.0, 10.0, 80.0, 80.0)
        );
    }

    #[test]
    fn empty_and_garbage_paths_are_none() {
        assert_eq!(bounds_of_path(""), None);
        assert_eq!(bounds_of_path("   "), None);
        assert_eq!(bounds_of_path("M"), None);
        assert_eq!(bounds_of_path("M x"), None);
    }

    #[test]
    fn relative_moves_and_implicit_line_tos() {
        // `m` pairs after the first are implicit relative line-tos.
        assert_eq!(bounds_of_path("m5 5 10 0 0 10"), bb(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn horizontal_and_vertical_segments() {
        assert_eq!(bounds_of_path("M0 80 v-80 h90 V80 H0 Z"), bb(0.0, 0.0, 90.0, 80.0));
    }

    #[test]
    fn cubic_control_points_are_included() {
        assert_eq!(bounds_of_path("M0,0 C0,-20 10,-20 10,0"), bb(0.0, -20.0, 10.0, 20.0));
    }

    #[test]
    fn smooth_cubic_includes_reflected_control_point() {
        // Reflection of (5,-10) about (10,0) is (15,10).
        let b = bounds_of_path("M0,0 C0,0 5,-10 10,0 S20,0 20,0").unwrap();
        assert_eq!(b.max_y(), 10.0);
    }

    #[test]
    fn arcs_use_radius_boxes_at_both_ends() {
        assert_eq!(bounds_of_path("M10 10 A5 5 0 0 1 20 10"), bb(5.0, 5.0, 20.0, 10.0));
    }

    #[test]
    fn compact_arc_flags_are_single_characters() {
        assert_eq!(bounds_of_path("M0 0 A5 5 0 0120 10"), bb(-5.0, -5.0, 30.0, 20.0));
        // Two arcs in one command, flags packed both times.
        assert_eq!(
            bounds_of_path("M0 0 a1 1 0 01 2 0 1 1 0 10 2 0"),
            bb(-1.0, -1.0, 6.0, 2.0)
        );
    }

    #[test]
    fn close_returns_to_subpath_start() {
        // After `z` the next relative segment starts from (1,1), not (9,9).
        assert_eq!(bounds_of_path("M1 1 L9 9 z l-2 -2"), bb(-1.0, -1.0, 10.0, 10.0));
    }

    #[test]
    fn unknown_commands_skip_their_operands() {
        assert_eq!(bounds_of_path("M0 0 X 100 100 L10 10"), bb(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn compact_numbers_and_exponents() {
        assert_eq!(bounds_of_path("M-1-2L1e1.5"), bb(-1.0, -2.0, 11.0, 2.5));
    }

    #[test]
    fn tight_mode_matches_mermaid_service_background() {
        let d = "M0 80 v-80 q0,-5 5,-5 h80 q5,0 5,5 v80 H0 Z";
        let b = bounds_of_path_with(d, PathBoundsMode::Tight).unwrap();
        assert!((b.x - 0.0).abs() < 1e-9);
        assert!((b.y - (-5.0)).abs() < 1e-9);
        assert!((b.width - 90.0).abs() < 1e-9);
        assert!((b.height - 85.0).abs() < 1e-9);
    }

    #[test]
    fn tight_mode_is_never_larger_than_conservative() {
        let d = "M0,0 C0,-20 10,-20 10,0 Q20,20 30,0";
        let c = bounds_of_path(d).unwrap();
        let t = bounds_of_path_with(d, PathBoundsMode::Tight).unwrap();
        assert!(t.x >= c.x && t.y >= c.y);
        assert!(t.max_x() <= c.max_x() && t.max_y() <= c.max_y());
        // True peak of the cubic is at y = -15.
        assert!((t.y - (-15.0)).abs() < 1e-9);
    }

    #[test]
    fn tight_quadratic_peak_is_solved_directly() {
        // Peak of M0 0 Q5 -10 10 0 is y = -5 at t = 0.5.
        let b = bounds_of_path_with("M0 0 Q5 -10 10 0", PathBoundsMode::Tight).unwrap();
        assert_eq!(b, BoundingBox::new(0.0, -5.0, 10.0, 5.0));
    }

    #[test]
    fn cubic_roots_survive_near_zero_leading_coefficient() {
        // Degree-elevated quadratic: the leading coefficient is rounding noise.
        let (p0, p1, p2) = (0.0, -282.4888370151618, 492.29089212526185);
        let c1 = p0 + (2.0 / 3.0) * (p1 - p0);
        let c2 = p2 + (2.0 / 3.0) * (p1 - p2);
        let t_true = (p0 - p1) / (p0 - 2.0 * p1 + p2);
        let ts: Vec<f64> = cubic_extrema_params(p0, c1, c2, p2).collect();
        assert!(ts.iter().any(|t| (t - t_true).abs() < 1e-9), "{ts:?} vs {t_true}");
    }

    #[test]
    fn tight_arc_covers_semicircle_bulge() {
        // Upper half circle from (0,0) to (100,0), radius 50.
        let b = bounds_of_path_with("M0 0 A50 50 0 0 1 100 0", PathBoundsMode::Tight).unwrap();
        assert!((b.y - (-50.0)).abs() < 1e-9, "y: {}", b.y);
        assert!((b.width - 100.0).abs() < 1e-9);
    }
}
