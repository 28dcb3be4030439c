//! `translate(...)` extraction.
//!
//! Only translations are modeled. Rotation, scale and skew entries in a transform list are
//! ignored, so offsets compose additively along an ancestor chain.

use crate::num::fmt_number;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translate {
    pub dx: f64,
    pub dy: f64,
}

impl Translate {
    pub const IDENTITY: Self = Self { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn then(self, other: Translate) -> Self {
        Self {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    pub fn to_attr(self) -> String {
        format!("translate({}, {})", fmt_number(self.dx), fmt_number(self.dy))
    }
}

fn re_translate() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"translate\s*\(([^)]*)\)").unwrap())
}

fn re_separator() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"[,\s]+").unwrap())
}

/// Sums every `translate(x[, y])` entry of a transform attribute. Returns `None` when the
/// attribute carries no parseable translation.
pub fn parse_translate(transform: &str) -> Option<Translate> {
    let mut out: Option<Translate> = None;
    for caps in re_translate().captures_iter(transform) {
        let args = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let nums: Vec<f64> = re_separator()
            .split(args)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .collect();
        let Some(&dx) = nums.first() else {
            continue;
        };
        let dy = nums.get(1).copied().unwrap_or(0.0);
        let t = Translate::new(dx, dy);
        out = Some(out.map_or(t, |acc| acc.then(t)));
    }
    out
}

/// Like [`parse_translate`], with a missing/unparseable attribute treated as identity.
pub fn translate_or_identity(transform: Option<&str>) -> Translate {
    transform
        .and_then(parse_translate)
        .unwrap_or(Translate::IDENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_and_space_separated_pairs() {
        assert_eq!(
            parse_translate("translate(10, 20)"),
            Some(Translate::new(10.0, 20.0))
        );
        assert_eq!(
            parse_translate("translate(-3.5 4e1)"),
            Some(Translate::new(-3.5, 40.0))
        );
    }

    #[test]
    fn single_argument_translates_x_only() {
        assert_eq!(parse_translate("translate(7)"), Some(Translate::new(7.0, 0.0)));
    }

    #[test]
    fn sums_translate_entries_and_ignores_other_kinds() {
        let t = parse_translate("translate(1,2) rotate(45) translate(3, 4) scale(2)").unwrap();
        assert_eq!(t, Translate::new(4.0, 6.0));
    }

    #[test]
    fn non_translate_transform_is_none() {
        assert_eq!(parse_translate("rotate(90)"), None);
        assert_eq!(parse_translate("translate()"), None);
        assert_eq!(translate_or_identity(None), Translate::IDENTITY);
    }

    #[test]
    fn to_attr_round_trips() {
        let t = Translate::new(-4.0, 12.25);
        assert_eq!(t.to_attr(), "translate(-4, 12.25)");
        assert_eq!(parse_translate(&t.to_attr()), Some(t));
    }
}
