//! Font selection for a measured element.
//!
//! Each property resolves independently: element attribute, then inline `style`, then the
//! caller-supplied default, then the process-wide default.

use remora_geom::Element;
use remora_geom::num::parse_length;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans, Arial, sans-serif";
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    /// CSS family list, e.g. `"trebuchet ms", verdana, sans-serif`.
    pub family: String,
    pub size: f64,
    pub weight: String,
    pub style: String,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
            weight: "normal".to_string(),
            style: "normal".to_string(),
        }
    }
}

impl FontSpec {
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = weight.into();
        self
    }

    /// Family names in preference order, unquoted.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.family
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|f| !f.is_empty())
    }

    /// CSS weight as a number in `1..=1000` (`normal` = 400, `bold` = 700).
    pub fn numeric_weight(&self) -> u16 {
        match self.weight.trim().to_ascii_lowercase().as_str() {
            "normal" | "" => 400,
            "bold" | "bolder" => 700,
            "lighter" => 300,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|w| w.is_finite())
                .map(|w| w.clamp(1.0, 1000.0) as u16)
                .unwrap_or(400),
        }
    }

    pub fn is_italic(&self) -> bool {
        matches!(
            self.style.trim().to_ascii_lowercase().as_str(),
            "italic" | "oblique"
        )
    }

    /// Canvas-style shorthand, e.g. `bold 12px DejaVu Sans, sans-serif`.
    pub fn shorthand(&self) -> String {
        let mut out = String::new();
        if self.is_italic() {
            out.push_str(&self.style);
            out.push(' ');
        }
        out.push_str(&self.weight);
        out.push(' ');
        out.push_str(&remora_geom::num::fmt_number(self.size));
        out.push_str("px ");
        out.push_str(&self.family);
        out
    }

    /// Resolves the font of `el` with `caller` as the caller-supplied default and `self` as the
    /// process-wide default.
    pub fn resolve_for(&self, el: &Element, caller: &FontHints) -> FontSpec {
        FontHints::of_element(el).or(caller).resolve(self)
    }
}

/// Partially specified font; unset properties fall through to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontHints {
    pub family: Option<String>,
    pub size: Option<f64>,
    pub weight: Option<String>,
    pub style: Option<String>,
}

impl FontHints {
    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            ..Default::default()
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match key {
            "font-family" => self.family = Some(value.to_string()),
            "font-size" => self.size = parse_length(value).filter(|v| *v > 0.0),
            "font-weight" => self.weight = Some(value.to_string()),
            "font-style" => self.style = Some(value.to_string()),
            _ => {}
        }
    }

    pub fn from_attributes(el: &Element) -> Self {
        let mut out = Self::default();
        for key in ["font-family", "font-size", "font-weight", "font-style"] {
            if let Some(v) = el.attr(key) {
                out.set(key, v);
            }
        }
        out
    }

    pub fn from_inline_style(el: &Element) -> Self {
        let mut out = Self::default();
        let Some(style) = el.attr("style") else {
            return out;
        };
        for decl in style.split(';') {
            let Some((k, v)) = decl.split_once(':') else {
                continue;
            };
            let v = v.trim().trim_end_matches("!important");
            out.set(k.trim().to_ascii_lowercase().as_str(), v);
        }
        out
    }

    pub fn of_element(el: &Element) -> Self {
        Self::from_attributes(el).or(&Self::from_inline_style(el))
    }

    /// Fills unset properties from `fallback`.
    pub fn or(mut self, fallback: &FontHints) -> Self {
        if self.family.is_none() {
            self.family.clone_from(&fallback.family);
        }
        if self.size.is_none() {
            self.size = fallback.size;
        }
        if self.weight.is_none() {
            self.weight.clone_from(&fallback.weight);
        }
        if self.style.is_none() {
            self.style.clone_from(&fallback.style);
        }
        self
    }

    pub fn resolve(self, base: &FontSpec) -> FontSpec {
        FontSpec {
            family: self.family.unwrap_or_else(|| base.family.clone()),
            size: self.size.unwrap_or(base.size),
            weight: self.weight.unwrap_or_else(|| base.weight.clone()),
            style: self.style.unwrap_or_else(|| base.style.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_beats_inline_style_beats_defaults() {
        let el = Element::new("text")
            .with_attr("font-size", "14px")
            .with_attr(
                "style",
                "font-size: 20px; font-weight: bold; font-family: 'Fira Sans' !important",
            );
        let process = FontSpec::default();
        let caller = FontHints {
            family: Some("caller".into()),
            style: Some("italic".into()),
            ..Default::default()
        };
        let spec = process.resolve_for(&el, &caller);
        assert_eq!(spec.size, 14.0);
        assert_eq!(spec.weight, "bold");
        assert_eq!(spec.family, "'Fira Sans'");
        assert_eq!(spec.style, "italic");
    }

    #[test]
    fn process_default_when_nothing_is_set() {
        let spec = FontSpec::default().resolve_for(&Element::new("text"), &FontHints::default());
        assert_eq!(spec, FontSpec::default());
        assert_eq!(spec.shorthand(), "normal 12px DejaVu Sans, Arial, sans-serif");
    }

    #[test]
    fn unparseable_size_falls_through() {
        let el = Element::new("text").with_attr("font-size", "large");
        let spec = FontSpec::default().resolve_for(&el, &FontHints::default());
        assert_eq!(spec.size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn families_are_unquoted() {
        let spec = FontSpec::default().with_family(r#""trebuchet ms", verdana , 'x',"#);
        assert_eq!(
            spec.families().collect::<Vec<_>>(),
            ["trebuchet ms", "verdana", "x"]
        );
    }

    #[test]
    fn weights() {
        let w = |s: &str| FontSpec::default().with_weight(s).numeric_weight();
        assert_eq!(w("normal"), 400);
        assert_eq!(w("Bold"), 700);
        assert_eq!(w("600"), 600);
        assert_eq!(w("9999"), 1000);
        assert_eq!(w("heavy"), 400);
    }
}
