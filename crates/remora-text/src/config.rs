use crate::font::{DEFAULT_FONT_FAMILY, FontSpec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for environment variables read by the `from_env` constructors.
pub const ENV_PREFIX: &str = "REMORA_";

/// Font setup read from environment-style key/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontConfig {
    /// Extra font file registered at startup (`FONT_PATH`).
    pub font_path: Option<PathBuf>,
    /// Family name the extra font answers to (`FONT_FAMILY`).
    pub font_family: Option<String>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    /// Family used when an element specifies none (`DEFAULT_FONT_FAMILY`).
    pub default_font_family: String,
    pub load_system_fonts: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_family: None,
            font_weight: None,
            font_style: None,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            load_system_fonts: true,
        }
    }
}

impl FontConfig {
    /// Reads `REMORA_`-prefixed variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(prefixed_env_vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = Self::default();
        for (k, v) in pairs {
            out.apply(k.as_ref(), v.as_ref());
        }
        out
    }

    /// Applies one key; returns `false` for keys this config does not own.
    pub fn apply(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim();
        match key {
            "FONT_PATH" => self.font_path = non_empty(value).map(PathBuf::from),
            "FONT_FAMILY" => self.font_family = non_empty(value).map(str::to_string),
            "FONT_WEIGHT" => self.font_weight = non_empty(value).map(str::to_string),
            "FONT_STYLE" => self.font_style = non_empty(value).map(str::to_string),
            "DEFAULT_FONT_FAMILY" => {
                if let Some(v) = non_empty(value) {
                    self.default_font_family = v.to_string();
                }
            }
            "LOAD_SYSTEM_FONTS" => match parse_flag(value) {
                Some(v) => self.load_system_fonts = v,
                None => tracing::warn!(key, value, "ignoring unparseable flag"),
            },
            _ => return false,
        }
        true
    }

    /// Process-wide default font for elements that specify nothing.
    pub fn process_font(&self) -> FontSpec {
        FontSpec::default().with_family(self.default_font_family.clone())
    }
}

/// Environment variables starting with [`ENV_PREFIX`], with the prefix stripped.
pub fn prefixed_env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars().filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|k| (k.to_string(), v)))
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_override_defaults() {
        let c = FontConfig::from_pairs([
            ("FONT_PATH", "/fonts/Inter.ttf"),
            ("FONT_FAMILY", "Inter"),
            ("DEFAULT_FONT_FAMILY", "Inter, sans-serif"),
            ("LOAD_SYSTEM_FONTS", "false"),
            ("UNRELATED", "x"),
        ]);
        assert_eq!(c.font_path, Some(PathBuf::from("/fonts/Inter.ttf")));
        assert_eq!(c.font_family.as_deref(), Some("Inter"));
        assert!(!c.load_system_fonts);
        assert_eq!(c.process_font().family, "Inter, sans-serif");
    }

    #[test]
    fn bad_values_keep_defaults() {
        let c = FontConfig::from_pairs([("LOAD_SYSTEM_FONTS", "maybe"), ("DEFAULT_FONT_FAMILY", " ")]);
        assert!(c.load_system_fonts);
        assert_eq!(c.default_font_family, DEFAULT_FONT_FAMILY);
    }
}
