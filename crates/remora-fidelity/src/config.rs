use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix for environment variables read by [`SuiteConfig::from_env`].
pub const ENV_PREFIX: &str = "REMORA_";

pub const DEFAULT_SIMPLE_THRESHOLD: f64 = 5.0;
pub const DEFAULT_NORMALIZED_THRESHOLD: f64 = 0.12;
pub const DEFAULT_RAW_THRESHOLD: f64 = 130.0;

/// Corpus comparison settings read from environment-style key/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteConfig {
    pub max_samples: Option<usize>,
    /// Per-feature cutoff for simple-mode mismatches, in document units.
    pub simple_threshold: f64,
    pub normalized_threshold: f64,
    pub raw_threshold: f64,
    pub reference_timeout_ms: u64,
    pub render_width: u32,
    pub render_height: u32,
    pub sample_dir: PathBuf,
    /// Emit per-sample `items` in the report.
    pub include_items: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            max_samples: None,
            simple_threshold: DEFAULT_SIMPLE_THRESHOLD,
            normalized_threshold: DEFAULT_NORMALIZED_THRESHOLD,
            raw_threshold: DEFAULT_RAW_THRESHOLD,
            reference_timeout_ms: 25_000,
            render_width: 800,
            render_height: 600,
            sample_dir: PathBuf::from("samples"),
            include_items: false,
        }
    }
}

impl SuiteConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars().filter_map(|(k, v)| {
            k.strip_prefix(ENV_PREFIX).map(|k| (k.to_string(), v))
        }))
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
            "MAX_SAMPLES" => {
                if let Some(n) = parse_or_warn::<usize>(key, value) {
                    self.max_samples = (n > 0).then_some(n);
                }
            }
            "SIMPLE_THRESHOLD" => set_threshold(&mut self.simple_threshold, key, value),
            "NORMALIZED_DEVIATION_THRESHOLD" => {
                set_threshold(&mut self.normalized_threshold, key, value)
            }
            "RAW_DEVIATION_THRESHOLD" => set_threshold(&mut self.raw_threshold, key, value),
            "REFERENCE_TIMEOUT_MS" => {
                if let Some(ms) = parse_or_warn::<u64>(key, value) {
                    self.reference_timeout_ms = ms;
                }
            }
            "RENDER_WIDTH" => {
                if let Some(w) = parse_or_warn::<u32>(key, value) {
                    self.render_width = w;
                }
            }
            "RENDER_HEIGHT" => {
                if let Some(h) = parse_or_warn::<u32>(key, value) {
                    self.render_height = h;
                }
            }
            "SAMPLE_DIR" => {
                if !value.is_empty() {
                    self.sample_dir = PathBuf::from(value);
                }
            }
            "INCLUDE_ITEMS" => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.include_items = true,
                "0" | "false" | "no" | "off" => self.include_items = false,
                _ => tracing::warn!(key, value, "ignoring unparseable flag"),
            },
            _ => return false,
        }
        true
    }

    pub fn reference_timeout(&self) -> Duration {
        Duration::from_millis(self.reference_timeout_ms)
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.parse::<T>().ok();
    if parsed.is_none() {
        tracing::warn!(key, value, "ignoring unparseable value");
    }
    parsed
}

fn set_threshold(slot: &mut f64, key: &str, value: &str) {
    match parse_or_warn::<f64>(key, value) {
        Some(v) if v.is_finite() && v >= 0.0 => *slot = v,
        Some(_) => tracing::warn!(key, value, "ignoring out-of-range threshold"),
        None => {}
    }
}
