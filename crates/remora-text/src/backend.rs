//! Font backends: something that can lay out one line of text in a given font.

use crate::config::FontConfig;
use crate::font::FontSpec;
use crate::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use usvg::fontdb;

/// Fonts registered at startup when present, in addition to `FONT_PATH`.
const WELL_KNOWN_FONT_FILES: &[(&str, &str)] = &[(
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "DejaVu Sans",
)];

/// Unscaled extent of a single line of text, in document units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    /// Sum of glyph advances.
    pub advance: f64,
    /// Horizontal extent of the inked glyph boxes (0 for blank lines).
    pub ink_width: f64,
    /// Height of ink above / below the baseline; `None` when the line has no ink.
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
}

impl LineMetrics {
    /// The larger of ink extent and advance. Both grow as glyphs are appended, so this does too.
    pub fn width(&self) -> f64 {
        self.advance.max(self.ink_width)
    }

    /// `ascent + descent`, or `fallback` when the backend has no vertical metrics for the line.
    pub fn height_or(&self, fallback: f64) -> f64 {
        match (self.ascent, self.descent) {
            (Some(a), Some(d)) if (a + d).is_finite() => a + d,
            _ => fallback,
        }
    }
}

pub trait FontBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn measure_line(&self, text: &str, font: &FontSpec) -> LineMetrics;
}

/// Fixed-advance backend with no font files; results depend only on character count, size and
/// weight. Used where measurements must not depend on the host's installed fonts.
#[derive(Debug, Clone)]
pub struct DeterministicFonts {
    pub char_width_factor: f64,
    pub bold_width_factor: f64,
    /// Ascent as a fraction of font size; `None` disables vertical metrics entirely.
    pub ascent_factor: Option<f64>,
    pub descent_factor: f64,
}

impl Default for DeterministicFonts {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
            bold_width_factor: 1.1,
            ascent_factor: Some(0.8),
            descent_factor: 0.2,
        }
    }
}

impl FontBackend for DeterministicFonts {
    fn name(&self) -> &str {
        "deterministic"
    }

    fn measure_line(&self, text: &str, font: &FontSpec) -> LineMetrics {
        let size = font.size.max(0.0);
        let mut per_char = size * self.char_width_factor;
        if font.numeric_weight() >= 600 {
            per_char *= self.bold_width_factor;
        }
        let advance = text.chars().count() as f64 * per_char;
        let inked = text.chars().any(|c| !c.is_whitespace());
        LineMetrics {
            advance,
            ink_width: if inked { advance } else { 0.0 },
            ascent: self.ascent_factor.filter(|_| inked).map(|f| f * size),
            descent: self
                .ascent_factor
                .filter(|_| inked)
                .map(|_| self.descent_factor * size),
        }
    }
}

/// Backend over a `fontdb` database; glyph metrics come from `ttf-parser`.
pub struct SystemFonts {
    db: fontdb::Database,
    /// Families registered explicitly via `FONT_FAMILY`, keyed by lowercased name.
    aliases: FxHashMap<String, Vec<FaceAlias>>,
}

/// Extra family name for a registered face. Unset weight/style match any request.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAlias {
    pub family: String,
    pub weight: Option<u16>,
    pub italic: Option<bool>,
    id: Option<fontdb::ID>,
}

impl FaceAlias {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight: None,
            italic: None,
            id: None,
        }
    }

    /// Reads `FONT_FAMILY`/`FONT_WEIGHT`/`FONT_STYLE`; `None` without a family.
    pub fn from_config(config: &FontConfig) -> Option<Self> {
        let family = config.font_family.as_deref()?;
        let mut alias = Self::new(family);
        alias.weight = config.font_weight.as_deref().map(|w| {
            FontSpec::default().with_weight(w).numeric_weight()
        });
        alias.italic = config.font_style.as_deref().map(|s| {
            let mut f = FontSpec::default();
            f.style = s.to_string();
            f.is_italic()
        });
        Some(alias)
    }

    fn matches(&self, font: &FontSpec) -> bool {
        self.weight.is_none_or(|w| w == font.numeric_weight())
            && self.italic.is_none_or(|i| i == font.is_italic())
    }
}

impl fmt::Debug for SystemFonts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemFonts")
            .field("faces", &self.db.len())
            .field("aliases", &self.aliases.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SystemFonts {
    /// Builds the database once. Fails when the configured font cannot be read or when no face
    /// at all is available afterwards.
    pub fn new(config: &FontConfig) -> Result<Self> {
        let mut db = fontdb::Database::new();
        if config.load_system_fonts {
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system fonts");
        }
        let mut fonts = Self {
            db,
            aliases: FxHashMap::default(),
        };

        for (path, family) in WELL_KNOWN_FONT_FILES {
            let path = Path::new(path);
            if path.is_file() && !fonts.has_family(family) {
                if let Err(err) = fonts.register_file(path, Some(FaceAlias::new(*family))) {
                    tracing::debug!(path = %path.display(), %err, "skipping well-known font");
                }
            }
        }

        if let Some(path) = &config.font_path {
            fonts.register_file(path, FaceAlias::from_config(config))?;
        }

        if fonts.db.is_empty() {
            return Err(Error::NoFontBackend {
                system_fonts: config.load_system_fonts,
            });
        }
        Ok(fonts)
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    fn has_family(&self, family: &str) -> bool {
        self.db.faces().any(|f| {
            f.families
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(family))
        })
    }

    /// Loads a font file; when `alias` is set, the first face of the file also answers to that
    /// family name.
    pub fn register_file(&mut self, path: &Path, alias: Option<FaceAlias>) -> Result<()> {
        let known: FxHashSet<fontdb::ID> = self.db.faces().map(|f| f.id).collect();
        self.db
            .load_font_file(path)
            .map_err(|source| Error::FontRegistration {
                path: path.to_path_buf(),
                source,
            })?;

        let loaded = self.db.faces().find(|f| !known.contains(&f.id));
        match (loaded, alias) {
            (Some(face), Some(mut alias)) => {
                tracing::info!(path = %path.display(), family = %alias.family, "registered font");
                alias.id = Some(face.id);
                self.aliases
                    .entry(alias.family.to_ascii_lowercase())
                    .or_default()
                    .push(alias);
            }
            (Some(_), None) => tracing::info!(path = %path.display(), "registered font"),
            (None, _) => {
                return Err(Error::FontRegistration {
                    path: PathBuf::from(path),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file contains no usable font faces",
                    ),
                });
            }
        }
        Ok(())
    }

    fn select_face(&self, font: &FontSpec) -> Option<fontdb::ID> {
        for name in font.families() {
            let aliased = self
                .aliases
                .get(&name.to_ascii_lowercase())
                .and_then(|faces| faces.iter().find(|a| a.matches(font)))
                .and_then(|a| a.id);
            if aliased.is_some() {
                return aliased;
            }
        }

        let mut families: Vec<fontdb::Family<'_>> = font.families().map(generic_family).collect();
        families.push(fontdb::Family::SansSerif);
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(font.numeric_weight()),
            stretch: fontdb::Stretch::Normal,
            style: if font.is_italic() {
                fontdb::Style::Italic
            } else {
                fontdb::Style::Normal
            },
        };
        self.db.query(&query).or_else(|| {
            tracing::trace!(font = %font.shorthand(), "no matching face; using first available");
            self.db.faces().next().map(|f| f.id)
        })
    }
}

fn generic_family(name: &str) -> fontdb::Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => fontdb::Family::Serif,
        "sans-serif" => fontdb::Family::SansSerif,
        "monospace" => fontdb::Family::Monospace,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        _ => fontdb::Family::Name(name),
    }
}

fn layout_line(face: &ttf_parser::Face<'_>, text: &str, size: f64) -> LineMetrics {
    let upem = f64::from(face.units_per_em());
    if upem <= 0.0 {
        return LineMetrics::default();
    }
    let scale = size / upem;

    let mut pen = 0.0_f64;
    let mut ink: Option<(f64, f64, f64, f64)> = None;
    for ch in text.chars() {
        let gid = face.glyph_index(ch).unwrap_or(ttf_parser::GlyphId(0));
        if let Some(r) = face.glyph_bounding_box(gid) {
            let x0 = pen + f64::from(r.x_min) * scale;
            let x1 = pen + f64::from(r.x_max) * scale;
            let y0 = f64::from(r.y_min) * scale;
            let y1 = f64::from(r.y_max) * scale;
            ink = Some(match ink {
                Some((a, b, c, d)) => (a.min(x0), b.max(x1), c.min(y0), d.max(y1)),
                None => (x0, x1, y0, y1),
            });
        }
        pen += f64::from(face.glyph_hor_advance(gid).unwrap_or(0)) * scale;
    }

    match ink {
        Some((min_x, max_x, min_y, max_y)) => LineMetrics {
            advance: pen,
            ink_width: (max_x - min_x).max(0.0),
            ascent: Some(max_y.max(0.0)),
            descent: Some((-min_y).max(0.0)),
        },
        None => LineMetrics {
            advance: pen,
            ..Default::default()
        },
    }
}

impl FontBackend for SystemFonts {
    fn name(&self) -> &str {
        "system"
    }

    fn measure_line(&self, text: &str, font: &FontSpec) -> LineMetrics {
        let Some(id) = self.select_face(font) else {
            return LineMetrics::default();
        };
        self.db
            .with_face_data(id, |data, index| {
                ttf_parser::Face::parse(data, index)
                    .ok()
                    .map(|face| layout_line(&face, text, font.size))
            })
            .flatten()
            .unwrap_or_default()
    }
}
