use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No font face could be loaded, so no measurement can be trusted.
    #[error(
        "no usable font backend: no font faces were loaded (system fonts enabled: {system_fonts}). Set FONT_PATH to a .ttf/.otf file or install a system font such as DejaVu Sans"
    )]
    NoFontBackend { system_fonts: bool },

    #[error("failed to register font `{}`: {source}", path.display())]
    FontRegistration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid measurement profile: {0}")]
    Profile(#[from] serde_json::Error),
}
