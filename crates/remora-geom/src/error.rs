pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SVG parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("document root is `<{found}>`, expected `<svg>`")]
    MissingSvgRoot { found: String },
}
