#![forbid(unsafe_code)]

//! Geometry for headless diagram rendering.
//!
//! - [`path`]: bounding boxes of SVG path data
//! - [`transform`]: translate-only transform chains
//! - [`document`]: an owned SVG tree that can be edited and re-serialized
//! - [`viewport`]: viewBox recomputation, origin normalization and sizing of a rendered document

pub mod bbox;
pub mod document;
pub mod error;
pub mod num;
pub mod path;
pub mod shapes;
pub mod transform;
pub mod viewport;

pub use bbox::{BoundingBox, Bounds};
pub use document::{Document, Element, Node, ViewBox};
pub use error::{Error, Result};
pub use path::{PathBoundsMode, bounds_of_path, bounds_of_path_with};
pub use transform::{Translate, parse_translate};
pub use viewport::{
    PostProcessOptions, SizeOptions, apply_size, normalize_origin, post_process,
    post_process_document, recompute_viewport,
};
