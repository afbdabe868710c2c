//! Crate-wide error type.
//!
//! Degenerate math (zero-magnitude Möbius denominators, pan-solver
//! determinants near zero) is not represented here: per spec it is handled
//! locally by clamping and never surfaces as an `Err`. Only contract
//! violations and resource/context failures are errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HyperscatterError {
    #[error("dataset geometry {dataset:?} does not match renderer geometry {renderer:?}")]
    GeometryMismatch {
        dataset: crate::dataset::Geometry,
        renderer: crate::dataset::Geometry,
    },

    #[error("view state geometry {view:?} does not match renderer geometry {renderer:?}")]
    ViewGeometryMismatch {
        view: crate::dataset::Geometry,
        renderer: crate::dataset::Geometry,
    },

    #[error("dataset invariant violated: {0}")]
    InvalidDataset(String),

    #[error("lasso polyline must carry at least 3 vertices (6 flat coordinates), got {0}")]
    DegeneratePolyline(usize),

    #[error("surface could not provide a GPU context: {0}")]
    ContextAcquisition(String),

    #[error("palette of {requested} labels exceeds the platform/texture limit of {limit}")]
    PaletteTooLarge { requested: usize, limit: usize },

    #[error("invalid color string {0:?}; expected #rgb, #rrggbb, or #rrggbbaa")]
    InvalidColor(String),
}

pub type Result<T> = std::result::Result<T, HyperscatterError>;
