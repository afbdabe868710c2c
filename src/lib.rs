//! `hyperscatter`: an interactive large-N 2D scatterplot engine for
//! Euclidean and Poincaré-disk embeddings.
//!
//! The crate is a dispatch table, not a class hierarchy: one [`renderer::Renderer`]
//! trait, two geometry-agnostic implementations ([`renderer::reference::ReferenceRenderer`]
//! for CPU ground truth, [`renderer::candidate::CandidateRenderer`] for the GPU
//! point-sprite pipeline), driven either directly or through [`interaction::InteractionController`].
//! [`accuracy`] and [`perf`] hold the cross-implementation comparison and
//! latency-measurement harnesses used to keep the two renderers honest.

pub mod accuracy;
pub mod bitset;
pub mod count_selection;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod palette;
pub mod perf;
pub mod polygon;
pub mod renderer;
pub mod selection;
pub mod spatial_index;

pub use dataset::{Dataset, Geometry};
pub use error::{HyperscatterError, Result};
pub use geometry::ViewState;
pub use renderer::{HitResult, LodPolicy, Modifiers, Renderer, RendererOptions, Rgba};
pub use selection::Selection;
