//! The capability-set `Renderer` trait shared by [`reference::ReferenceRenderer`]
//! and [`candidate::CandidateRenderer`] (spec §6 "Renderer contract"). One
//! trait, two geometry-specialized implementations, no inheritance — the
//! "dispatch table, avoid deep class hierarchies" framing from spec §9.

pub mod candidate;
pub mod reference;

use std::sync::Arc;

use bitflags::bitflags;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::geometry::ViewState;
use crate::selection::Selection;

bitflags! {
    /// Modifier keys accompanying a pan/zoom gesture, grounded in the
    /// teacher's own `bitflags::bitflags!` use for packed render-pipeline
    /// flags (`downscale/pipeline.rs`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub index: u32,
    pub screen_x: f32,
    pub screen_y: f32,
    pub distance: f32,
}

/// Whether the candidate renderer's interaction-LOD subsample kicks in
/// (spec §4.5 "Interaction LOD" + Open Question decision recorded in
/// DESIGN.md: exposed as a policy rather than a hardwired heuristic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LodPolicy {
    #[default]
    Adaptive,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r, g, b, a }
    }
}

#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
    pub background_color: Rgba,
    pub point_radius_px: f32,
    pub poincare_disk_fill_color: Rgba,
    pub poincare_disk_border_color: Rgba,
    pub poincare_grid_color: Rgba,
    pub poincare_disk_border_width_px: f32,
    pub poincare_grid_width_px: f32,
    pub selection_color: Rgba,
}

impl Default for RendererOptions {
    fn default() -> Self {
        RendererOptions {
            width: 800,
            height: 600,
            device_pixel_ratio: 1.0,
            background_color: Rgba::new(0.06, 0.06, 0.08, 1.0),
            point_radius_px: 2.5,
            poincare_disk_fill_color: Rgba::new(0.10, 0.10, 0.14, 1.0),
            poincare_disk_border_color: Rgba::new(0.5, 0.5, 0.55, 1.0),
            poincare_grid_color: Rgba::new(0.3, 0.3, 0.35, 0.6),
            poincare_disk_border_width_px: 1.5,
            poincare_grid_width_px: 1.0,
            selection_color: Rgba::new(1.0, 0.78, 0.1, 1.0),
        }
    }
}

/// Geometry-agnostic renderer contract (spec §6). `start_pan` and
/// `end_interaction` carry default no-op bodies since they are "optional,
/// only meaningful for Poincaré" / "optional; resets interaction LOD".
pub trait Renderer {
    fn init(&mut self, opts: RendererOptions) -> Result<()>;
    fn set_dataset(&mut self, dataset: Arc<Dataset>) -> Result<()>;
    fn set_view(&mut self, view: ViewState) -> Result<()>;
    fn view(&self) -> ViewState;
    fn render(&mut self) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32);
    fn destroy(&mut self);
    fn set_selection(&mut self, selection: Selection);
    fn selection(&self) -> &Selection;
    fn set_hovered(&mut self, index: Option<u32>);
    fn hovered(&self) -> Option<u32>;
    fn pan(&mut self, dx: f32, dy: f32, modifiers: Modifiers);
    fn zoom(&mut self, anchor_x: f32, anchor_y: f32, delta: f32, modifiers: Modifiers);

    fn start_pan(&mut self, _x: f32, _y: f32) {}
    fn end_interaction(&mut self) {}

    fn hit_test(&self, sx: f32, sy: f32) -> Option<HitResult>;
    fn lasso_select(&self, polyline: &[f32]) -> Selection;

    fn project_to_screen(&self, x: f32, y: f32) -> (f32, f32);
    fn unproject_from_screen(&self, sx: f32, sy: f32) -> (f32, f32);
}

/// Unprojects a flat `[x0, y0, x1, y1, ...]` screen polyline into data
/// space using a renderer's own `unproject_from_screen`. Shared by both
/// renderer implementations' `lasso_select` so the predicate they build is
/// always the exact same polygon test (DESIGN.md: "one implementation of
/// this predicate in the whole crate").
pub(crate) fn unproject_polyline(
    renderer: &impl Renderer,
    polyline: &[f32],
) -> Vec<(f32, f32)> {
    polyline
        .chunks_exact(2)
        .map(|p| renderer.unproject_from_screen(p[0], p[1]))
        .collect()
}
