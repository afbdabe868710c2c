//! The GPU point-sprite `Renderer` implementation (spec §4.5). Ties the pure
//! policy math in [`policy`] to the `wgpu` plumbing in [`gpu`]: this module
//! owns geometry-agnostic state (dataset, spatial index, view, selection,
//! hover, adaptive-quality state) and delegates every actual draw call to
//! [`gpu::GpuState`].

pub mod gpu;
pub mod policy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dataset::{Dataset, Geometry};
use crate::error::{HyperscatterError, Result};
use crate::geometry::{euclidean, poincare, Aabb, ViewState};
use crate::palette::Palette;
use crate::polygon::validate_polyline_len;
use crate::renderer::{HitResult, LodPolicy, Modifiers, Renderer, RendererOptions};
use crate::selection::{GeometrySelection, Selection};
use crate::spatial_index::SpatialIndex;

use gpu::{BackdropKey, GpuState, PointInstance};

/// Extra margin added to a point's drawn radius before it counts as "hit"
/// (spec §4.4/§4.5 "accept if within (r+5)^2").
const HIT_MARGIN_PX: f32 = 5.0;

pub struct CandidateRenderer {
    geometry: Geometry,
    options: RendererOptions,
    width: u32,
    height: u32,

    dataset: Option<Arc<Dataset>>,
    spatial_index: Option<SpatialIndex>,
    view: ViewState,
    selection: Selection,
    hovered: Option<u32>,
    palette: Palette,
    lod_policy: LodPolicy,

    device: Option<Arc<wgpu::Device>>,
    queue: Option<Arc<wgpu::Queue>>,
    gpu: Option<GpuState>,

    base_points: Vec<PointInstance>,
    lod_points: Vec<PointInstance>,
    base_dirty: bool,
    palette_dirty: bool,

    shape_policy: policy::ShapePolicyState,
    last_view_change: Instant,
    pan_anchor: Option<(f32, f32)>,
}

impl CandidateRenderer {
    pub fn new(geometry: Geometry) -> Self {
        CandidateRenderer {
            geometry,
            options: RendererOptions::default(),
            width: 0,
            height: 0,
            dataset: None,
            spatial_index: None,
            view: ViewState::default_for(geometry),
            selection: empty_selection(),
            hovered: None,
            palette: Palette::default_categorical(),
            lod_policy: LodPolicy::default(),
            device: None,
            queue: None,
            gpu: None,
            base_points: Vec::new(),
            lod_points: Vec::new(),
            base_dirty: false,
            palette_dirty: true,
            shape_policy: policy::ShapePolicyState::default(),
            last_view_change: Instant::now(),
            pan_anchor: None,
        }
    }

    /// Supplies the host-owned GPU device/queue this renderer draws with
    /// (spec §4.5 RUST GPU BACKEND: "the host owns the window/surface").
    /// Pipeline/texture creation itself stays lazy until the first
    /// `render()` call, per spec's "context acquisition... not on init".
    pub fn attach_gpu(&mut self, device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) {
        self.device = Some(device);
        self.queue = Some(queue);
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.palette_dirty = true;
    }

    pub fn set_lod_policy(&mut self, policy: LodPolicy) {
        self.lod_policy = policy;
    }

    /// The fully-composited output texture from the last `render()` call,
    /// for a host to read back or sample into its own swapchain pass.
    pub fn output_texture(&self) -> Option<&wgpu::Texture> {
        self.gpu.as_ref().and_then(|g| g.output_texture())
    }

    fn mark_view_changed(&mut self) {
        self.last_view_change = Instant::now();
    }

    fn ms_since_last_view_change(&self) -> f64 {
        self.last_view_change.elapsed().as_secs_f64() * 1000.0
    }

    fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        match self.geometry {
            Geometry::Euclidean => euclidean::project(&self.view, w, h, x, y),
            Geometry::Poincare => poincare::project(&self.view, w, h, x, y),
        }
    }

    fn unproject(&self, sx: f32, sy: f32) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        match self.geometry {
            Geometry::Euclidean => euclidean::unproject(&self.view, w, h, sx, sy),
            Geometry::Poincare => poincare::unproject(&self.view, w, h, sx, sy),
        }
    }

    fn disk_radius(&self) -> f32 {
        let ViewState::Poincare { display_zoom, .. } = self.view else {
            return 0.0;
        };
        poincare::disk_radius(self.width as f32, self.height as f32, display_zoom)
    }

    /// Rebuilds `base_points`/`lod_points` from the dataset's full CPU-side
    /// positions (spec §4.5 "Upload policy" / "Interaction LOD" — CPU-side
    /// semantics always see the full dataset; only these GPU draw sets are
    /// subsampled).
    fn rebuild_instance_sets(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            self.base_points.clear();
            self.lod_points.clear();
            return;
        };
        let n = dataset.n();

        self.base_points = match policy::upload_stride(n) {
            None => (0..n).map(|i| point_instance(dataset, i)).collect(),
            Some(stride) => (0..n)
                .step_by(stride.max(1) as usize)
                .map(|i| point_instance(dataset, i))
                .collect(),
        };

        self.lod_points = match policy::lod_stride(n) {
            None => Vec::new(),
            Some(stride) => (0..n)
                .step_by(stride.max(1) as usize)
                .map(|i| point_instance(dataset, i))
                .collect(),
        };
    }

    /// Lazily constructs `self.gpu` on first use (spec §4.5 "context
    /// acquisition: lazy on first render, not on init"). Returns `()` rather
    /// than `&mut GpuState` so callers borrow `self.gpu` directly afterwards
    /// and keep that borrow disjoint from the rest of `self`'s fields.
    fn ensure_gpu(&mut self) -> Result<()> {
        if self.gpu.is_none() {
            let device = self
                .device
                .clone()
                .ok_or_else(|| HyperscatterError::ContextAcquisition("no wgpu::Device attached".into()))?;
            let queue = self
                .queue
                .clone()
                .ok_or_else(|| HyperscatterError::ContextAcquisition("no wgpu::Queue attached".into()))?;
            self.gpu = Some(GpuState::new(device, queue));
        }
        Ok(())
    }

    /// Builds the (capped) overlay instance lists for the current selection
    /// and hover state. Returns `(selection_points, hover_point)`.
    fn build_overlay_instances(&self) -> (Vec<PointInstance>, Option<PointInstance>) {
        let mut selection_points = Vec::new();
        if let Some(dataset) = self.dataset.as_ref() {
            match &self.selection {
                Selection::Indices(indices) => {
                    for i in indices.indices.iter().take(policy::OVERLAY_CAP as usize) {
                        if i < dataset.n() {
                            selection_points.push(point_instance(dataset, i));
                        }
                    }
                }
                Selection::Geometry(geo) => {
                    if let Some(index) = self.spatial_index.as_ref() {
                        let mut count = 0usize;
                        index.for_each_in_aabb(geo.bounds, |i| {
                            if count >= policy::OVERLAY_CAP as usize {
                                return;
                            }
                            let (x, y) = dataset.point(i);
                            if self.selection.has(i, x, y) {
                                selection_points.push(point_instance(dataset, i));
                                count += 1;
                            }
                        });
                    }
                }
            }

            let hover_point = self
                .hovered
                .filter(|&h| h < dataset.n())
                .map(|h| point_instance(dataset, h));
            return (selection_points, hover_point);
        }
        (selection_points, None)
    }
}

fn point_instance(dataset: &Dataset, i: u32) -> PointInstance {
    let (x, y) = dataset.point(i);
    PointInstance {
        pos: [x, y],
        label: dataset.label(i) as u32,
    }
}

fn empty_selection() -> Selection {
    use crate::selection::{IndexSet, IndicesSelection};
    Selection::Indices(IndicesSelection {
        indices: IndexSet::from_indices(Vec::new(), 0),
        compute_time_ms: 0.0,
    })
}

impl Renderer for CandidateRenderer {
    fn init(&mut self, opts: RendererOptions) -> Result<()> {
        self.width = opts.width;
        self.height = opts.height;
        self.palette_dirty = true;
        self.options = opts;
        Ok(())
    }

    fn set_dataset(&mut self, dataset: Arc<Dataset>) -> Result<()> {
        if dataset.geometry() != self.geometry {
            return Err(HyperscatterError::GeometryMismatch {
                dataset: dataset.geometry(),
                renderer: self.geometry,
            });
        }
        self.spatial_index = Some(SpatialIndex::build(&dataset));
        self.dataset = Some(dataset);
        self.selection = empty_selection();
        self.hovered = None;
        self.base_dirty = true;
        self.rebuild_instance_sets();
        Ok(())
    }

    fn set_view(&mut self, view: ViewState) -> Result<()> {
        if view.geometry() != self.geometry {
            return Err(HyperscatterError::ViewGeometryMismatch {
                view: view.geometry(),
                renderer: self.geometry,
            });
        }
        self.view = view;
        self.mark_view_changed();
        Ok(())
    }

    fn view(&self) -> ViewState {
        self.view
    }

    fn render(&mut self) -> Result<()> {
        let n = self.dataset.as_ref().map(|d| d.n()).unwrap_or(0);
        let is_poincare = self.geometry == Geometry::Poincare;
        let ms_since = self.ms_since_last_view_change();

        let draw_lod = match self.lod_policy {
            LodPolicy::Always => !self.lod_points.is_empty(),
            LodPolicy::Never => false,
            LodPolicy::Adaptive => {
                !self.lod_points.is_empty() && policy::use_interaction_lod(n, is_poincare, ms_since)
            }
        };
        let interacting = ms_since < policy::INTERACTION_STABLE_WINDOW_MS;
        let draw_count = if draw_lod { self.lod_points.len() as u32 } else { self.base_points.len() as u32 };

        let device_dpr = self.options.device_pixel_ratio as f64;
        let points_dpr = policy::adaptive_points_dpr(
            device_dpr,
            self.width as f64,
            self.height as f64,
            n,
            draw_count,
            self.options.point_radius_px as f64,
        );
        self.shape_policy
            .update(draw_count, self.options.point_radius_px as f64, points_dpr);

        let (selection_points, hover_point) = self.build_overlay_instances();

        self.ensure_gpu()?;
        let gpu = self.gpu.as_mut().expect("ensure_gpu just ran");

        if self.base_dirty {
            gpu.upload_base_points(&self.base_points);
            gpu.upload_lod_points(&self.lod_points);
            self.base_dirty = false;
        }
        if self.palette_dirty {
            gpu.upload_palette(&self.palette.as_rgba_bytes(), self.palette.len().max(1) as u32);
            self.palette_dirty = false;
        }

        if interacting {
            gpu.upload_selection_points(&[]);
            gpu.upload_hover_point(None);
        } else {
            gpu.upload_selection_points(&selection_points);
            gpu.upload_hover_point(hover_point);
        }

        gpu.write_view_uniform(&self.view, self.width as f32, self.height as f32, points_dpr as f32, self.options.point_radius_px);

        let points_width = ((self.width as f64) * points_dpr).round().max(1.0) as u32;
        let points_height = ((self.height as f64) * points_dpr).round().max(1.0) as u32;
        let output_width = ((self.width as f64) * device_dpr).round().max(1.0) as u32;
        let output_height = ((self.height as f64) * device_dpr).round().max(1.0) as u32;

        let backdrop_key = if is_poincare {
            let ViewState::Poincare { display_zoom, .. } = self.view else {
                unreachable!()
            };
            Some(BackdropKey {
                width: output_width,
                height: output_height,
                dpr_bits: (device_dpr as f32).to_bits(),
                display_zoom_bits: display_zoom.to_bits(),
            })
        } else {
            None
        };

        gpu.render_frame(
            &self.options,
            points_width,
            points_height,
            output_width,
            output_height,
            is_poincare,
            backdrop_key,
            draw_lod,
            !interacting,
            self.shape_policy.squares,
        );

        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn destroy(&mut self) {
        self.gpu = None;
        self.dataset = None;
        self.spatial_index = None;
        self.base_points.clear();
        self.lod_points.clear();
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn set_hovered(&mut self, index: Option<u32>) {
        self.hovered = index;
    }

    fn hovered(&self) -> Option<u32> {
        self.hovered
    }

    fn pan(&mut self, dx: f32, dy: f32, _modifiers: Modifiers) {
        let (w, h) = (self.width as f32, self.height as f32);
        self.view = match self.geometry {
            Geometry::Euclidean => euclidean::pan(&self.view, w, h, dx, dy),
            Geometry::Poincare => {
                let (start_x, start_y) = self.pan_anchor.unwrap_or((w / 2.0, h / 2.0));
                let new_view = poincare::pan(&self.view, w, h, start_x, start_y, start_x + dx, start_y + dy);
                self.pan_anchor = Some((start_x + dx, start_y + dy));
                new_view
            }
        };
        self.mark_view_changed();
    }

    fn zoom(&mut self, anchor_x: f32, anchor_y: f32, delta: f32, _modifiers: Modifiers) {
        let (w, h) = (self.width as f32, self.height as f32);
        self.view = match self.geometry {
            Geometry::Euclidean => euclidean::zoom(&self.view, w, h, anchor_x, anchor_y, delta),
            Geometry::Poincare => poincare::zoom(&self.view, w, h, anchor_x, anchor_y, delta),
        };
        self.mark_view_changed();
    }

    fn start_pan(&mut self, x: f32, y: f32) {
        self.pan_anchor = Some((x, y));
    }

    fn end_interaction(&mut self) {
        self.pan_anchor = None;
        // Push the clock back past the stable window so the very next
        // frame uses the non-LOD pipeline immediately (spec §4.5
        // `endInteraction()` hook).
        self.last_view_change = Instant::now()
            - Duration::from_millis(policy::INTERACTION_STABLE_WINDOW_MS as u64 + 1);
    }

    fn hit_test(&self, sx: f32, sy: f32) -> Option<HitResult> {
        let dataset = self.dataset.as_ref()?;
        let index = self.spatial_index.as_ref()?;
        let accept_radius = self.options.point_radius_px + HIT_MARGIN_PX;
        let accept_radius2 = accept_radius * accept_radius;

        let query_aabb = match self.geometry {
            Geometry::Euclidean => {
                let ViewState::Euclidean { zoom, .. } = self.view else { unreachable!() };
                let s = euclidean::scale(self.width as f32, self.height as f32, zoom);
                let (dx, dy) = self.unproject(sx, sy);
                let r = (accept_radius + 1e-3) / s;
                Aabb { xmin: dx - r, ymin: dy - r, xmax: dx + r, ymax: dy + r }
            }
            Geometry::Poincare => {
                let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
                let r_px = self.disk_radius();
                if (sx - cx).powi(2) + (sy - cy).powi(2) > (r_px + accept_radius).powi(2) {
                    return None;
                }
                let ViewState::Poincare { ax, ay, .. } = self.view else { unreachable!() };
                let (dx, dy) = self.unproject(sx, sy);
                let r = poincare::conservative_hit_radius(
                    (ax as f64, ay as f64),
                    (dx as f64, dy as f64),
                    accept_radius as f64,
                    r_px as f64,
                );
                let r = r as f32;
                Aabb { xmin: dx - r, ymin: dy - r, xmax: dx + r, ymax: dy + r }
            }
        };

        let mut best: Option<HitResult> = None;
        index.for_each_in_aabb(query_aabb, |i| {
            let (x, y) = dataset.point(i);
            if self.geometry == Geometry::Poincare && x * x + y * y >= 1.0 {
                return;
            }
            let (px, py) = self.project(x, y);
            let d2 = (px - sx).powi(2) + (py - sy).powi(2);
            if d2 <= accept_radius2 {
                let better = match &best {
                    None => true,
                    Some(b) => d2 < b.distance * b.distance || (d2 == b.distance * b.distance && i < b.index),
                };
                if better {
                    best = Some(HitResult { index: i, screen_x: px, screen_y: py, distance: d2.sqrt() });
                }
            }
        });
        best
    }

    fn lasso_select(&self, polyline: &[f32]) -> Selection {
        if validate_polyline_len(polyline.len()).is_err() {
            return empty_selection();
        }
        let start = Instant::now();
        let data_polygon: Vec<(f32, f32)> = polyline
            .chunks_exact(2)
            .map(|p| self.unproject(p[0], p[1]))
            .collect();
        let compute_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        Selection::Geometry(GeometrySelection::new(data_polygon, compute_time_ms))
    }

    fn project_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        self.project(x, y)
    }

    fn unproject_from_screen(&self, sx: f32, sy: f32) -> (f32, f32) {
        self.unproject(sx, sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synth;

    fn sized_renderer(geometry: Geometry) -> CandidateRenderer {
        let mut r = CandidateRenderer::new(geometry);
        r.init(RendererOptions { width: 640, height: 480, ..RendererOptions::default() }).unwrap();
        r
    }

    #[test]
    fn rejects_mismatched_dataset_geometry() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(10, Geometry::Poincare, 1, 2).unwrap());
        assert!(r.set_dataset(ds).is_err());
    }

    #[test]
    fn without_gpu_render_fails_with_context_acquisition_error() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(10, Geometry::Euclidean, 1, 2).unwrap());
        r.set_dataset(ds).unwrap();
        let err = r.render().unwrap_err();
        assert!(matches!(err, HyperscatterError::ContextAcquisition(_)));
    }

    #[test]
    fn hit_test_finds_exact_point_without_gpu() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(300, Geometry::Euclidean, 11, 3).unwrap());
        r.set_dataset(ds.clone()).unwrap();
        let (x, y) = ds.point(42);
        let (sx, sy) = r.project_to_screen(x, y);
        let hit = r.hit_test(sx, sy).unwrap();
        assert_eq!(hit.index, 42);
    }

    #[test]
    fn lasso_select_returns_geometry_variant() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(100, Geometry::Euclidean, 2, 3).unwrap());
        r.set_dataset(ds).unwrap();
        let polyline = vec![0.0, 0.0, 640.0, 0.0, 640.0, 480.0, 0.0, 480.0];
        let sel = r.lasso_select(&polyline);
        assert!(matches!(sel, Selection::Geometry(_)));
    }

    #[test]
    fn instance_sets_subsample_large_datasets() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(600_000, Geometry::Euclidean, 5, 4).unwrap());
        r.set_dataset(ds).unwrap();
        assert_eq!(r.base_points.len(), 600_000);
        assert!(!r.lod_points.is_empty());
        assert!(r.lod_points.len() < r.base_points.len());
    }
}
