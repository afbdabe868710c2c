//! CPU rasterizer renderer: the ground truth the candidate (GPU) renderer
//! is checked against by the accuracy harness (spec §4.4).
//!
//! Backed by `tiny-skia`, the CPU raster dependency carried in from
//! `Ameyanagi-ruviz` since the teacher itself is 100% GPU and has no 2D
//! pixel-buffer backend to reuse (DESIGN.md).

use std::sync::Arc;

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::dataset::{Dataset, Geometry};
use crate::error::{HyperscatterError, Result};
use crate::geometry::{euclidean, poincare, ViewState};
use crate::palette::Palette;
use crate::polygon::{point_in_polygon, validate_polyline_len};
use crate::renderer::{HitResult, Modifiers, Renderer, RendererOptions, Rgba};
use crate::selection::{IndexSet, IndicesSelection, Selection};

const RADIAL_GEODESIC_COUNT: usize = 8;
const CONCENTRIC_CIRCLE_COUNT: usize = 5;

fn to_skia_color(c: Rgba) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(c.r, c.g, c.b, c.a).unwrap_or(tiny_skia::Color::BLACK)
}

pub struct ReferenceRenderer {
    geometry: Geometry,
    options: RendererOptions,
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
    dataset: Option<Arc<Dataset>>,
    view: ViewState,
    selection: Selection,
    hovered: Option<u32>,
    palette: Palette,
    pan_anchor: Option<(f32, f32)>,
}

impl ReferenceRenderer {
    pub fn new(geometry: Geometry) -> Self {
        ReferenceRenderer {
            geometry,
            options: RendererOptions::default(),
            width: 0,
            height: 0,
            pixmap: None,
            dataset: None,
            view: ViewState::default_for(geometry),
            selection: empty_selection(),
            hovered: None,
            palette: Palette::default_categorical(),
            pan_anchor: None,
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    fn ensure_pixmap(&mut self) -> Result<()> {
        let pw = ((self.width as f32) * self.options.device_pixel_ratio).round().max(1.0) as u32;
        let ph = ((self.height as f32) * self.options.device_pixel_ratio).round().max(1.0) as u32;
        if self
            .pixmap
            .as_ref()
            .map(|p| p.width() != pw || p.height() != ph)
            .unwrap_or(true)
        {
            self.pixmap = Some(
                Pixmap::new(pw, ph)
                    .ok_or_else(|| HyperscatterError::ContextAcquisition("zero-sized pixmap".into()))?,
            );
        }
        Ok(())
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

    /// Rebuilds the rasterizer transform from scratch every frame — the
    /// direct analogue of the spec's mandatory "reset transform to
    /// identity, then scale by dpr": a persisted transform field is exactly
    /// the bug spec §9 warns about.
    fn frame_transform(&self) -> Transform {
        Transform::from_scale(self.options.device_pixel_ratio, self.options.device_pixel_ratio)
    }

    fn fill_circle(pixmap: &mut Pixmap, cx: f32, cy: f32, r: f32, color: tiny_skia::Color, transform: Transform) {
        if r <= 0.0 {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(cx, cy, r) {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = true;
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
    }

    fn stroke_circle(pixmap: &mut Pixmap, cx: f32, cy: f32, r: f32, width: f32, color: tiny_skia::Color, transform: Transform) {
        if r <= 0.0 {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(cx, cy, r) {
            let mut paint = Paint::default();
            paint.set_color(color);
            paint.anti_alias = true;
            let stroke = Stroke {
                width,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    fn draw_poincare_backdrop(&self, pixmap: &mut Pixmap, transform: Transform) {
        let (w, h) = (self.width as f32, self.height as f32);
        let (cx, cy) = (w / 2.0, h / 2.0);
        let r = self.disk_radius();

        Self::fill_circle(
            pixmap,
            cx,
            cy,
            r,
            to_skia_color(self.options.poincare_disk_fill_color),
            transform,
        );
        Self::stroke_circle(
            pixmap,
            cx,
            cy,
            r,
            self.options.poincare_disk_border_width_px,
            to_skia_color(self.options.poincare_disk_border_color),
            transform,
        );

        for i in 1..=CONCENTRIC_CIRCLE_COUNT {
            let ring_r = r * (i as f32) / (CONCENTRIC_CIRCLE_COUNT as f32 + 1.0);
            Self::stroke_circle(
                pixmap,
                cx,
                cy,
                ring_r,
                self.options.poincare_grid_width_px,
                to_skia_color(self.options.poincare_grid_color),
                transform,
            );
        }

        let mut pb = PathBuilder::new();
        for i in 0..RADIAL_GEODESIC_COUNT {
            let theta = (i as f32) / (RADIAL_GEODESIC_COUNT as f32) * std::f32::consts::TAU;
            pb.move_to(cx, cy);
            pb.line_to(cx + theta.cos() * r, cy - theta.sin() * r);
        }
        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color(to_skia_color(self.options.poincare_grid_color));
            paint.anti_alias = true;
            let stroke = Stroke {
                width: self.options.poincare_grid_width_px,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }
}

fn empty_selection() -> Selection {
    Selection::Indices(IndicesSelection {
        indices: IndexSet::from_indices(Vec::new(), 0),
        compute_time_ms: 0.0,
    })
}

impl Renderer for ReferenceRenderer {
    fn init(&mut self, opts: RendererOptions) -> Result<()> {
        self.width = opts.width;
        self.height = opts.height;
        self.options = opts;
        self.ensure_pixmap()
    }

    fn set_dataset(&mut self, dataset: Arc<Dataset>) -> Result<()> {
        if dataset.geometry() != self.geometry {
            return Err(HyperscatterError::GeometryMismatch {
                dataset: dataset.geometry(),
                renderer: self.geometry,
            });
        }
        self.dataset = Some(dataset);
        self.selection = empty_selection();
        self.hovered = None;
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
        Ok(())
    }

    fn view(&self) -> ViewState {
        self.view
    }

    fn render(&mut self) -> Result<()> {
        self.ensure_pixmap()?;
        let transform = self.frame_transform();
        let r = self.options.point_radius_px;

        let Some(dataset) = self.dataset.clone() else {
            return Ok(());
        };

        // `draw_poincare_backdrop` and the per-point projection helpers
        // both borrow `self` immutably, so the pixmap is taken out for the
        // duration of drawing and put back at the end.
        let mut pixmap = self.pixmap.take().expect("ensure_pixmap just ran");
        pixmap.fill(to_skia_color(self.options.background_color));

        if self.geometry == Geometry::Poincare {
            self.draw_poincare_backdrop(&mut pixmap, transform);
        }

        for i in 0..dataset.n() {
            let (x, y) = dataset.point(i);
            let (sx, sy) = self.project(x, y);
            let is_selected = self.selection.has(i, x, y);
            if is_selected || Some(i) == self.hovered {
                continue;
            }
            let color = to_skia_color(label_rgba(&self.palette, dataset.label(i)));
            Self::fill_circle(&mut pixmap, sx, sy, r, color, transform);
        }

        for i in 0..dataset.n() {
            let (x, y) = dataset.point(i);
            if Some(i) == self.hovered {
                continue;
            }
            if self.selection.has(i, x, y) {
                let (sx, sy) = self.project(x, y);
                Self::fill_circle(&mut pixmap, sx, sy, r + 1.0, to_skia_color(self.options.selection_color), transform);
            }
        }

        if let Some(h) = self.hovered {
            if h < dataset.n() {
                let (x, y) = dataset.point(h);
                let (sx, sy) = self.project(x, y);
                let fill_color = if self.selection.has(h, x, y) {
                    self.options.selection_color
                } else {
                    label_rgba(&self.palette, dataset.label(h))
                };
                Self::stroke_circle(&mut pixmap, sx, sy, r + 3.0, 2.0, to_skia_color(Rgba::new(1.0, 1.0, 1.0, 1.0)), transform);
                Self::fill_circle(&mut pixmap, sx, sy, r + 1.0, to_skia_color(fill_color), transform);
            }
        }

        self.pixmap = Some(pixmap);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let _ = self.ensure_pixmap();
    }

    fn destroy(&mut self) {
        self.pixmap = None;
        self.dataset = None;
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
                // Mirrors the candidate renderer's accumulating anchor
                // (DESIGN.md): without it, consecutive `pan` calls between
                // a single `start_pan`/`end_interaction` pair would each
                // re-solve from canvas center instead of from the drag's
                // actual last position, diverging from the candidate
                // renderer's math under the same input sequence.
                let (start_x, start_y) = self.pan_anchor.unwrap_or((w / 2.0, h / 2.0));
                let new_view = poincare::pan(&self.view, w, h, start_x, start_y, start_x + dx, start_y + dy);
                self.pan_anchor = Some((start_x + dx, start_y + dy));
                new_view
            }
        };
    }

    fn zoom(&mut self, anchor_x: f32, anchor_y: f32, delta: f32, _modifiers: Modifiers) {
        let (w, h) = (self.width as f32, self.height as f32);
        self.view = match self.geometry {
            Geometry::Euclidean => euclidean::zoom(&self.view, w, h, anchor_x, anchor_y, delta),
            Geometry::Poincare => poincare::zoom(&self.view, w, h, anchor_x, anchor_y, delta),
        };
    }

    fn start_pan(&mut self, x: f32, y: f32) {
        self.pan_anchor = Some((x, y));
    }

    fn end_interaction(&mut self) {
        self.pan_anchor = None;
    }

    fn hit_test(&self, sx: f32, sy: f32) -> Option<HitResult> {
        let dataset = self.dataset.as_ref()?;
        let accept_radius2 = (self.options.point_radius_px + 5.0).powi(2);

        if self.geometry == Geometry::Poincare {
            let (cx, cy) = (self.width as f32 / 2.0, self.height as f32 / 2.0);
            let r = self.disk_radius();
            if (sx - cx).powi(2) + (sy - cy).powi(2) > r * r {
                return None;
            }
        }

        let mut best: Option<HitResult> = None;
        for i in 0..dataset.n() {
            let (x, y) = dataset.point(i);
            let (px, py) = self.project(x, y);

            if self.geometry == Geometry::Poincare && x * x + y * y >= 1.0 {
                continue;
            }

            let d2 = (px - sx).powi(2) + (py - sy).powi(2);
            if d2 <= accept_radius2 {
                let better = match &best {
                    None => true,
                    Some(b) => d2 < b.distance.powi(2) || (d2 == b.distance.powi(2) && i < b.index),
                };
                if better {
                    best = Some(HitResult {
                        index: i,
                        screen_x: px,
                        screen_y: py,
                        distance: d2.sqrt(),
                    });
                }
            }
        }
        best
    }

    fn lasso_select(&self, polyline: &[f32]) -> Selection {
        if validate_polyline_len(polyline.len()).is_err() {
            return empty_selection();
        }
        let Some(dataset) = self.dataset.as_ref() else {
            return empty_selection();
        };

        let data_polygon: Vec<(f32, f32)> = polyline
            .chunks_exact(2)
            .map(|p| self.unproject(p[0], p[1]))
            .collect();

        let mut indices = Vec::new();
        for i in 0..dataset.n() {
            let (x, y) = dataset.point(i);
            if point_in_polygon(x, y, &data_polygon) {
                indices.push(i);
            }
        }

        Selection::Indices(IndicesSelection {
            indices: IndexSet::from_indices(indices, dataset.n() as usize),
            compute_time_ms: 0.0,
        })
    }

    fn project_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        self.project(x, y)
    }

    fn unproject_from_screen(&self, sx: f32, sy: f32) -> (f32, f32) {
        self.unproject(sx, sy)
    }
}

fn label_rgba(palette: &Palette, label: u16) -> Rgba {
    let c = palette.color_for_label(label);
    Rgba::new(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synth;

    fn sized_renderer(geometry: Geometry) -> ReferenceRenderer {
        let mut r = ReferenceRenderer::new(geometry);
        r.init(RendererOptions {
            width: 640,
            height: 480,
            ..RendererOptions::default()
        })
        .unwrap();
        r
    }

    #[test]
    fn rejects_mismatched_dataset_geometry() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(10, Geometry::Poincare, 1, 2).unwrap());
        assert!(r.set_dataset(ds).is_err());
    }

    #[test]
    fn hit_test_finds_exact_point() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = synth::generate(200, Geometry::Euclidean, 11, 3).unwrap();
        let ds = Arc::new(ds);
        r.set_dataset(ds.clone()).unwrap();
        let (x, y) = ds.point(50);
        let (sx, sy) = r.project_to_screen(x, y);
        let hit = r.hit_test(sx, sy).unwrap();
        assert_eq!(hit.index, 50);
    }

    #[test]
    fn lasso_select_matches_point_in_polygon() {
        let mut r = sized_renderer(Geometry::Euclidean);
        let ds = Arc::new(synth::generate(500, Geometry::Euclidean, 3, 4).unwrap());
        r.set_dataset(ds.clone()).unwrap();

        // A huge screen-space box that should capture everything near origin.
        let polyline = vec![0.0, 0.0, 640.0, 0.0, 640.0, 480.0, 0.0, 480.0];
        let sel = r.lasso_select(&polyline);
        assert!(sel.size().unwrap_or(0) > 0);
    }

    #[test]
    fn render_does_not_panic_without_dataset() {
        let mut r = sized_renderer(Geometry::Poincare);
        assert!(r.render().is_ok());
    }
}
