//! Performance/latency measurement harness (spec §4.8): drives a renderer
//! through the same operation shapes a real session exercises (dataset
//! generation, per-frame submit, hit-test, lasso + materialization, pan and
//! hover loops) and reports wall-clock timings plus deterministic allocation
//! sizes for the structures this crate controls exactly.
//!
//! "JS heap usage" has no Rust analogue: there is no GC heap to sample, and
//! whole-process RSS sampling would need a platform-specific allocator hook
//! the spec never asks for. Instead [`PerformanceReport::tracked_bytes`]
//! totals the renderer-owned structures this crate sizes exactly (spatial
//! index arrays, selection backing storage) — deterministic, no hook needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::count_selection::{CountSelectionStep, CountSelectionTask};
use crate::dataset::{synth, Dataset, Geometry};
use crate::error::Result;
use crate::geometry::ViewState;
use crate::renderer::{Modifiers, Renderer, RendererOptions};
use crate::selection::Selection;
use crate::spatial_index::SpatialIndex;

/// Number of synthetic cursor positions sampled for the hit-test timing
/// (spec §4.8 "over ~100 random screen positions").
const HIT_TEST_SAMPLE_COUNT: usize = 100;
/// Pan loop length (spec §4.8 "drive 60+ frames along a 5-keypoint loop").
const PAN_LOOP_FRAMES: usize = 60;
const PAN_KEYPOINT_COUNT: usize = 5;
/// Hover loop length; the spec leaves the exact frame count open, matched
/// to the pan loop's cadence (DESIGN.md).
const HOVER_LOOP_FRAMES: usize = 60;
/// Budget passed to each `countSelection` step (spec §5 "~8ms").
const COUNT_SELECTION_YIELD: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, Copy)]
pub struct PerformanceReport {
    pub geometry: Geometry,
    pub point_count: u32,
    pub dataset_generation_ms: f64,
    pub submit_frame_ms: f64,
    pub hit_test_ms: f64,
    pub lasso_ms: f64,
    pub pan_frame_interval_ms: f64,
    pub hover_frame_interval_ms: f64,
    pub tracked_bytes: usize,
}

impl PerformanceReport {
    /// `FPS` derived from the mean pan-frame interval, matching the spec's
    /// "actual rAF interval (derived FPS)" framing.
    pub fn derived_fps(&self) -> f64 {
        if self.pan_frame_interval_ms <= 0.0 {
            0.0
        } else {
            1000.0 / self.pan_frame_interval_ms
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Runs the fixed performance suite against `renderer`, already `init`ed by
/// the caller with the canvas size it should measure at. `renderer` must not
/// have a dataset set yet; this function owns dataset generation so its
/// timing is included in the report.
pub fn run_performance_harness(
    renderer: &mut dyn Renderer,
    geometry: Geometry,
    point_count: u32,
    label_count: u16,
    seed: u64,
    width: u32,
    height: u32,
) -> Result<PerformanceReport> {
    let gen_start = Instant::now();
    let dataset = Arc::new(synth::generate(point_count, geometry, seed, label_count)?);
    let dataset_generation_ms = elapsed_ms(gen_start);

    renderer.set_dataset(dataset.clone())?;
    let initial_view = fit_to_data(&dataset, geometry);
    renderer.set_view(initial_view)?;

    let submit_frame_ms = measure_submit(renderer);
    let hit_test_ms = measure_hit_test(renderer, &dataset, width, height, seed);
    let lasso_ms = measure_lasso(renderer, &dataset, width, height);
    let pan_frame_interval_ms = measure_pan_loop(renderer, width, height);
    let hover_frame_interval_ms = measure_hover_loop(renderer, width, height, seed);

    let spatial_index = SpatialIndex::build(&dataset);
    let tracked_bytes = spatial_index_byte_size(&spatial_index) + renderer.selection().tracked_bytes();

    Ok(PerformanceReport {
        geometry,
        point_count,
        dataset_generation_ms,
        submit_frame_ms,
        hit_test_ms,
        lasso_ms,
        pan_frame_interval_ms,
        hover_frame_interval_ms,
        tracked_bytes,
    })
}

fn fit_to_data(dataset: &Dataset, geometry: Geometry) -> ViewState {
    match geometry {
        Geometry::Euclidean => {
            let (cx, cy) = dataset.centroid();
            ViewState::euclidean(cx, cy, 1.0)
        }
        Geometry::Poincare => ViewState::default_for(geometry),
    }
}

/// "CPU submit time per frame": a single `render()` call. Renderers that
/// cannot acquire a context in this environment (the candidate without an
/// attached `wgpu::Device`) report `0.0` rather than failing the whole
/// harness — the remaining CPU-side metrics (hit-test, lasso, pan, hover)
/// are still meaningful without a GPU backend present.
fn measure_submit(renderer: &mut dyn Renderer) -> f64 {
    let start = Instant::now();
    match renderer.render() {
        Ok(()) => elapsed_ms(start),
        Err(_) => 0.0,
    }
}

fn measure_hit_test(renderer: &dyn Renderer, dataset: &Dataset, width: u32, height: u32, seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed ^ 0xA11CE);
    let n = dataset.n().max(1);
    let start = Instant::now();
    for _ in 0..HIT_TEST_SAMPLE_COUNT {
        let index = rng.gen_range(0..n);
        let (x, y) = dataset.point(index);
        let (sx, sy) = renderer.project_to_screen(x, y);
        let jitter_x = rng.gen_range(-3.0..3.0f32);
        let jitter_y = rng.gen_range(-3.0..3.0f32);
        let _ = renderer.hit_test(
            (sx + jitter_x).clamp(0.0, width as f32),
            (sy + jitter_y).clamp(0.0, height as f32),
        );
    }
    elapsed_ms(start) / HIT_TEST_SAMPLE_COUNT as f64
}

/// "lasso end-to-end time including exact-count materialization for
/// geometry selections" (spec §4.8): times `lassoSelect` plus running a
/// `countSelection` task to completion with a generous per-step budget, so
/// the reported number is the full synchronous-equivalent cost rather than
/// just the first yield.
fn measure_lasso(renderer: &dyn Renderer, dataset: &Dataset, width: u32, height: u32) -> f64 {
    let ratio = 0.4f32.sqrt();
    let hw = width as f32 * ratio / 2.0;
    let hh = height as f32 * ratio / 2.0;
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let polyline = vec![
        cx - hw, cy - hh,
        cx + hw, cy - hh,
        cx + hw, cy + hh,
        cx - hw, cy + hh,
    ];

    let start = Instant::now();
    let selection = renderer.lasso_select(&polyline);

    if let Selection::Geometry(geom) = &selection {
        let spatial_index = SpatialIndex::build(dataset);
        let mut task = CountSelectionTask::new(dataset, &spatial_index, geom);
        loop {
            match task.step(Duration::from_secs(1), &|| false) {
                CountSelectionStep::Done { .. } => break,
                CountSelectionStep::InProgress { .. } => continue,
            }
        }
    }
    elapsed_ms(start)
}

/// "drive 60+ frames along a 5-keypoint loop, deltas issued synchronously
/// frame by frame" (spec §4.8): visits `PAN_KEYPOINT_COUNT` screen-space
/// keypoints in a cycle, issuing one `pan()` delta per frame, and returns
/// the mean per-frame wall-clock interval.
fn measure_pan_loop(renderer: &mut dyn Renderer, width: u32, height: u32) -> f64 {
    let (w, h) = (width as f32, height as f32);
    let keypoints = [
        (w * 0.5, h * 0.5),
        (w * 0.3, h * 0.3),
        (w * 0.7, h * 0.3),
        (w * 0.7, h * 0.7),
        (w * 0.3, h * 0.7),
    ];
    debug_assert_eq!(keypoints.len(), PAN_KEYPOINT_COUNT);

    renderer.start_pan(keypoints[0].0, keypoints[0].1);
    let mut prev = keypoints[0];
    let start = Instant::now();
    for i in 0..PAN_LOOP_FRAMES {
        let (tx, ty) = keypoints[(i + 1) % PAN_KEYPOINT_COUNT];
        renderer.pan(tx - prev.0, ty - prev.1, Modifiers::empty());
        let _ = renderer.render();
        prev = (tx, ty);
    }
    renderer.end_interaction();
    elapsed_ms(start) / PAN_LOOP_FRAMES as f64
}

/// Circular mouse path hover timing (spec §4.8 "hover frame interval
/// (circular mouse path)").
fn measure_hover_loop(renderer: &mut dyn Renderer, width: u32, height: u32, seed: u64) -> f64 {
    let _ = seed;
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.min(height) as f32 * 0.3;
    let start = Instant::now();
    for i in 0..HOVER_LOOP_FRAMES {
        let theta = std::f32::consts::TAU * (i as f32) / HOVER_LOOP_FRAMES as f32;
        let sx = cx + radius * theta.cos();
        let sy = cy + radius * theta.sin();
        let hit = renderer.hit_test(sx, sy).map(|h| h.index);
        renderer.set_hovered(hit);
    }
    elapsed_ms(start) / HOVER_LOOP_FRAMES as f64
}

fn spatial_index_byte_size(index: &SpatialIndex) -> usize {
    index.byte_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::reference::ReferenceRenderer;

    #[test]
    fn harness_runs_end_to_end_on_euclidean_cpu_renderer() {
        let mut renderer = ReferenceRenderer::new(Geometry::Euclidean);
        renderer
            .init(RendererOptions { width: 400, height: 300, ..RendererOptions::default() })
            .unwrap();
        let report =
            run_performance_harness(&mut renderer, Geometry::Euclidean, 2_000, 8, 99, 400, 300).unwrap();

        assert_eq!(report.point_count, 2_000);
        assert!(report.dataset_generation_ms >= 0.0);
        assert!(report.submit_frame_ms >= 0.0);
        assert!(report.hit_test_ms >= 0.0);
        assert!(report.lasso_ms >= 0.0);
        assert!(report.pan_frame_interval_ms >= 0.0);
        assert!(report.hover_frame_interval_ms >= 0.0);
        assert!(report.tracked_bytes > 0);
        assert!(report.derived_fps() >= 0.0);
    }

    #[test]
    fn harness_runs_end_to_end_on_poincare_cpu_renderer() {
        let mut renderer = ReferenceRenderer::new(Geometry::Poincare);
        renderer
            .init(RendererOptions { width: 400, height: 300, ..RendererOptions::default() })
            .unwrap();
        let report =
            run_performance_harness(&mut renderer, Geometry::Poincare, 1_500, 6, 7, 400, 300).unwrap();
        assert_eq!(report.geometry, Geometry::Poincare);
        assert!(report.tracked_bytes > 0);
    }
}
