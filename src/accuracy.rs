//! Cross-implementation accuracy harness (spec §4.7): drives the reference
//! and candidate renderers side-by-side on identical operations and reports
//! per-operation pass/fail plus the largest observed error, so a regression
//! in the GPU pipeline's math shows up against the CPU ground truth instead
//! of only being caught visually.

use std::sync::Arc;
use std::time::Duration;

use crate::dataset::{Dataset, Geometry};
use crate::geometry::ViewState;
use crate::renderer::candidate::CandidateRenderer;
use crate::renderer::reference::ReferenceRenderer;
use crate::renderer::{Modifiers, Renderer, RendererOptions};
use crate::Result;

#[derive(Debug, Clone)]
pub struct OperationResult {
    pub name: &'static str,
    pub passed: bool,
    pub max_error: f64,
    pub detail: Option<String>,
}

impl OperationResult {
    fn new(name: &'static str, max_error: f64, tolerance: f64) -> Self {
        OperationResult {
            name,
            passed: max_error <= tolerance,
            max_error,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AccuracyReport {
    pub geometry: Geometry,
    pub operations: Vec<OperationResult>,
}

impl AccuracyReport {
    pub fn passed(&self) -> bool {
        self.operations.iter().all(|op| op.passed)
    }
}

const PROJECTION_TOLERANCE: f64 = 1e-6;
const NEAR_BOUNDARY_TOLERANCE: f64 = 1e-5;
const VIEW_TOLERANCE: f64 = 1e-10;
const EXTREME_ZOOM_TOLERANCE: f64 = 1e-9;

/// Runs the full fixed suite for one geometry against a shared dataset and
/// initial view, returning a report that passes iff every operation does.
pub fn run_accuracy_harness(geometry: Geometry, dataset: Arc<Dataset>, width: u32, height: u32) -> Result<AccuracyReport> {
    let opts = RendererOptions { width, height, ..RendererOptions::default() };
    let initial_view = ViewState::default_for(geometry);

    let mut reference = ReferenceRenderer::new(geometry);
    let mut candidate = CandidateRenderer::new(geometry);
    reference.init(opts.clone())?;
    candidate.init(opts.clone())?;
    reference.set_dataset(dataset.clone())?;
    candidate.set_dataset(dataset.clone())?;
    reference.set_view(initial_view)?;
    candidate.set_view(initial_view)?;

    let mut operations = vec![
        projection_operation(&reference, &candidate, &dataset),
        projection_round_trip_operation(&reference, &candidate, &dataset),
    ];
    if geometry == Geometry::Poincare {
        operations.push(near_boundary_operation(&reference, &candidate));
    }
    operations.push(pan_operation(&mut reference, &mut candidate, initial_view, width, height));
    operations.push(zoom_operation(&mut reference, &mut candidate, initial_view, width, height));
    operations.push(hit_test_operation(&reference, &candidate, &dataset));
    operations.push(lasso_operation(&reference, &candidate, &dataset, width, height));

    Ok(AccuracyReport { geometry, operations })
}

fn sample_indices(n: u32) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }
    let mut indices = vec![0, n / 4, n / 2, n - 1];
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn projection_operation(reference: &ReferenceRenderer, candidate: &CandidateRenderer, dataset: &Dataset) -> OperationResult {
    let mut max_error = 0.0f64;
    for i in sample_indices(dataset.n()) {
        let (x, y) = dataset.point(i);
        let (rx, ry) = reference.project_to_screen(x, y);
        let (cx, cy) = candidate.project_to_screen(x, y);
        max_error = max_error.max((rx - cx).abs() as f64).max((ry - cy).abs() as f64);
    }
    OperationResult::new("projection", max_error, PROJECTION_TOLERANCE)
}

fn projection_round_trip_operation(
    reference: &ReferenceRenderer,
    candidate: &CandidateRenderer,
    dataset: &Dataset,
) -> OperationResult {
    let mut max_error = 0.0f64;
    for i in sample_indices(dataset.n()) {
        let (x, y) = dataset.point(i);

        let (sx, sy) = reference.project_to_screen(x, y);
        let (rx, ry) = reference.unproject_from_screen(sx, sy);
        max_error = max_error.max((rx - x).abs() as f64).max((ry - y).abs() as f64);

        let (sx, sy) = candidate.project_to_screen(x, y);
        let (cx, cy) = candidate.unproject_from_screen(sx, sy);
        max_error = max_error.max((cx - x).abs() as f64).max((cy - y).abs() as f64);
    }
    OperationResult::new("projection_round_trip", max_error, PROJECTION_TOLERANCE)
}

fn near_boundary_operation(reference: &ReferenceRenderer, candidate: &CandidateRenderer) -> OperationResult {
    let radius = 0.95f64;
    let mut max_error = 0.0f64;
    for i in 0..12 {
        let theta = std::f64::consts::TAU * (i as f64) / 12.0;
        let x = (radius * theta.cos()) as f32;
        let y = (radius * theta.sin()) as f32;
        let (rx, ry) = reference.project_to_screen(x, y);
        let (cx, cy) = candidate.project_to_screen(x, y);
        max_error = max_error.max((rx - cx).abs() as f64).max((ry - cy).abs() as f64);
    }
    OperationResult::new("near_boundary_probes", max_error, NEAR_BOUNDARY_TOLERANCE)
}

fn view_distance(a: ViewState, b: ViewState) -> f64 {
    match (a, b) {
        (
            ViewState::Euclidean { center_x: ax, center_y: ay, zoom: az },
            ViewState::Euclidean { center_x: bx, center_y: by, zoom: bz },
        ) => ((ax - bx).abs() as f64).max((ay - by).abs() as f64).max((az - bz).abs() as f64),
        (
            ViewState::Poincare { ax, ay, display_zoom: az },
            ViewState::Poincare { ax: bx, ay: by, display_zoom: bz },
        ) => ((ax - bx).abs() as f64).max((ay - by).abs() as f64).max((az - bz).abs() as f64),
        _ => f64::INFINITY,
    }
}

fn pan_operation(
    reference: &mut ReferenceRenderer,
    candidate: &mut CandidateRenderer,
    initial_view: ViewState,
    width: u32,
    height: u32,
) -> OperationResult {
    reference.set_view(initial_view).expect("initial view matches geometry");
    candidate.set_view(initial_view).expect("initial view matches geometry");

    let start = (width as f32 / 2.0, height as f32 / 2.0);
    reference.start_pan(start.0, start.1);
    candidate.start_pan(start.0, start.1);

    let mut max_error = 0.0f64;
    for &(dx, dy) in &[(10.0, -5.0), (-3.0, 8.0), (0.5, 0.5)] {
        reference.pan(dx, dy, Modifiers::empty());
        candidate.pan(dx, dy, Modifiers::empty());
        max_error = max_error.max(view_distance(reference.view(), candidate.view()));
    }
    reference.end_interaction();
    candidate.end_interaction();

    OperationResult::new("pan", max_error, VIEW_TOLERANCE)
}

fn zoom_operation(
    reference: &mut ReferenceRenderer,
    candidate: &mut CandidateRenderer,
    initial_view: ViewState,
    width: u32,
    height: u32,
) -> OperationResult {
    reference.set_view(initial_view).expect("initial view matches geometry");
    candidate.set_view(initial_view).expect("initial view matches geometry");

    let anchor = (width as f32 * 0.3, height as f32 * 0.7);
    let mut max_error = 0.0f64;
    for &delta in &[1.0, -1.0, 2.5] {
        reference.zoom(anchor.0, anchor.1, delta, Modifiers::empty());
        candidate.zoom(anchor.0, anchor.1, delta, Modifiers::empty());
        max_error = max_error.max(view_distance(reference.view(), candidate.view()));
    }
    let tight = OperationResult::new("zoom", max_error, VIEW_TOLERANCE);
    if !tight.passed {
        return tight;
    }

    reference.set_view(initial_view).expect("initial view matches geometry");
    candidate.set_view(initial_view).expect("initial view matches geometry");
    let mut extreme_error = 0.0f64;
    for &delta in &[1000.0, -1000.0] {
        reference.zoom(anchor.0, anchor.1, delta, Modifiers::empty());
        candidate.zoom(anchor.0, anchor.1, delta, Modifiers::empty());
        extreme_error = extreme_error.max(view_distance(reference.view(), candidate.view()));
    }
    OperationResult::new("zoom_extreme_deltas", extreme_error, EXTREME_ZOOM_TOLERANCE)
}

fn hit_test_operation(reference: &ReferenceRenderer, candidate: &CandidateRenderer, dataset: &Dataset) -> OperationResult {
    let mut mismatches = 0usize;
    let mut checked = 0usize;
    for i in sample_indices(dataset.n()) {
        let (x, y) = dataset.point(i);
        let (sx, sy) = reference.project_to_screen(x, y);
        let r = reference.hit_test(sx, sy).map(|h| h.index);
        let c = candidate.hit_test(sx, sy).map(|h| h.index);
        checked += 1;
        if r != c {
            mismatches += 1;
        }
    }
    let max_error = if mismatches == 0 { 0.0 } else { 1.0 };
    OperationResult::new("hit_test", max_error, 0.0).with_detail(format!("{mismatches}/{checked} indices mismatched"))
}

fn lasso_operation(
    reference: &ReferenceRenderer,
    candidate: &CandidateRenderer,
    dataset: &Dataset,
    width: u32,
    height: u32,
) -> OperationResult {
    // A polygon covering ~40% of canvas area (spec §4.7 item 7): an
    // inscribed rectangle with side ratio sqrt(0.4).
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

    let reference_selection = reference.lasso_select(&polyline);
    let candidate_selection = candidate.lasso_select(&polyline);

    let mut mismatches = 0usize;
    for i in 0..dataset.n() {
        let (x, y) = dataset.point(i);
        let r = reference_selection.has(i, x, y);
        let c = candidate_selection.has(i, x, y);
        if r != c {
            mismatches += 1;
        }
    }
    let max_error = if mismatches == 0 { 0.0 } else { 1.0 };
    OperationResult::new("lasso", max_error, 0.0).with_detail(format!("{mismatches} point(s) disagreed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synth;

    #[test]
    fn euclidean_harness_passes_on_synthetic_data() {
        let dataset = Arc::new(synth::generate(5_000, Geometry::Euclidean, 42, 6).unwrap());
        let report = run_accuracy_harness(Geometry::Euclidean, dataset, 800, 600).unwrap();
        for op in &report.operations {
            assert!(op.passed, "{} failed: max_error={} detail={:?}", op.name, op.max_error, op.detail);
        }
        assert!(report.passed());
    }

    #[test]
    fn poincare_harness_passes_on_synthetic_data() {
        let dataset = Arc::new(synth::generate(5_000, Geometry::Poincare, 42, 6).unwrap());
        let report = run_accuracy_harness(Geometry::Poincare, dataset, 800, 600).unwrap();
        for op in &report.operations {
            assert!(op.passed, "{} failed: max_error={} detail={:?}", op.name, op.max_error, op.detail);
        }
        assert!(report.passed());
        assert!(report.operations.iter().any(|op| op.name == "near_boundary_probes"));
    }

    #[test]
    fn report_fails_when_any_operation_fails() {
        let report = AccuracyReport {
            geometry: Geometry::Euclidean,
            operations: vec![
                OperationResult::new("ok", 0.0, 1.0),
                OperationResult::new("broken", 5.0, 1.0),
            ],
        };
        assert!(!report.passed());
    }
}
