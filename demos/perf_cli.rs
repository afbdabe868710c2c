//! CLI driver for the performance harness (spec §4.8): runs the fixed
//! per-geometry, per-point-count measurement suite against both renderer
//! implementations and writes the results as CSV (grounded in the teacher's
//! own `csv::Writer`-based benchmark table dump).
//!
//! The candidate renderer needs a real `wgpu::Device`/`Queue` to measure
//! `submit_frame_ms` against the actual GPU pipeline rather than the
//! context-acquisition error path; since this binary has no window surface
//! to borrow one from, it requests a headless adapter itself (the offscreen
//! point-sprite pipeline never touches a swapchain, so a surface-less
//! adapter is sufficient). `request_adapter`/`request_device` are async
//! `wgpu` calls with no natural executor in a synchronous CLI `main`, so
//! `pollster::block_on` drives them to completion inline. If no adapter is
//! available in this environment, `submit_frame_ms` falls back to reading
//! `0` and every other column still measures real CPU-side work (hit-test,
//! lasso, pan, hover).

use std::error::Error;
use std::io;
use std::sync::Arc;

use hyperscatter::dataset::Geometry;
use hyperscatter::perf::run_performance_harness;
use hyperscatter::renderer::candidate::CandidateRenderer;
use hyperscatter::renderer::reference::ReferenceRenderer;
use hyperscatter::renderer::{Renderer, RendererOptions};

/// Blocks on a headless `wgpu` adapter/device request (no compatible
/// surface needed — the candidate renderer's pipeline is entirely
/// offscreen-texture based). Returns `None` if this environment has no
/// usable adapter, in which case callers leave the candidate renderer
/// without an attached device.
fn acquire_headless_gpu() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .ok()?;
        Some((Arc::new(device), Arc::new(queue)))
    })
}

const CANVAS_WIDTH: u32 = 1200;
const CANVAS_HEIGHT: u32 = 800;
const SEED: u64 = 42;
const LABEL_COUNT: u16 = 10;
const DEFAULT_POINT_COUNTS: &[u32] = &[10_000, 100_000, 1_000_000];

fn parse_point_counts() -> Vec<u32> {
    let args: Vec<u32> = std::env::args().skip(1).filter_map(|s| s.parse().ok()).collect();
    if args.is_empty() {
        DEFAULT_POINT_COUNTS.to_vec()
    } else {
        args
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let point_counts = parse_point_counts();
    let gpu = acquire_headless_gpu();
    if gpu.is_none() {
        tracing::warn!("no wgpu adapter available in this environment; candidate submit_frame_ms will read 0");
    }
    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record([
        "renderer",
        "geometry",
        "points",
        "dataset_generation_ms",
        "submit_frame_ms",
        "derived_fps",
        "hit_test_ms",
        "lasso_ms",
        "pan_frame_interval_ms",
        "hover_frame_interval_ms",
        "tracked_bytes",
    ])?;

    for &n in &point_counts {
        for geometry in [Geometry::Euclidean, Geometry::Poincare] {
            run_one("reference", &mut ReferenceRenderer::new(geometry), geometry, n, &mut wtr);

            let mut candidate = CandidateRenderer::new(geometry);
            if let Some((device, queue)) = &gpu {
                candidate.attach_gpu(device.clone(), queue.clone());
            }
            run_one("candidate", &mut candidate, geometry, n, &mut wtr);
        }
    }

    wtr.flush()?;
    Ok(())
}

fn run_one(
    label: &str,
    renderer: &mut dyn Renderer,
    geometry: Geometry,
    point_count: u32,
    wtr: &mut csv::Writer<io::Stdout>,
) {
    let opts = RendererOptions { width: CANVAS_WIDTH, height: CANVAS_HEIGHT, ..RendererOptions::default() };
    if let Err(err) = renderer.init(opts) {
        tracing::error!(%label, ?geometry, %err, "renderer init failed");
        return;
    }

    match run_performance_harness(renderer, geometry, point_count, LABEL_COUNT, SEED, CANVAS_WIDTH, CANVAS_HEIGHT) {
        Ok(report) => {
            let _ = wtr.write_record([
                label.to_string(),
                format!("{geometry:?}"),
                report.point_count.to_string(),
                format!("{:.4}", report.dataset_generation_ms),
                format!("{:.4}", report.submit_frame_ms),
                format!("{:.2}", report.derived_fps()),
                format!("{:.5}", report.hit_test_ms),
                format!("{:.4}", report.lasso_ms),
                format!("{:.4}", report.pan_frame_interval_ms),
                format!("{:.4}", report.hover_frame_interval_ms),
                report.tracked_bytes.to_string(),
            ]);
        }
        Err(err) => {
            tracing::error!(%label, ?geometry, points = point_count, %err, "performance harness failed");
        }
    }
}
