//! Resumable exact-count materialization for lasso (geometry) selections
//! (spec §5 "countSelection"). Deliberately not a [`crate::renderer::Renderer`]
//! method: both renderer implementations hand it the same
//! [`crate::spatial_index::SpatialIndex`] and get back the same count, so
//! there is exactly one counting implementation in the crate to keep honest.
//!
//! No async runtime is introduced here: pulling in an executor purely for a
//! cooperative counter would be generic machinery this domain doesn't need.
//! `step` is the literal, thread-free realization of "yield via an
//! animation-frame await every ~8ms" for a host that supplies its own frame
//! clock instead of a browser's (spec §5 "RUST REALIZATION OF
//! `countSelection`"), called from the same pull model as
//! [`crate::interaction::InteractionController::tick`].

use std::time::{Duration, Instant};

use crate::dataset::Dataset;
use crate::geometry::Aabb;
use crate::selection::GeometrySelection;
use crate::spatial_index::SpatialIndex;

/// Cells processed per cancellation/budget check. Large enough that the
/// check overhead is negligible, small enough that a single check interval
/// never dominates a short budget on a sparse grid.
const CELLS_PER_BUDGET_CHECK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSelectionStep {
    InProgress { partial: usize },
    Done { count: usize },
}

/// A paused, resumable exact count of how many dataset points fall inside a
/// [`GeometrySelection`]'s polygon.
pub struct CountSelectionTask<'a> {
    dataset: &'a Dataset,
    spatial_index: &'a SpatialIndex,
    polygon: Vec<(f32, f32)>,
    bounds: Aabb,
    total_cells: usize,
    cursor: usize,
    count: usize,
}

impl<'a> CountSelectionTask<'a> {
    /// `spatial_index` and `selection` must come from the same dataset as
    /// `dataset` itself.
    pub fn new(dataset: &'a Dataset, spatial_index: &'a SpatialIndex, selection: &GeometrySelection) -> Self {
        CountSelectionTask {
            dataset,
            spatial_index,
            polygon: selection.polygon.clone(),
            bounds: selection.bounds,
            total_cells: spatial_index.aabb_cell_ordinal_count(selection.bounds),
            cursor: 0,
            count: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.total_cells
    }

    /// Count so far, valid whether or not the task has finished.
    pub fn partial_count(&self) -> usize {
        self.count
    }

    /// Advances the scan until `budget` elapses, `should_cancel` returns
    /// `true`, or every candidate cell has been visited. Safe to call again
    /// on a task that already reported [`CountSelectionStep::Done`]: it
    /// just immediately returns the same count.
    pub fn step(&mut self, budget: Duration, should_cancel: &dyn Fn() -> bool) -> CountSelectionStep {
        let started = Instant::now();
        let bounds = self.bounds;
        while self.cursor < self.total_cells {
            let chunk_end = (self.cursor + CELLS_PER_BUDGET_CHECK).min(self.total_cells);
            let mut count = self.count;
            let dataset = self.dataset;
            let polygon = &self.polygon;
            self.spatial_index
                .for_each_in_cell_ordinal_range(bounds, self.cursor, chunk_end, |i| {
                    let (x, y) = dataset.point(i);
                    if bounds.contains(x, y) && crate::polygon::point_in_polygon(x, y, polygon) {
                        count += 1;
                    }
                });
            self.count = count;
            self.cursor = chunk_end;

            if should_cancel() {
                return CountSelectionStep::InProgress { partial: self.count };
            }
            if started.elapsed() >= budget {
                return CountSelectionStep::InProgress { partial: self.count };
            }
        }
        CountSelectionStep::Done { count: self.count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Geometry;

    fn grid_dataset(n: u32) -> Dataset {
        let side = (n as f32).sqrt().ceil() as u32;
        let mut positions = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let x = (i % side) as f32;
            let y = (i / side) as f32;
            positions.push(x);
            positions.push(y);
            labels.push(0u16);
        }
        Dataset::new(positions, labels, Geometry::Euclidean).unwrap()
    }

    fn square_selection(xmax: f32, ymax: f32) -> GeometrySelection {
        GeometrySelection::new(vec![(0.0, 0.0), (xmax, 0.0), (xmax, ymax), (0.0, ymax)], 0.0)
    }

    #[test]
    fn single_step_with_generous_budget_completes_immediately() {
        let ds = grid_dataset(4000);
        let idx = SpatialIndex::build(&ds);
        let selection = square_selection(1000.0, 1000.0);
        let mut task = CountSelectionTask::new(&ds, &idx, &selection);

        let step = task.step(Duration::from_secs(5), &|| false);
        assert!(matches!(step, CountSelectionStep::Done { .. }));
    }

    #[test]
    fn zero_budget_still_makes_progress_across_multiple_steps() {
        let ds = grid_dataset(20_000);
        let idx = SpatialIndex::build(&ds);
        let selection = square_selection(1000.0, 1000.0);
        let mut task = CountSelectionTask::new(&ds, &idx, &selection);

        let mut steps = 0;
        loop {
            let step = task.step(Duration::from_nanos(1), &|| false);
            steps += 1;
            if let CountSelectionStep::Done { .. } = step {
                break;
            }
            assert!(steps < 1_000_000, "task never finished");
        }
        assert!(steps > 1, "zero-duration budget should force multiple steps");
    }

    #[test]
    fn cancellation_stops_early_with_partial_count() {
        let ds = grid_dataset(20_000);
        let idx = SpatialIndex::build(&ds);
        let selection = square_selection(1000.0, 1000.0);
        let mut task = CountSelectionTask::new(&ds, &idx, &selection);

        let step = task.step(Duration::from_secs(5), &|| true);
        assert!(matches!(step, CountSelectionStep::InProgress { .. }));
        assert!(!task.is_done());
    }

    #[test]
    fn count_matches_a_brute_force_scan() {
        let ds = grid_dataset(4000);
        let idx = SpatialIndex::build(&ds);
        let selection = square_selection(30.0, 20.0);
        let mut task = CountSelectionTask::new(&ds, &idx, &selection);

        let CountSelectionStep::Done { count } = task.step(Duration::from_secs(5), &|| false) else {
            panic!("expected task to complete");
        };

        let mut expected = 0;
        for i in 0..ds.n() {
            let (x, y) = ds.point(i);
            if selection.has_point(x, y) {
                expected += 1;
            }
        }
        assert_eq!(count, expected);
    }
}
