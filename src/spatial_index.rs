//! Static uniform grid over data-space positions (spec §4.2). Built once per
//! dataset and never mutated; hit-test and lasso prefiltering both walk it
//! through [`SpatialIndex::for_each_in_aabb`].

use crate::dataset::Dataset;
use crate::geometry::Aabb;

const TARGET_OCCUPANCY: f64 = 64.0;
const MIN_CELLS_PER_AXIS: u32 = 8;
const MAX_CELLS_PER_AXIS: u32 = 2048;
const QUERY_EPS: f32 = 1e-12;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    offsets: Box<[u32]>,
    ids: Box<[u32]>,
    bounds: Aabb,
    cells_x: u32,
    cells_y: u32,
}

impl SpatialIndex {
    /// Builds the grid from `dataset`'s positions. Cell count is chosen so
    /// average occupancy is about 64 points per cell, split across axes
    /// proportional to the bounds' aspect ratio and clamped to
    /// `[8, 2048]` per axis.
    pub fn build(dataset: &Dataset) -> Self {
        let bounds = dataset.bounds();
        let n = dataset.n() as usize;

        let width = (bounds.xmax - bounds.xmin) as f64;
        let height = (bounds.ymax - bounds.ymin) as f64;
        let aspect = if height > 0.0 { width / height } else { 1.0 };

        let target_total_cells = (n as f64 / TARGET_OCCUPANCY).max(1.0);
        let cells_x = ((target_total_cells * aspect).sqrt().round() as u32)
            .clamp(MIN_CELLS_PER_AXIS, MAX_CELLS_PER_AXIS);
        let cells_y = ((target_total_cells / aspect).sqrt().round() as u32)
            .clamp(MIN_CELLS_PER_AXIS, MAX_CELLS_PER_AXIS);

        let cell_count = (cells_x as usize) * (cells_y as usize);
        let mut counts = vec![0u32; cell_count + 1];

        let cell_of = |x: f32, y: f32| -> usize {
            cell_index(x, y, &bounds, cells_x, cells_y)
        };

        for i in 0..n as u32 {
            let (x, y) = dataset.point(i);
            counts[cell_of(x, y) + 1] += 1;
        }
        for c in 0..cell_count {
            counts[c + 1] += counts[c];
        }
        let offsets: Box<[u32]> = counts.into_boxed_slice();

        let mut cursor = offsets.clone();
        let mut ids = vec![0u32; n];
        for i in 0..n as u32 {
            let (x, y) = dataset.point(i);
            let c = cell_of(x, y);
            ids[cursor[c] as usize] = i;
            cursor[c] += 1;
        }

        SpatialIndex {
            offsets,
            ids: ids.into_boxed_slice(),
            bounds,
            cells_x,
            cells_y,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Bytes held by the two backing arrays, used by the performance
    /// harness's tracked-allocation reporting (spec §4.8 RUST ADAPTATION).
    pub fn byte_size(&self) -> usize {
        (self.offsets.len() + self.ids.len()) * std::mem::size_of::<u32>()
    }

    /// Visits every point index whose cell overlaps `aabb` (expanded by
    /// `1e-12`), in deterministic row-major cell order, without allocating.
    pub fn for_each_in_aabb(&self, aabb: Aabb, visit: impl FnMut(u32)) {
        let total = self.aabb_cell_ordinal_count(aabb);
        self.for_each_in_cell_ordinal_range(aabb, 0, total, visit);
    }

    fn cell_range(&self, aabb: Aabb) -> (u32, u32, u32, u32) {
        let expanded = aabb.expanded(QUERY_EPS);
        let (cx0, cy0) = cell_coords(expanded.xmin, expanded.ymin, &self.bounds, self.cells_x, self.cells_y);
        let (cx1, cy1) = cell_coords(expanded.xmax, expanded.ymax, &self.bounds, self.cells_x, self.cells_y);
        (cx0.min(cx1), cx0.max(cx1), cy0.min(cy1), cy0.max(cy1))
    }

    /// Number of cells overlapping `aabb` in [`for_each_in_cell_ordinal_range`](Self::for_each_in_cell_ordinal_range)'s
    /// ordinal space, used by [`crate::count_selection`] to spread a count
    /// across budgeted steps without walking the whole query twice.
    pub fn aabb_cell_ordinal_count(&self, aabb: Aabb) -> usize {
        let (x0, x1, y0, y1) = self.cell_range(aabb);
        ((x1 - x0 + 1) as usize) * ((y1 - y0 + 1) as usize)
    }

    /// Visits every point in cell ordinals `[start_ordinal, end_ordinal)` of
    /// `aabb`'s overlapping-cell rectangle, in the same deterministic order
    /// [`for_each_in_aabb`](Self::for_each_in_aabb) uses. A cursor over this
    /// ordinal space is how [`crate::count_selection::CountSelectionTask`]
    /// resumes an exact-count pass across several time budgets.
    pub fn for_each_in_cell_ordinal_range(
        &self,
        aabb: Aabb,
        start_ordinal: usize,
        end_ordinal: usize,
        mut visit: impl FnMut(u32),
    ) {
        let (x0, x1, y0, _y1) = self.cell_range(aabb);
        let width = (x1 - x0 + 1) as usize;
        for ordinal in start_ordinal..end_ordinal {
            let cy = y0 + (ordinal / width) as u32;
            let cx = x0 + (ordinal % width) as u32;
            let c = (cy * self.cells_x + cx) as usize;
            let start = self.offsets[c] as usize;
            let end = self.offsets[c + 1] as usize;
            for &id in &self.ids[start..end] {
                visit(id);
            }
        }
    }
}

fn cell_coords(x: f32, y: f32, bounds: &Aabb, cells_x: u32, cells_y: u32) -> (u32, u32) {
    let w = (bounds.xmax - bounds.xmin).max(f32::EPSILON);
    let h = (bounds.ymax - bounds.ymin).max(f32::EPSILON);
    let fx = ((x - bounds.xmin) / w * cells_x as f32).floor();
    let fy = ((y - bounds.ymin) / h * cells_y as f32).floor();
    let cx = (fx.max(0.0) as u32).min(cells_x - 1);
    let cy = (fy.max(0.0) as u32).min(cells_y - 1);
    (cx, cy)
}

fn cell_index(x: f32, y: f32, bounds: &Aabb, cells_x: u32, cells_y: u32) -> usize {
    let (cx, cy) = cell_coords(x, y, bounds, cells_x, cells_y);
    (cy * cells_x + cx) as usize
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

    #[test]
    fn finds_exact_point_via_tight_aabb() {
        let ds = grid_dataset(1000);
        let idx = SpatialIndex::build(&ds);
        let (px, py) = ds.point(500);
        let mut hits = Vec::new();
        idx.for_each_in_aabb(
            Aabb { xmin: px - 0.01, ymin: py - 0.01, xmax: px + 0.01, ymax: py + 0.01 },
            |i| hits.push(i),
        );
        assert!(hits.contains(&500));
    }

    #[test]
    fn full_bounds_query_visits_every_point_exactly_once() {
        let ds = grid_dataset(2000);
        let idx = SpatialIndex::build(&ds);
        let mut seen = vec![false; 2000];
        idx.for_each_in_aabb(idx.bounds(), |i| {
            assert!(!seen[i as usize], "point {i} visited twice");
            seen[i as usize] = true;
        });
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn empty_region_yields_no_visits() {
        let ds = grid_dataset(500);
        let idx = SpatialIndex::build(&ds);
        let bounds = idx.bounds();
        let mut count = 0;
        idx.for_each_in_aabb(
            Aabb {
                xmin: bounds.xmax + 100.0,
                ymin: bounds.ymax + 100.0,
                xmax: bounds.xmax + 101.0,
                ymax: bounds.ymax + 101.0,
            },
            |_| count += 1,
        );
        assert_eq!(count, 0);
    }

    #[test]
    fn cell_ordinal_range_matches_full_scan_when_split_in_half() {
        let ds = grid_dataset(2000);
        let idx = SpatialIndex::build(&ds);
        let bounds = idx.bounds();
        let total = idx.aabb_cell_ordinal_count(bounds);
        let mid = total / 2;

        let mut via_range = Vec::new();
        idx.for_each_in_cell_ordinal_range(bounds, 0, mid, |i| via_range.push(i));
        idx.for_each_in_cell_ordinal_range(bounds, mid, total, |i| via_range.push(i));

        let mut via_full = Vec::new();
        idx.for_each_in_aabb(bounds, |i| via_full.push(i));

        via_range.sort_unstable();
        via_full.sort_unstable();
        assert_eq!(via_range, via_full);
    }

    #[test]
    fn single_point_dataset_builds_without_panicking() {
        let ds = Dataset::new(vec![0.0, 0.0], vec![0], Geometry::Euclidean).unwrap();
        let idx = SpatialIndex::build(&ds);
        let mut hits = Vec::new();
        idx.for_each_in_aabb(idx.bounds(), |i| hits.push(i));
        assert_eq!(hits, vec![0]);
    }
}
