//! Selection results as a tagged sum of an indices variant and a geometry
//! (lasso-polygon) variant, both exposing the same [`SelectionView`] trait
//! (spec §3/§9's "tagged sum, never materialize eagerly" framing).

use crate::bitset::BitsetSet;
use crate::geometry::Aabb;
use crate::polygon::point_in_polygon;

/// Cardinality above which an indices selection switches to the
/// bitset-backed representation (spec §4.2/§9).
pub const BITSET_THRESHOLD: usize = 2_000_000;

pub trait SelectionView {
    fn has(&self, index: u32) -> bool;
    /// `None` when the size has not been materialized yet (e.g. a geometry
    /// selection before `countSelection` has run to completion).
    fn size(&self) -> Option<usize>;
    fn compute_time_ms(&self) -> f64;
}

/// Index-set-backed selection. Below [`BITSET_THRESHOLD`] this is a sorted
/// `Vec<u32>` checked via binary search; at or above it, a [`BitsetSet`].
#[derive(Debug, Clone)]
pub enum IndexSet {
    Small(Vec<u32>),
    Bitset(BitsetSet),
}

impl IndexSet {
    pub fn from_indices(mut indices: Vec<u32>, dataset_len: usize) -> Self {
        if indices.len() >= BITSET_THRESHOLD {
            let mut bitset = BitsetSet::with_capacity(dataset_len);
            for i in &indices {
                bitset.add(*i);
            }
            IndexSet::Bitset(bitset)
        } else {
            indices.sort_unstable();
            indices.dedup();
            IndexSet::Small(indices)
        }
    }

    pub fn has(&self, index: u32) -> bool {
        match self {
            IndexSet::Small(v) => v.binary_search(&index).is_ok(),
            IndexSet::Bitset(b) => b.has(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexSet::Small(v) => v.len(),
            IndexSet::Bitset(b) => b.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ascending iteration over selected indices, used by the candidate
    /// renderer's selection-overlay instance buffer (spec §4.5 "Overlays").
    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexSet::Small(v) => Box::new(v.iter().copied()),
            IndexSet::Bitset(b) => Box::new(b.iter()),
        }
    }

    /// Bytes held by the backing storage, used by the performance harness's
    /// allocation-size reporting (spec §4.8 RUST ADAPTATION).
    pub fn byte_size(&self) -> usize {
        match self {
            IndexSet::Small(v) => v.capacity() * std::mem::size_of::<u32>(),
            IndexSet::Bitset(b) => b.byte_size(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicesSelection {
    pub indices: IndexSet,
    pub compute_time_ms: f64,
}

impl SelectionView for IndicesSelection {
    fn has(&self, index: u32) -> bool {
        self.indices.has(index)
    }
    fn size(&self) -> Option<usize> {
        Some(self.indices.len())
    }
    fn compute_time_ms(&self) -> f64 {
        self.compute_time_ms
    }
}

/// A lasso-selection predicate: `has(i)` is `bounds.contains(p) &&
/// point_in_polygon(p, polygon)` — never eagerly materialized (spec §9:
/// a 40%-area lasso over 2x10^7 points could select millions).
#[derive(Debug, Clone)]
pub struct GeometrySelection {
    pub polygon: Vec<(f32, f32)>,
    pub bounds: Aabb,
    pub compute_time_ms: f64,
    /// Filled in once `countSelection` materializes the exact count.
    pub materialized_count: Option<usize>,
}

impl GeometrySelection {
    pub fn new(polygon: Vec<(f32, f32)>, compute_time_ms: f64) -> Self {
        let bounds = Aabb::of_points(polygon.iter().copied()).unwrap_or(Aabb {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 0.0,
            ymax: 0.0,
        });
        GeometrySelection {
            polygon,
            bounds,
            compute_time_ms,
            materialized_count: None,
        }
    }

    /// Visible to [`crate::count_selection`], which walks the spatial index
    /// directly rather than through [`Selection::has`].
    pub(crate) fn has_point(&self, x: f32, y: f32) -> bool {
        self.bounds.contains(x, y) && point_in_polygon(x, y, &self.polygon)
    }
}

impl SelectionView for GeometrySelection {
    fn has(&self, _index: u32) -> bool {
        // A geometry selection's membership test needs the point's
        // coordinates, not just its index; use `Selection::has` instead,
        // which dispatches to `has_point` for this variant.
        false
    }
    fn size(&self) -> Option<usize> {
        self.materialized_count
    }
    fn compute_time_ms(&self) -> f64 {
        self.compute_time_ms
    }
}

#[derive(Debug, Clone)]
pub enum Selection {
    Indices(IndicesSelection),
    Geometry(GeometrySelection),
}

impl Selection {
    /// Membership test against a dataset point. Geometry selections use the
    /// polygon predicate directly; indices selections ignore `x, y`.
    pub fn has(&self, index: u32, x: f32, y: f32) -> bool {
        match self {
            Selection::Indices(s) => s.has(index),
            Selection::Geometry(g) => g.has_point(x, y),
        }
    }

    pub fn size(&self) -> Option<usize> {
        match self {
            Selection::Indices(s) => s.size(),
            Selection::Geometry(g) => g.size(),
        }
    }

    pub fn compute_time_ms(&self) -> f64 {
        match self {
            Selection::Indices(s) => s.compute_time_ms(),
            Selection::Geometry(g) => g.compute_time_ms(),
        }
    }

    /// Bytes held by this selection's own backing storage (the polygon copy
    /// for a geometry selection, the index/bitset buffer for an indices
    /// selection), used by the performance harness's tracked-allocation
    /// reporting (spec §4.8 RUST ADAPTATION).
    pub fn tracked_bytes(&self) -> usize {
        match self {
            Selection::Indices(s) => s.indices.byte_size(),
            Selection::Geometry(g) => g.polygon.capacity() * std::mem::size_of::<(f32, f32)>(),
        }
    }
}
