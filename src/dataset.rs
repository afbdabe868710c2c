//! The dataset glue type: immutable once constructed, shared by reference
//! between the reference/candidate renderers (spec §3, §9 ownership note).

use std::sync::Arc;

use crate::error::{HyperscatterError, Result};

pub mod synth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    Euclidean,
    Poincare,
}

/// Flat, interleaved 2D positions plus per-point labels. `positions.len()`
/// is always `2 * n`; `labels.len()` is always `n`. For [`Geometry::Poincare`]
/// every point satisfies `x*x + y*y < 1`.
#[derive(Debug, Clone)]
pub struct Dataset {
    n: u32,
    positions: Arc<[f32]>,
    labels: Arc<[u16]>,
    geometry: Geometry,
}

impl Dataset {
    /// Validates spec §3's invariants before construction. `positions` must
    /// be exactly `2 * labels.len()` long; Poincaré points must lie strictly
    /// inside the open unit disk.
    pub fn new(positions: Vec<f32>, labels: Vec<u16>, geometry: Geometry) -> Result<Self> {
        let n = labels.len();
        if positions.len() != 2 * n {
            return Err(HyperscatterError::InvalidDataset(format!(
                "positions.len() = {} but expected 2 * labels.len() = {}",
                positions.len(),
                2 * n
            )));
        }
        if geometry == Geometry::Poincare {
            for i in 0..n {
                let x = positions[2 * i] as f64;
                let y = positions[2 * i + 1] as f64;
                if x * x + y * y >= 1.0 {
                    return Err(HyperscatterError::InvalidDataset(format!(
                        "point {i} at ({x}, {y}) is not strictly inside the open unit disk"
                    )));
                }
            }
        }
        Ok(Dataset {
            n: n as u32,
            positions: positions.into(),
            labels: labels.into(),
            geometry,
        })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    #[inline]
    pub fn point(&self, index: u32) -> (f32, f32) {
        let i = index as usize;
        (self.positions[2 * i], self.positions[2 * i + 1])
    }

    #[inline]
    pub fn label(&self, index: u32) -> u16 {
        self.labels[index as usize]
    }

    /// Axis-aligned bounds of `positions`, with degenerate axes (all points
    /// sharing an x or y coordinate) expanded by 1 so the spatial index
    /// never divides by a zero-width axis (spec §3).
    pub fn bounds(&self) -> crate::geometry::Aabb {
        let mut xmin = f32::INFINITY;
        let mut ymin = f32::INFINITY;
        let mut xmax = f32::NEG_INFINITY;
        let mut ymax = f32::NEG_INFINITY;
        for i in 0..self.n as usize {
            let x = self.positions[2 * i];
            let y = self.positions[2 * i + 1];
            xmin = xmin.min(x);
            ymin = ymin.min(y);
            xmax = xmax.max(x);
            ymax = ymax.max(y);
        }
        if self.n == 0 {
            xmin = -1.0;
            ymin = -1.0;
            xmax = 1.0;
            ymax = 1.0;
        }
        if xmax - xmin < f32::EPSILON {
            xmin -= 1.0;
            xmax += 1.0;
        }
        if ymax - ymin < f32::EPSILON {
            ymin -= 1.0;
            ymax += 1.0;
        }
        crate::geometry::Aabb {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Centroid of `positions`, used by the Euclidean fit-to-data scenario
    /// (spec §8).
    pub fn centroid(&self) -> (f32, f32) {
        if self.n == 0 {
            return (0.0, 0.0);
        }
        let mut sx = 0.0f64;
        let mut sy = 0.0f64;
        for i in 0..self.n as usize {
            sx += self.positions[2 * i] as f64;
            sy += self.positions[2 * i + 1] as f64;
        }
        let n = self.n as f64;
        ((sx / n) as f32, (sy / n) as f32)
    }
}
