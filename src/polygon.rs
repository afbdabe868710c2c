//! Point-in-polygon ray casting with the on-boundary-counts-as-inside rule,
//! plus the pluggable lasso-stroke simplification trait (spec §4.3/§4.6).

use crate::error::{HyperscatterError, Result};

const BOUNDARY_TOL: f64 = 1e-9;

/// A lasso gesture with fewer than 6 flat coordinates (3 vertices) carries
/// no usable polygon and should be ignored by the caller rather than handed
/// to `lassoSelect` (spec §7 "degenerate polygon").
pub fn validate_polyline_len(flat_len: usize) -> Result<()> {
    if flat_len < 6 {
        Err(HyperscatterError::DegeneratePolyline(flat_len))
    } else {
        Ok(())
    }
}

/// Ray-cast point-in-polygon test. `polygon` is a flat list of vertices
/// (not required to repeat the first vertex at the end). A point lying on
/// any edge, within tolerance, counts as inside. Degenerate edges (vertex
/// pairs closer together than the tolerance) are treated as single points
/// and never toggle the inside flag, only ever contribute to the
/// on-boundary check.
pub fn point_in_polygon(x: f32, y: f32, polygon: &[(f32, f32)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let (px, py) = (x as f64, y as f64);
    let n = polygon.len();
    let mut inside = false;

    let mut j = n - 1;
    for i in 0..n {
        let (vix, viy) = (polygon[i].0 as f64, polygon[i].1 as f64);
        let (vjx, vjy) = (polygon[j].0 as f64, polygon[j].1 as f64);

        if point_on_segment(px, py, vjx, vjy, vix, viy) {
            return true;
        }

        let crosses = (viy > py) != (vjy > py);
        if crosses {
            let x_intersect = vjx + (py - vjy) / (viy - vjy) * (vix - vjx);
            if px < x_intersect {
                inside = !inside;
            }
        }

        j = i;
    }
    inside
}

/// Distance-to-segment test used for the boundary rule. Segments shorter
/// than the tolerance squared are treated as a single point.
fn point_on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;

    if len2 < BOUNDARY_TOL * BOUNDARY_TOL {
        let ddx = px - ax;
        let ddy = py - ay;
        return ddx * ddx + ddy * ddy < BOUNDARY_TOL * BOUNDARY_TOL;
    }

    let t = ((px - ax) * dx + (py - ay) * dy) / len2;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    let ddx = px - cx;
    let ddy = py - cy;
    ddx * ddx + ddy * ddy < BOUNDARY_TOL * BOUNDARY_TOL
}

/// A pluggable preprocessor reducing a raw lasso polyline down to at most
/// `max_vertices` points before it is handed to `lassoSelect` (spec §1/§4.6
/// frame smoothing as an external collaborator, not a hardwired step).
pub trait PolylineSimplifier {
    fn simplify(&self, points: &[(f32, f32)], max_vertices: usize) -> Vec<(f32, f32)>;
}

/// Chaikin corner-cutting followed by Ramer-Douglas-Peucker simplification,
/// with RDP tolerance scaled to the polyline's own bounding box (spec §4.6).
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaikinRdpSimplifier {
    pub chaikin_iterations: u32,
    pub rdp_tolerance_fraction: f32,
}

impl ChaikinRdpSimplifier {
    pub fn new() -> Self {
        ChaikinRdpSimplifier {
            chaikin_iterations: 2,
            rdp_tolerance_fraction: 0.01,
        }
    }
}

impl PolylineSimplifier for ChaikinRdpSimplifier {
    fn simplify(&self, points: &[(f32, f32)], max_vertices: usize) -> Vec<(f32, f32)> {
        if points.len() < 3 {
            return points.to_vec();
        }

        let mut pts = points.to_vec();
        for _ in 0..self.chaikin_iterations {
            pts = chaikin_pass(&pts);
            if pts.len() <= max_vertices {
                break;
            }
        }

        let tolerance = bbox_diagonal(&pts) * self.rdp_tolerance_fraction;
        let mut simplified = rdp(&pts, tolerance.max(1e-6));

        // RDP with a fixed tolerance does not guarantee a vertex budget;
        // widen the tolerance until it does, rather than silently
        // overrunning the frame's vertex cap.
        let mut widen = tolerance.max(1e-6);
        while simplified.len() > max_vertices && simplified.len() > 3 {
            widen *= 1.5;
            simplified = rdp(&pts, widen);
        }
        simplified
    }
}

fn bbox_diagonal(points: &[(f32, f32)]) -> f32 {
    let (mut xmin, mut ymin, mut xmax, mut ymax) = (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &(x, y) in points {
        xmin = xmin.min(x);
        ymin = ymin.min(y);
        xmax = xmax.max(x);
        ymax = ymax.max(y);
    }
    ((xmax - xmin).powi(2) + (ymax - ymin).powi(2)).sqrt()
}

fn chaikin_pass(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let n = points.len();
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        let p0 = points[i];
        let p1 = points[(i + 1) % n];
        out.push((
            0.75 * p0.0 + 0.25 * p1.0,
            0.75 * p0.1 + 0.25 * p1.1,
        ));
        out.push((
            0.25 * p0.0 + 0.75 * p1.0,
            0.25 * p0.1 + 0.75 * p1.1,
        ));
    }
    out
}

fn rdp(points: &[(f32, f32)], tolerance: f32) -> Vec<(f32, f32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut keep);
    points
        .iter()
        .zip(keep.iter())
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

fn rdp_recurse(points: &[(f32, f32)], start: usize, end: usize, tolerance: f32, keep: &mut [bool]) {
    if end <= start + 1 {
        return;
    }
    let (sx, sy) = points[start];
    let (ex, ey) = points[end];
    let mut max_dist = 0.0f32;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], (sx, sy), (ex, ey));
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }
    if max_dist > tolerance {
        keep[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, keep);
        rdp_recurse(points, max_idx, end, tolerance, keep);
    }
}

fn perpendicular_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    if len2 < f32::EPSILON {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    let num = (dy * p.0 - dx * p.1 + b.0 * a.1 - b.1 * a.0).abs();
    num / len2.sqrt()
}
