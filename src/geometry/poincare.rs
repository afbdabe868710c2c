//! Poincaré disk projection, unprojection, anchor-invariant pan, anchored
//! zoom, hyperbolic distance and the conservative hit-test radius bound
//! (spec §4.1). All complex arithmetic is (re, im) pairs of `f64`.

use super::view::{clamp_disk, ViewState, POINCARE_DISPLAY_ZOOM_MAX, POINCARE_DISPLAY_ZOOM_MIN};

type C = (f64, f64);

#[inline]
fn cmul(a: C, b: C) -> C {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

#[inline]
fn cconj(a: C) -> C {
    (a.0, -a.1)
}

#[inline]
fn cabs2(a: C) -> f64 {
    a.0 * a.0 + a.1 * a.1
}

/// Always normalizes `p` onto a circle of radius `limit`, picking an
/// arbitrary direction (along `p` itself, or +x if `p` is the origin) when
/// `p` has no well-defined direction. Used both for the denominator-near-zero
/// fallback and for "result landed on/outside the unit disk" clamping.
fn clamp_to_radius(p: C, limit: f64) -> C {
    let r = cabs2(p).sqrt();
    if r < 1e-12 {
        (limit, 0.0)
    } else {
        (p.0 / r * limit, p.1 / r * limit)
    }
}

fn clamp_if_outside(p: C, limit: f64) -> C {
    if cabs2(p) >= 1.0 {
        clamp_to_radius(p, limit)
    } else {
        p
    }
}

/// The Möbius disk automorphism `T_a(z) = (z - a) / (1 - conj(a)*z)`, or its
/// inverse `T_a^{-1}(w) = (w + a) / (1 + conj(a)*w)` when `inverse` is true.
/// Degenerate denominators and out-of-disk results are clamped radially to
/// 0.999 rather than allowed to diverge (spec §4.1 / §7).
pub fn mobius(a: C, z: C, inverse: bool) -> C {
    let conj_a = cconj(a);
    let cz = cmul(conj_a, z);
    let (num, denom): (C, C) = if inverse {
        ((z.0 + a.0, z.1 + a.1), (1.0 + cz.0, cz.1))
    } else {
        ((z.0 - a.0, z.1 - a.1), (1.0 - cz.0, -cz.1))
    };

    let denom_mag2 = cabs2(denom);
    if denom_mag2.sqrt() < 1e-12 {
        return clamp_to_radius(num, 0.999);
    }

    let r = cmul(num, cconj(denom));
    let result = (r.0 / denom_mag2, r.1 / denom_mag2);
    clamp_if_outside(result, 0.999)
}

/// `R = min(width, height) * 0.45 * displayZoom`.
#[inline]
pub fn disk_radius(width: f32, height: f32, display_zoom: f32) -> f32 {
    width.min(height) * 0.45 * display_zoom
}

fn ax_ay(view: &ViewState) -> (f64, f64) {
    match *view {
        ViewState::Poincare { ax, ay, .. } => (ax as f64, ay as f64),
        ViewState::Euclidean { .. } => panic!("poincare:: called with a Euclidean view"),
    }
}

fn display_zoom(view: &ViewState) -> f32 {
    match *view {
        ViewState::Poincare { display_zoom, .. } => display_zoom,
        ViewState::Euclidean { .. } => panic!("poincare:: called with a Euclidean view"),
    }
}

pub fn project(view: &ViewState, width: f32, height: f32, x: f32, y: f32) -> (f32, f32) {
    let a = ax_ay(view);
    let r = disk_radius(width, height, display_zoom(view)) as f64;
    let w = mobius(a, (x as f64, y as f64), false);
    let sx = width as f64 / 2.0 + w.0 * r;
    let sy = height as f64 / 2.0 - w.1 * r;
    (sx as f32, sy as f32)
}

pub fn unproject(view: &ViewState, width: f32, height: f32, sx: f32, sy: f32) -> (f32, f32) {
    let a = ax_ay(view);
    let r = disk_radius(width, height, display_zoom(view)) as f64;
    let wx = (sx as f64 - width as f64 / 2.0) / r;
    let wy = -(sy as f64 - height as f64 / 2.0) / r;
    let w = clamp_if_outside((wx, wy), 0.999);
    let p = mobius(a, w, true);
    (p.0 as f32, p.1 as f32)
}

/// Converts a screen position to disk coordinates for the pan solver,
/// clamped to radius 0.95 (spec: "convert both to disk coordinates d1, d2
/// (clamped to 0.95)" — a tighter clamp than the 0.999 used elsewhere,
/// since the pan solver is numerically sensitive near the boundary).
fn screen_to_disk_clamped(width: f32, height: f32, r: f64, sx: f32, sy: f32) -> C {
    let wx = (sx as f64 - width as f64 / 2.0) / r;
    let wy = -(sy as f64 - height as f64 / 2.0) / r;
    clamp_if_outside((wx, wy), 0.95).pipe_clamp95(wx, wy)
}

// Small helper trait so `screen_to_disk_clamped` reads as "clamp if the raw
// disk coordinate has magnitude >= 0.95", matching the other two clamp call
// sites' shape without duplicating the magnitude check.
trait Pipe95 {
    fn pipe_clamp95(self, raw_x: f64, raw_y: f64) -> C;
}
impl Pipe95 for C {
    fn pipe_clamp95(self, raw_x: f64, raw_y: f64) -> C {
        if cabs2((raw_x, raw_y)) >= 0.95 * 0.95 {
            clamp_to_radius((raw_x, raw_y), 0.95)
        } else {
            self
        }
    }
}

/// Anchor-invariant pan (spec §4.1): given a screen-space start and end
/// position, solves the 2x2 linear system (Cramer's rule) for the new `a`
/// that carries the data point previously under `start` to `end`.
pub fn pan(
    view: &ViewState,
    width: f32,
    height: f32,
    start_sx: f32,
    start_sy: f32,
    end_sx: f32,
    end_sy: f32,
) -> ViewState {
    let a = ax_ay(view);
    let r = disk_radius(width, height, display_zoom(view)) as f64;

    let d1 = screen_to_disk_clamped(width, height, r, start_sx, start_sy);
    let d2 = screen_to_disk_clamped(width, height, r, end_sx, end_sy);

    let p = mobius(a, d1, true);

    let big_a = d2.0 * p.0 - d2.1 * p.1;
    let big_b = d2.0 * p.1 + d2.1 * p.0;
    let det = big_a * big_a + big_b * big_b - 1.0;

    let new_a = if det.abs() < 1e-10 {
        (-d2.0, -d2.1)
    } else {
        let e = p.0 - d2.0;
        let f = d2.1 - p.1;
        let u = (-e * (1.0 + big_a) + big_b * f) / det;
        let v = ((1.0 - big_a) * f - e * big_b) / det;
        (u, v)
    };

    let (cax, cay) = clamp_disk(new_a.0, new_a.1, 0.99);
    ViewState::Poincare {
        ax: cax as f32,
        ay: cay as f32,
        display_zoom: display_zoom(view),
    }
}

/// Anchored zoom (spec §4.1): scales `displayZoom`, then re-pans (with the
/// same anchor-invariant solver as [`pan`]) if the anchor point drifted by
/// more than half a pixel under the new scale alone.
pub fn zoom(
    view: &ViewState,
    width: f32,
    height: f32,
    anchor_x: f32,
    anchor_y: f32,
    delta: f32,
) -> ViewState {
    let a = ax_ay(view);
    let old_zoom = display_zoom(view);
    let (anchor_data_x, anchor_data_y) = unproject(view, width, height, anchor_x, anchor_y);

    let new_display_zoom = (old_zoom as f64 * 1.1f64.powf(delta as f64))
        .clamp(POINCARE_DISPLAY_ZOOM_MIN, POINCARE_DISPLAY_ZOOM_MAX) as f32;

    let rescaled = ViewState::Poincare {
        ax: a.0 as f32,
        ay: a.1 as f32,
        display_zoom: new_display_zoom,
    };

    let (proj_x, proj_y) = project(&rescaled, width, height, anchor_data_x, anchor_data_y);
    let moved = ((proj_x - anchor_x).powi(2) + (proj_y - anchor_y).powi(2)).sqrt();

    if moved > 0.5 {
        pan(&rescaled, width, height, proj_x, proj_y, anchor_x, anchor_y)
    } else {
        rescaled
    }
}

/// `2 * atanh(|z1 - z2| / |1 - conj(z1)*z2|)`, ratio clamped to `1 - 1e-10`.
/// Reference/test-only: used by the accuracy harness, not the hot path.
pub fn hyperbolic_distance(z1: C, z2: C) -> f64 {
    let num = ((z1.0 - z2.0).powi(2) + (z1.1 - z2.1).powi(2)).sqrt();
    let conj_z1 = cconj(z1);
    let d = cmul(conj_z1, z2);
    let denom = ((1.0 - d.0).powi(2) + d.1.powi(2)).sqrt();
    let ratio = (num / denom).min(1.0 - 1e-10);
    2.0 * ratio.atanh()
}

/// Conservative data-space radius bounding a screen hit radius `r_screen`
/// at data point `z0` under Möbius translation `a` and disk radius `r_px`
/// (spec §4.1): iterates the fixed point
/// `r <- r_screen * (D0 + |a|*r)^2 / (R * (1 - |a|^2))` for 4-5 rounds,
/// where `D0 = |1 - conj(a)*z0|`, then applies a small safety margin.
pub fn conservative_hit_radius(a: C, z0: C, r_screen: f64, r_px: f64) -> f64 {
    let a_mag = cabs2(a).sqrt();
    let conj_a = cconj(a);
    let cz0 = cmul(conj_a, z0);
    let one_minus = (1.0 - cz0.0, -cz0.1);
    let d0 = cabs2(one_minus).sqrt();
    let denom_factor = r_px * (1.0 - a_mag * a_mag);

    let mut r = 0.0f64;
    for _ in 0..5 {
        r = r_screen * (d0 + a_mag * r).powi(2) / denom_factor;
    }
    (r * 1.001).min(1.999)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const W: f32 = 1200.0;
    const H: f32 = 800.0;

    #[test]
    fn round_trip_interior_points() {
        let v = ViewState::poincare(0.1, -0.2, 1.3);
        for &(x, y) in &[(0.0, 0.0), (0.3, 0.2), (-0.4, 0.1)] {
            let (sx, sy) = project(&v, W, H, x, y);
            let (ux, uy) = unproject(&v, W, H, sx, sy);
            assert_abs_diff_eq!(ux, x, epsilon = 1e-5);
            assert_abs_diff_eq!(uy, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn round_trip_near_boundary_relaxed_tolerance() {
        let v = ViewState::poincare(0.0, 0.0, 1.0);
        let (x, y) = (0.94, 0.0);
        let (sx, sy) = project(&v, W, H, x, y);
        let (ux, uy) = unproject(&v, W, H, sx, sy);
        assert!((ux - x).abs() < 1e-4);
        assert!((uy - y).abs() < 1e-4);
    }

    #[test]
    fn pan_round_trip_returns_near_origin() {
        let v0 = ViewState::poincare(0.0, 0.0, 1.0);
        let v1 = pan(&v0, W, H, 600.0, 400.0, 700.0, 400.0);
        let v2 = pan(&v1, W, H, 700.0, 400.0, 600.0, 400.0);
        if let ViewState::Poincare { ax, ay, .. } = v2 {
            assert!(ax.abs() < 1e-3, "ax = {ax}");
            assert!(ay.abs() < 1e-3, "ay = {ay}");
        } else {
            panic!("expected poincare view");
        }
    }

    #[test]
    fn pan_anchor_invariance() {
        let v0 = ViewState::poincare(0.0, 0.0, 1.0);
        let (ax, ay) = unproject(&v0, W, H, 400.0, 266.0);
        let v1 = pan(&v0, W, H, 400.0, 266.0, 600.0, 400.0);
        let (sx, sy) = project(&v1, W, H, ax, ay);
        assert_abs_diff_eq!(sx, 600.0, epsilon = 1e-3);
        assert_abs_diff_eq!(sy, 400.0, epsilon = 1e-3);
    }

    #[test]
    fn boundary_stress_stays_inside_disk() {
        let mut v = ViewState::poincare(0.0, 0.0, 1.0);
        for _ in 0..20 {
            v = pan(&v, W, H, 600.0, 400.0, 630.0, 400.0);
            if let ViewState::Poincare { ax, ay, .. } = v {
                assert!((ax * ax + ay * ay) < 1.0);
                let (ox, oy) = project(&v, W, H, 0.0, 0.0);
                assert!(ox.is_finite() && oy.is_finite());
            }
        }
    }

    #[test]
    fn zoom_clamped_to_range() {
        let v = ViewState::poincare(0.0, 0.0, 1.0);
        let v2 = zoom(&v, W, H, W / 2.0, H / 2.0, 1000.0);
        if let ViewState::Poincare { display_zoom, .. } = v2 {
            assert!(display_zoom <= 10.0);
        }
    }

    #[test]
    fn hyperbolic_distance_is_symmetric_and_nonnegative() {
        let d1 = hyperbolic_distance((0.1, 0.1), (-0.2, 0.3));
        let d2 = hyperbolic_distance((-0.2, 0.3), (0.1, 0.1));
        assert!((d1 - d2).abs() < 1e-9);
        assert!(d1 >= 0.0);
    }
}
