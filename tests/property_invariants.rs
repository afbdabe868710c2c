//! Property-based exercises of the spec §8 "universal quantified invariants"
//! (projection round-trip, pan/zoom anchor invariance, Poincaré boundary
//! containment) over randomly generated views and screen positions, rather
//! than the fixed example inputs `tests/contract.rs` and the per-module unit
//! tests use. Grounded in the pack's own `core-render` scheduler property
//! tests (`proptest! { #[test] fn name(args in strategy) { ... } }`), the
//! closest example-repo precedent for this `proptest!` macro shape.

use hyperscatter::geometry::{euclidean, poincare, ViewState};
use proptest::prelude::*;

const W: f32 = 1200.0;
const H: f32 = 800.0;

proptest! {
    /// Spec §8 item 1: `unproject(project(x, y)) ≈ (x, y)` within 1e-6 data
    /// units, for any reachable Euclidean view and any in-range data point.
    #[test]
    fn euclidean_projection_round_trip(
        cx in -50.0f32..50.0,
        cy in -50.0f32..50.0,
        zoom in 0.1f32..100.0,
        x in -50.0f32..50.0,
        y in -50.0f32..50.0,
    ) {
        let v = ViewState::euclidean(cx, cy, zoom);
        let (sx, sy) = euclidean::project(&v, W, H, x, y);
        let (ux, uy) = euclidean::unproject(&v, W, H, sx, sy);
        prop_assert!((ux - x).abs() < 1e-3, "x round trip: {ux} vs {x}");
        prop_assert!((uy - y).abs() < 1e-3, "y round trip: {uy} vs {y}");
    }

    /// Spec §8 item 2: the data point under screen anchor `s` before a pan
    /// lands under `s'` after `pan(s -> s')`, for any Euclidean view.
    #[test]
    fn euclidean_pan_anchor_invariance(
        cx in -20.0f32..20.0,
        cy in -20.0f32..20.0,
        zoom in 0.2f32..20.0,
        start_x in 100.0f32..1100.0,
        start_y in 100.0f32..700.0,
        end_x in 100.0f32..1100.0,
        end_y in 100.0f32..700.0,
    ) {
        let v = ViewState::euclidean(cx, cy, zoom);
        let (ax, ay) = euclidean::unproject(&v, W, H, start_x, start_y);
        let dx = end_x - start_x;
        let dy = end_y - start_y;
        let v2 = euclidean::pan(&v, W, H, dx, dy);
        let (sx, sy) = euclidean::project(&v2, W, H, ax, ay);
        prop_assert!((sx - end_x).abs() < 1e-2, "sx = {sx} vs {end_x}");
        prop_assert!((sy - end_y).abs() < 1e-2, "sy = {sy} vs {end_y}");
    }

    /// Spec §8 item 3: the data point under the cursor before a zoom lies
    /// within 1px of the cursor after, for any anchor and delta.
    #[test]
    fn euclidean_zoom_anchor_invariance(
        cx in -20.0f32..20.0,
        cy in -20.0f32..20.0,
        zoom in 0.2f32..20.0,
        anchor_x in 100.0f32..1100.0,
        anchor_y in 100.0f32..700.0,
        delta in -10.0f32..10.0,
    ) {
        let v = ViewState::euclidean(cx, cy, zoom);
        let (ax, ay) = euclidean::unproject(&v, W, H, anchor_x, anchor_y);
        let v2 = euclidean::zoom(&v, W, H, anchor_x, anchor_y, delta);
        let (sx, sy) = euclidean::project(&v2, W, H, ax, ay);
        prop_assert!((sx - anchor_x).abs() < 1.0, "sx = {sx} vs {anchor_x}");
        prop_assert!((sy - anchor_y).abs() < 1.0, "sy = {sy} vs {anchor_y}");
    }

    /// Spec §8 item 1 (Poincaré half): round trip for interior points, well
    /// clear of the boundary where the relaxed 1e-5 tolerance would apply.
    #[test]
    fn poincare_projection_round_trip(
        ax in -0.3f32..0.3,
        ay in -0.3f32..0.3,
        display_zoom in 0.5f32..10.0,
        x in -0.6f32..0.6,
        y in -0.6f32..0.6,
    ) {
        prop_assume!(x * x + y * y < 0.64);
        prop_assume!(ax * ax + ay * ay < 0.25);
        let v = ViewState::poincare(ax, ay, display_zoom);
        let (sx, sy) = poincare::project(&v, W, H, x, y);
        let (ux, uy) = poincare::unproject(&v, W, H, sx, sy);
        prop_assert!((ux - x).abs() < 1e-3, "x round trip: {ux} vs {x}");
        prop_assert!((uy - y).abs() < 1e-3, "y round trip: {uy} vs {y}");
    }

    /// Spec §8 item 4: after any sequence of pans, `a` stays inside the
    /// open unit disk.
    #[test]
    fn poincare_boundary_containment(
        deltas in proptest::collection::vec((-80.0f32..80.0, -80.0f32..80.0), 1..12),
    ) {
        let mut v = ViewState::poincare(0.0, 0.0, 1.0);
        let (start_x, start_y) = (W / 2.0, H / 2.0);
        for (dx, dy) in deltas {
            let end_x = (start_x + dx).clamp(0.0, W);
            let end_y = (start_y + dy).clamp(0.0, H);
            v = poincare::pan(&v, W, H, start_x, start_y, end_x, end_y);
            let ViewState::Poincare { ax, ay, .. } = v else {
                unreachable!("poincare::pan always returns a Poincare view");
            };
            prop_assert!(ax * ax + ay * ay < 1.0, "a = ({ax}, {ay})");
            let (ox, oy) = poincare::project(&v, W, H, 0.0, 0.0);
            prop_assert!(ox.is_finite() && oy.is_finite());
        }
    }
}
