//! Euclidean projection, unprojection, pan and anchored zoom (spec §4.1).

use super::view::{ViewState, EUCLIDEAN_ZOOM_MAX, EUCLIDEAN_ZOOM_MIN};

/// `s = min(width, height) * 0.4 * zoom`.
#[inline]
pub fn scale(width: f32, height: f32, zoom: f32) -> f32 {
    width.min(height) * 0.4 * zoom
}

/// `sx = width/2 + (x - centerX) * s`, `sy = height/2 - (y - centerY) * s`
/// (Y flipped, per spec).
pub fn project(view: &ViewState, width: f32, height: f32, x: f32, y: f32) -> (f32, f32) {
    let ViewState::Euclidean { center_x, center_y, zoom } = *view else {
        panic!("euclidean::project called with a non-Euclidean view");
    };
    let s = scale(width, height, zoom);
    let sx = width / 2.0 + (x - center_x) * s;
    let sy = height / 2.0 - (y - center_y) * s;
    (sx, sy)
}

/// Exact inverse of [`project`].
pub fn unproject(view: &ViewState, width: f32, height: f32, sx: f32, sy: f32) -> (f32, f32) {
    let ViewState::Euclidean { center_x, center_y, zoom } = *view else {
        panic!("euclidean::unproject called with a non-Euclidean view");
    };
    let s = scale(width, height, zoom);
    let x = (sx - width / 2.0) / s + center_x;
    let y = -(sy - height / 2.0) / s + center_y;
    (x, y)
}

/// `centerX -= dx/s; centerY += dy/s` — anchor-invariant by construction,
/// since the screen-space displacement `(dx, dy)` is converted through the
/// same scale used for projection.
pub fn pan(view: &ViewState, width: f32, height: f32, dx: f32, dy: f32) -> ViewState {
    let ViewState::Euclidean { center_x, center_y, zoom } = *view else {
        panic!("euclidean::pan called with a non-Euclidean view");
    };
    let s = scale(width, height, zoom);
    ViewState::euclidean(center_x - dx / s, center_y + dy / s, zoom)
}

/// `newZoom = clamp(zoom * 1.1^delta, 0.1, 100)`; re-centers so the data
/// point under `(anchor_x, anchor_y)` stays under the cursor.
pub fn zoom(
    view: &ViewState,
    width: f32,
    height: f32,
    anchor_x: f32,
    anchor_y: f32,
    delta: f32,
) -> ViewState {
    let ViewState::Euclidean { center_x: _, center_y: _, zoom: old_zoom } = *view else {
        panic!("euclidean::zoom called with a non-Euclidean view");
    };
    let (anchor_data_x, anchor_data_y) = unproject(view, width, height, anchor_x, anchor_y);

    let new_zoom = (old_zoom as f64 * 1.1f64.powf(delta as f64))
        .clamp(EUCLIDEAN_ZOOM_MIN, EUCLIDEAN_ZOOM_MAX) as f32;
    let new_s = scale(width, height, new_zoom);

    // Solve for the new center such that anchor_data still projects to
    // (anchor_x, anchor_y) under new_s.
    let new_center_x = anchor_data_x - (anchor_x - width / 2.0) / new_s;
    let new_center_y = anchor_data_y + (anchor_y - height / 2.0) / new_s;

    ViewState::euclidean(new_center_x, new_center_y, new_zoom)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const W: f32 = 1200.0;
    const H: f32 = 800.0;

    #[test]
    fn round_trip() {
        let v = ViewState::euclidean(1.5, -2.25, 3.0);
        for &(x, y) in &[(0.0, 0.0), (5.0, -5.0), (-10.0, 10.0)] {
            let (sx, sy) = project(&v, W, H, x, y);
            let (ux, uy) = unproject(&v, W, H, sx, sy);
            assert_abs_diff_eq!(ux, x, epsilon = 1e-5);
            assert_abs_diff_eq!(uy, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn pan_is_anchor_invariant() {
        let v = ViewState::euclidean(0.0, 0.0, 2.0);
        let anchor_screen = (400.0, 266.0);
        let (ax, ay) = unproject(&v, W, H, anchor_screen.0, anchor_screen.1);
        let dx = 600.0 - anchor_screen.0;
        let dy = 400.0 - anchor_screen.1;
        let v2 = pan(&v, W, H, dx, dy);
        let (sx, sy) = project(&v2, W, H, ax, ay);
        assert_abs_diff_eq!(sx, 600.0, epsilon = 1e-4);
        assert_abs_diff_eq!(sy, 400.0, epsilon = 1e-4);
    }

    #[test]
    fn zoom_is_anchor_invariant() {
        let v = ViewState::euclidean(3.0, -1.0, 1.0);
        let anchor = (700.0, 300.0);
        let (ax, ay) = unproject(&v, W, H, anchor.0, anchor.1);
        let v2 = zoom(&v, W, H, anchor.0, anchor.1, 4.0);
        let (sx, sy) = project(&v2, W, H, ax, ay);
        assert!((sx - anchor.0).abs() < 1.0);
        assert!((sy - anchor.1).abs() < 1.0);
    }

    #[test]
    fn zoom_delta_clamps_range() {
        let v = ViewState::euclidean(0.0, 0.0, 1.0);
        let v2 = zoom(&v, W, H, W / 2.0, H / 2.0, 1000.0);
        if let ViewState::Euclidean { zoom, .. } = v2 {
            assert!(zoom <= 100.0);
        }
        let v3 = zoom(&v, W, H, W / 2.0, H / 2.0, -1000.0);
        if let ViewState::Euclidean { zoom, .. } = v3 {
            assert!(zoom >= 0.1);
        }
    }
}
