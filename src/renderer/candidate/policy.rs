//! Pure, GPU-free policy functions for the candidate renderer's adaptive
//! quality knobs (spec §4.5). Kept separate from the `wgpu` plumbing so the
//! budget math itself can be unit tested without a device.

/// Css-pixel area above which a canvas counts as "large" for the pixel
/// budget table (spec leaves the exact cutoff unspecified; recorded as an
/// Open Question decision in DESIGN.md).
pub const LARGE_CANVAS_CSS_PIXELS: f64 = 1_000_000.0;

/// Total screen-space fragment budget for the points offscreen pass (Open
/// Question decision, DESIGN.md).
pub const FRAGMENT_BUDGET: f64 = 5.0e7;
/// Budget used by the shape-policy hysteresis, deliberately below
/// `FRAGMENT_BUDGET` (spec: "a separate circleBudget (< fragmentBudget)").
pub const CIRCLE_BUDGET: f64 = FRAGMENT_BUDGET * 0.4;

pub const MAX_GPU_UPLOAD_POINTS: u32 = 10_000_000;
pub const MAX_BASE_DRAW_POINTS: u32 = 4_000_000;
pub const INTERACTION_LOD_MIN_POINTS: u32 = 500_000;
pub const INTERACTION_LOD_POINCARE_THRESHOLD: u32 = 2_000_000;
pub const INTERACTION_STABLE_WINDOW_MS: f64 = 80.0;
pub const OVERLAY_CAP: u32 = 250_000;

fn pixel_budget(n: u32) -> f64 {
    if n >= 1_000_000 {
        2.0e5
    } else if n >= 500_000 {
        1.4e6
    } else if n >= 250_000 {
        2.1e6
    } else {
        8.0e6
    }
}

fn dpr_ceiling(n: u32) -> f64 {
    if n >= 1_000_000 {
        1.0
    } else if n >= 500_000 {
        1.25
    } else {
        1.5
    }
}

fn dpr_floor(n: u32) -> f64 {
    if n >= 1_000_000 {
        0.35
    } else if n >= 500_000 {
        0.75
    } else {
        1.0
    }
}

/// Picks the DPR for the offscreen points texture: `min(deviceDpr, cap,
/// dpr1, dpr2)` clamped above by a point-count-dependent floor (spec
/// §4.5 "Offscreen points buffer").
pub fn adaptive_points_dpr(
    device_dpr: f64,
    css_width: f64,
    css_height: f64,
    n: u32,
    draw_count: u32,
    point_radius_px: f64,
) -> f64 {
    let css_pixels = (css_width * css_height).max(1.0);
    let budget = if css_pixels >= LARGE_CANVAS_CSS_PIXELS {
        // "large canvases" use the tighter of the two >=1e6 tiers.
        if n >= 1_000_000 {
            2.0e5
        } else {
            pixel_budget(n)
        }
    } else if n >= 1_000_000 {
        5.0e5
    } else {
        pixel_budget(n)
    };

    let dpr1 = (budget / css_pixels).sqrt();
    let fragment_area = (draw_count as f64) * std::f64::consts::PI * point_radius_px * point_radius_px;
    let dpr2 = (FRAGMENT_BUDGET / fragment_area.max(1.0)).sqrt();

    let cap = dpr_ceiling(n);
    let floor = dpr_floor(n);

    device_dpr.min(cap).min(dpr1).min(dpr2).max(floor)
}

/// Shape policy with hysteresis: `true` means "draw squares".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapePolicyState {
    pub squares: bool,
}

impl Default for ShapePolicyState {
    fn default() -> Self {
        ShapePolicyState { squares: false }
    }
}

impl ShapePolicyState {
    /// Updates the shape policy in place given the current estimated
    /// fragment count and points DPR (spec §4.5 "Shape policy (square vs
    /// circle) with hysteresis").
    pub fn update(&mut self, draw_count: u32, point_radius_px: f64, points_dpr: f64) {
        if points_dpr <= 0.75 {
            self.squares = true;
            return;
        }
        let estimate =
            (draw_count as f64) * std::f64::consts::PI * point_radius_px * point_radius_px * points_dpr * points_dpr;
        if estimate >= CIRCLE_BUDGET {
            self.squares = true;
        } else if estimate <= 0.75 * CIRCLE_BUDGET {
            self.squares = false;
        }
        // else: within the hysteresis band, keep the previous value.
    }
}

/// `target = min(n, max(2.5e5, min(4e6, n/4)))`, shared by the upload
/// subsample and the interaction-LOD subsample (spec §4.5 "Upload policy" /
/// "Interaction LOD" both describe this same target formula).
fn stride_target(n: u32) -> u32 {
    (n / 4).min(4_000_000).max(250_000).min(n)
}

/// GPU upload subsampling target for datasets exceeding
/// `MAX_GPU_UPLOAD_POINTS` (spec §4.5 "Upload policy"). Returns `None` when
/// the full dataset should be uploaded.
pub fn upload_stride(n: u32) -> Option<u32> {
    if n <= MAX_GPU_UPLOAD_POINTS {
        return None;
    }
    Some((n / stride_target(n).max(1)).max(1))
}

/// Stride for the "always precompute a second index buffer pointing to the
/// full-dataset stride subsample (for n >= 5e5)" interaction-LOD draw set
/// (spec §4.5 "Interaction LOD"). Returns `None` below the threshold, since
/// small datasets never need a LOD pass.
pub fn lod_stride(n: u32) -> Option<u32> {
    if n < INTERACTION_LOD_MIN_POINTS {
        return None;
    }
    Some((n / stride_target(n).max(1)).max(1))
}

/// Whether the interaction-LOD (stride-subsampled) index buffer should be
/// drawn instead of the full/base draw set this frame (spec §4.5
/// "Interaction LOD").
pub fn use_interaction_lod(n: u32, is_poincare: bool, ms_since_last_view_change: f64) -> bool {
    if n > MAX_BASE_DRAW_POINTS {
        return true;
    }
    if n < INTERACTION_LOD_MIN_POINTS {
        return false;
    }
    is_poincare
        && n >= INTERACTION_LOD_POINCARE_THRESHOLD
        && ms_since_last_view_change < INTERACTION_STABLE_WINDOW_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpr_is_clamped_between_floor_and_ceiling() {
        let dpr = adaptive_points_dpr(3.0, 1920.0, 1080.0, 20_000_000, 20_000_000, 2.0);
        assert!(dpr >= dpr_floor(20_000_000));
        assert!(dpr <= dpr_ceiling(20_000_000));
    }

    #[test]
    fn small_dataset_allows_high_dpr() {
        let dpr = adaptive_points_dpr(2.0, 800.0, 600.0, 1_000, 1_000, 2.5);
        assert!(dpr > 1.0);
        assert!(dpr <= 1.5);
    }

    #[test]
    fn shape_policy_switches_on_then_requires_drop_to_switch_off() {
        let mut policy = ShapePolicyState::default();
        assert!(!policy.squares);
        policy.update(10_000_000, 2.0, 1.0);
        assert!(policy.squares);
        // Small drop within the hysteresis band should not switch off.
        policy.update((CIRCLE_BUDGET / (std::f64::consts::PI * 4.0) * 0.85) as u32, 2.0, 1.0);
        assert!(policy.squares);
    }

    #[test]
    fn shape_policy_forces_squares_at_low_dpr() {
        let mut policy = ShapePolicyState::default();
        policy.update(10, 1.0, 0.5);
        assert!(policy.squares);
    }

    #[test]
    fn upload_stride_is_none_under_threshold() {
        assert_eq!(upload_stride(1_000_000), None);
    }

    #[test]
    fn upload_stride_subsamples_large_datasets() {
        let stride = upload_stride(40_000_000).unwrap();
        assert!(stride > 1);
        assert!(40_000_000 / stride <= 4_000_000);
    }

    #[test]
    fn lod_stride_is_none_below_threshold() {
        assert_eq!(lod_stride(499_999), None);
    }

    #[test]
    fn lod_stride_subsamples_at_threshold_and_above() {
        let stride = lod_stride(3_000_000).unwrap();
        assert!(stride >= 1);
        assert!(3_000_000 / stride.max(1) <= 4_000_000);
    }

    #[test]
    fn interaction_lod_triggers_above_max_base_draw_points() {
        assert!(use_interaction_lod(5_000_000, false, 1000.0));
    }

    #[test]
    fn interaction_lod_requires_poincare_and_recency_in_band() {
        assert!(!use_interaction_lod(2_500_000, false, 10.0));
        assert!(use_interaction_lod(2_500_000, true, 10.0));
        assert!(!use_interaction_lod(2_500_000, true, 200.0));
    }

    #[test]
    fn small_datasets_never_use_lod() {
        assert!(!use_interaction_lod(100, true, 10.0));
    }
}
