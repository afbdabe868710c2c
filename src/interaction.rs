//! Input-event coalescing and frame scheduling (spec §4.6). Pointer/wheel/
//! resize handlers only ever write into this controller's own pending-state
//! fields; [`InteractionController::tick`] is the single place that calls
//! into a [`Renderer`] (spec §5 "mutation is permitted only from [the frame]
//! callback", and the RUST DRIVER MODEL note that handlers never call the
//! renderer directly — there is no `requestAnimationFrame` to push through,
//! so the host pulls via `tick` instead).

use crate::polygon::{ChaikinRdpSimplifier, PolylineSimplifier};
use crate::renderer::{Modifiers, Renderer};
use crate::selection::Selection;

/// Default lasso trigger: shift held, plus either ctrl or meta (spec §4.6
/// "Mode selection at pointer-down").
fn default_lasso_trigger(modifiers: Modifiers) -> bool {
    modifiers.contains(Modifiers::SHIFT) && (modifiers.contains(Modifiers::META) || modifiers.contains(Modifiers::CTRL))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Pan,
    Lasso,
}

/// Tunables for [`InteractionController`], all defaulted to the spec's own
/// numbers (2px lasso move threshold, 24-vertex budgets, 1/100 wheel scale).
pub struct InteractionConfig {
    pub lasso_trigger: Box<dyn Fn(Modifiers) -> bool>,
    pub lasso_move_threshold_px: f32,
    pub lasso_preview_max_vertices: usize,
    pub lasso_final_max_vertices: usize,
    pub wheel_scale: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            lasso_trigger: Box::new(default_lasso_trigger),
            lasso_move_threshold_px: 2.0,
            lasso_preview_max_vertices: 24,
            lasso_final_max_vertices: 24,
            wheel_scale: 1.0 / 100.0,
        }
    }
}

/// Delivered once a lasso gesture completes (spec §4.6 "deliver both
/// polygons to the completion hook").
pub struct LassoCompletion {
    pub screen_polygon: Vec<(f32, f32)>,
    pub data_polygon: Vec<(f32, f32)>,
    pub selection: Selection,
}

/// Coalesces pointer/wheel/resize input into at-most-one batched renderer
/// update per [`tick`](InteractionController::tick) call (spec §4.6/§5).
pub struct InteractionController {
    config: InteractionConfig,
    simplifier: Box<dyn PolylineSimplifier>,
    on_lasso_complete: Option<Box<dyn FnMut(LassoCompletion)>>,

    mode: Mode,
    modifiers: Modifiers,

    known_size: Option<(u32, u32)>,
    resize_pending: Option<(u32, u32)>,

    pending_pan: (f32, f32),
    pan_start_pending: Option<(f32, f32)>,
    last_pan_sample: (f32, f32),

    pending_zoom: f32,
    zoom_anchor: (f32, f32),

    hover_clear_requested: bool,
    hover_target: Option<(f32, f32)>,
    hovered: Option<u32>,

    lasso_raw_screen: Vec<(f32, f32)>,
    lasso_preview: Vec<(f32, f32)>,
    lasso_grew: bool,
    lasso_finished: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        InteractionController::new(InteractionConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        InteractionController {
            config,
            simplifier: Box::new(ChaikinRdpSimplifier::new()),
            on_lasso_complete: None,
            mode: Mode::Idle,
            modifiers: Modifiers::empty(),
            known_size: None,
            resize_pending: None,
            pending_pan: (0.0, 0.0),
            pan_start_pending: None,
            last_pan_sample: (0.0, 0.0),
            pending_zoom: 0.0,
            zoom_anchor: (0.0, 0.0),
            hover_clear_requested: false,
            hover_target: None,
            hovered: None,
            lasso_raw_screen: Vec::new(),
            lasso_preview: Vec::new(),
            lasso_grew: false,
            lasso_finished: false,
        }
    }

    pub fn set_simplifier(&mut self, simplifier: Box<dyn PolylineSimplifier>) {
        self.simplifier = simplifier;
    }

    pub fn set_lasso_complete_hook(&mut self, hook: Box<dyn FnMut(LassoCompletion)>) {
        self.on_lasso_complete = Some(hook);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The in-progress, screen-space preview polygon for lasso feedback
    /// (spec §4.6 "simplify to <= 24 vertices per frame for visual
    /// feedback"). Empty outside [`Mode::Lasso`].
    pub fn lasso_preview(&self) -> &[(f32, f32)] {
        &self.lasso_preview
    }

    /// Primary-button pointer-down (spec §4.6 "only primary button starts a
    /// gesture"). Non-primary buttons are ignored entirely.
    pub fn on_pointer_down(&mut self, x: f32, y: f32, button: u8, modifiers: Modifiers) {
        if button != 0 {
            return;
        }
        self.modifiers = modifiers;
        self.hover_clear_requested = true;
        self.hover_target = None;

        if (self.config.lasso_trigger)(modifiers) {
            self.mode = Mode::Lasso;
            self.lasso_raw_screen.clear();
            self.lasso_raw_screen.push((x, y));
            self.lasso_preview.clear();
            self.lasso_grew = true;
            self.lasso_finished = false;
        } else {
            self.mode = Mode::Pan;
            self.pan_start_pending = Some((x, y));
            self.pending_pan = (0.0, 0.0);
            self.last_pan_sample = (x, y);
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32, modifiers: Modifiers) {
        self.modifiers = modifiers;
        match self.mode {
            Mode::Idle => {
                self.hover_target = Some((x, y));
            }
            Mode::Pan => {
                let (last_x, last_y) = self.last_pan_sample;
                self.pending_pan.0 += x - last_x;
                self.pending_pan.1 += y - last_y;
                self.last_pan_sample = (x, y);
            }
            Mode::Lasso => {
                let (last_x, last_y) =
                    self.lasso_raw_screen.last().copied().unwrap_or((x, y));
                let moved = ((x - last_x).powi(2) + (y - last_y).powi(2)).sqrt();
                if moved > self.config.lasso_move_threshold_px {
                    self.lasso_raw_screen.push((x, y));
                    self.lasso_grew = true;
                }
            }
        }
    }

    pub fn on_pointer_up(&mut self, x: f32, y: f32, modifiers: Modifiers) {
        self.modifiers = modifiers;
        if self.mode == Mode::Lasso {
            let (last_x, last_y) = self.lasso_raw_screen.last().copied().unwrap_or((x, y));
            if (x - last_x).abs() > 0.0 || (y - last_y).abs() > 0.0 {
                self.lasso_raw_screen.push((x, y));
            }
            self.lasso_grew = true;
            self.lasso_finished = true;
        }
        self.mode = Mode::Idle;
    }

    /// Pointer cancellation discards the in-progress gesture instead of
    /// finalizing it (no lasso-complete hook fires, no pan flush).
    pub fn on_pointer_cancel(&mut self) {
        self.mode = Mode::Idle;
        self.pending_pan = (0.0, 0.0);
        self.pan_start_pending = None;
        self.lasso_raw_screen.clear();
        self.lasso_preview.clear();
        self.lasso_grew = false;
        self.lasso_finished = false;
    }

    /// `preventDefault()` is a DOM-only concept; the host is expected to
    /// have already suppressed default scroll behavior before this is
    /// called (spec §4.6 "Wheel").
    pub fn on_wheel(&mut self, x: f32, y: f32, delta_y: f32, modifiers: Modifiers) {
        self.modifiers = modifiers;
        self.pending_zoom += -delta_y * self.config.wheel_scale;
        self.zoom_anchor = (x, y);
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.known_size != Some((width, height)) {
            self.resize_pending = Some((width, height));
        }
    }

    /// Drains every pending buffer into at most one renderer update, in the
    /// spec's fixed order: resize -> pan -> zoom -> hover -> lasso (spec §5
    /// "Ordering"). Returns whether anything changed, i.e. whether a render
    /// is due this tick.
    pub fn tick(&mut self, renderer: &mut dyn Renderer) -> bool {
        let mut changed = false;

        if let Some((w, h)) = self.resize_pending.take() {
            renderer.resize(w, h);
            self.known_size = Some((w, h));
            changed = true;
        }

        if let Some((x, y)) = self.pan_start_pending.take() {
            renderer.start_pan(x, y);
        }

        if self.pending_pan != (0.0, 0.0) {
            let (dx, dy) = self.pending_pan;
            renderer.pan(dx, dy, self.modifiers);
            self.pending_pan = (0.0, 0.0);
            changed = true;
        }

        if self.pending_zoom != 0.0 {
            let delta = self.pending_zoom;
            let (ax, ay) = self.zoom_anchor;
            renderer.zoom(ax, ay, delta, self.modifiers);
            self.pending_zoom = 0.0;
            changed = true;
        }

        if self.hover_clear_requested {
            if self.hovered.is_some() {
                renderer.set_hovered(None);
                self.hovered = None;
                changed = true;
            }
            self.hover_clear_requested = false;
        } else if self.mode == Mode::Idle {
            if let Some((x, y)) = self.hover_target.take() {
                let hit = renderer.hit_test(x, y).map(|h| h.index);
                if hit != self.hovered {
                    renderer.set_hovered(hit);
                    self.hovered = hit;
                    changed = true;
                }
            }
        }

        if self.mode == Mode::Lasso && self.lasso_grew {
            let data_polygon: Vec<(f32, f32)> = self
                .lasso_raw_screen
                .iter()
                .map(|&(sx, sy)| renderer.unproject_from_screen(sx, sy))
                .collect();
            self.lasso_preview = self
                .simplifier
                .simplify(&data_polygon, self.config.lasso_preview_max_vertices)
                .iter()
                .map(|&(x, y)| renderer.project_to_screen(x, y))
                .collect();
            self.lasso_grew = false;
            changed = true;
        }

        if self.lasso_finished {
            self.lasso_finished = false;
            let data_polygon: Vec<(f32, f32)> = self
                .lasso_raw_screen
                .iter()
                .map(|&(sx, sy)| renderer.unproject_from_screen(sx, sy))
                .collect();
            let simplified_data = self
                .simplifier
                .simplify(&data_polygon, self.config.lasso_final_max_vertices);
            let screen_polygon: Vec<(f32, f32)> =
                simplified_data.iter().map(|&(x, y)| renderer.project_to_screen(x, y)).collect();
            let flat_screen: Vec<f32> = screen_polygon.iter().flat_map(|&(x, y)| [x, y]).collect();
            let selection = renderer.lasso_select(&flat_screen);

            tracing::debug!(
                vertices = simplified_data.len(),
                "lasso gesture completed"
            );

            if let Some(hook) = self.on_lasso_complete.as_mut() {
                hook(LassoCompletion {
                    screen_polygon,
                    data_polygon: simplified_data,
                    selection,
                });
            }
            self.lasso_raw_screen.clear();
            self.lasso_preview.clear();
            changed = true;
        }

        changed
    }
}
