//! Interaction state of one pinned image.
//!
//! All mutation goes through [`transition`], a pure function from the
//! current state and one input event to the next state plus an optional
//! user-facing notice. The surface that owns the pin only translates
//! platform input into [`PinEvent`]s and repaints when
//! [`PinState::take_render_plan`] yields a plan.

use serde::{Deserialize, Serialize};

/// Zoom change per wheel delta.
pub const SCALING_STEP: f64 = 0.025;

/// Opacity change per modifier-held wheel tick.
pub const OPACITY_WHEEL_STEP: f64 = 0.02;

/// Opacity change per menu action.
pub const OPACITY_STEP: f64 = 0.1;

/// Smallest rendered edge, in pixels.
pub const MIN_SIZE: f64 = 100.0;

/// Wheel delta of one discrete mouse-wheel notch (or more).
pub const WHEEL_TICK: i32 = 60;

/// Touchpad debounce window and scroll quiet period.
pub const SCROLL_QUIET_MS: u64 = 200;

/// Tolerance for treating a step scale as 1.0.
pub const SCALE_EPSILON: f64 = 1e-4;

/// Opacity shown while click-through when the pin is otherwise opaque.
pub const TRANSPARENT_DISPLAY_OPACITY: f64 = 0.5;

const OPAQUE_THRESHOLD: f64 = 0.99999;

/// Scroll phase reported with a wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    /// Devices without phase information (most mice, X11/Windows touchpads)
    #[default]
    NoPhase,
    Begin,
    Update,
    End,
    Momentum,
}

impl ScrollPhase {
    /// Phases that carry a zoom delta. Every other phase ends the burst.
    pub fn accumulates(self) -> bool {
        matches!(self, ScrollPhase::Update | ScrollPhase::NoPhase)
    }
}

/// Abstract input consumed by [`transition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinEvent {
    /// Wheel or touchpad scroll. `timestamp_ms` is from a monotonic clock.
    Wheel {
        delta_y: i32,
        modifier: bool,
        phase: ScrollPhase,
        timestamp_ms: u64,
    },
    /// Pinch gesture progress.
    PinchUpdate {
        total_scale_factor: f64,
        last_scale_factor: f64,
    },
    /// Pinch gesture ended.
    GestureFinished,
    /// Periodic clock; ends a scroll burst after [`SCROLL_QUIET_MS`] of silence.
    Tick { now_ms: u64 },
    /// Numeric key 0-9: 0 is fully opaque, 1-9 is 10%-90%.
    SetOpacityLevel(u8),
    IncreaseOpacity,
    DecreaseOpacity,
    HideShadow,
    /// The host finished repainting at the current size.
    Repainted,
}

impl PinEvent {
    /// Events a window only receives through the pointer.
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            PinEvent::Wheel { .. } | PinEvent::PinchUpdate { .. } | PinEvent::GestureFinished
        )
    }
}

/// What a burst is currently accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    #[default]
    Idle,
    Scrolling,
    Pinching,
}

/// Short status text for the floating notifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notice {
    /// Effective zoom, in percent
    Zoom(f64),
    /// Logical opacity, in percent
    Opacity(f64),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Zoom(percent) => write!(f, "Zoom {:.1}%", percent),
            Notice::Opacity(percent) => write!(f, "Opacity {}%", percent.round() as i64),
        }
    }
}

/// Result of one [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PinState,
    pub notice: Option<Notice>,
}

/// How the image is fitted into the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectMode {
    /// Fit inside the box, keeping aspect ratio
    Fit,
    /// Fill the box, keeping aspect ratio, cropping the overflow
    Expand,
}

/// Target box for the next repaint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlan {
    pub width: f64,
    pub height: f64,
    pub aspect: AspectMode,
}

impl RenderPlan {
    /// Size of an image of `base` dimensions scaled into this box.
    pub fn fitted_size(&self, base: (u32, u32)) -> (u32, u32) {
        let (bw, bh) = (f64::from(base.0), f64::from(base.1));
        if bw <= 0.0 || bh <= 0.0 {
            return (0, 0);
        }
        let (sx, sy) = (self.width / bw, self.height / bh);
        let scale = match self.aspect {
            AspectMode::Fit => sx.min(sy),
            AspectMode::Expand => sx.max(sy),
        };
        ((bw * scale).round() as u32, (bh * scale).round() as u32)
    }
}

/// Numeric state of a pin.
#[derive(Debug, Clone, PartialEq)]
pub struct PinState {
    pub(crate) committed_scale: f64,
    pub(crate) step_scale: f64,
    pub(crate) expanding: bool,
    pub(crate) opacity: f64,
    pub(crate) shadow_enabled: bool,
    pub(crate) mouse_transparent: bool,
    pub(crate) size_changed: bool,
    pub(crate) interaction: Interaction,
    pub(crate) last_scroll_ms: Option<u64>,
    pub(crate) last_touchpad_ms: Option<u64>,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            committed_scale: 1.0,
            step_scale: 1.0,
            expanding: false,
            opacity: 1.0,
            shadow_enabled: true,
            mouse_transparent: false,
            size_changed: false,
            interaction: Interaction::Idle,
            last_scroll_ms: None,
            last_touchpad_ms: None,
        }
    }
}

impl PinState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zoom folded in from all finished bursts.
    pub fn committed_scale(&self) -> f64 {
        self.committed_scale
    }

    /// Multiplier of the burst in progress; 1.0 when idle.
    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    pub fn effective_scale(&self) -> f64 {
        self.committed_scale * self.step_scale
    }

    pub fn expanding(&self) -> bool {
        self.expanding
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn shadow_enabled(&self) -> bool {
        self.shadow_enabled
    }

    pub fn is_mouse_transparent(&self) -> bool {
        self.mouse_transparent
    }

    pub fn size_changed(&self) -> bool {
        self.size_changed
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Opacity the window should actually be shown with.
    pub fn displayed_opacity(&self) -> f64 {
        if self.mouse_transparent && self.opacity >= OPAQUE_THRESHOLD {
            TRANSPARENT_DISPLAY_OPACITY
        } else {
            self.opacity
        }
    }

    pub fn aspect_mode(&self) -> AspectMode {
        if self.expanding {
            AspectMode::Expand
        } else {
            AspectMode::Fit
        }
    }

    /// Target box for an image of `base` size on a surface capped at `max`.
    ///
    /// Each axis is `base * step * committed`, raised to [`MIN_SIZE`] and
    /// capped at the surface maximum. When the maximum is below
    /// `MIN_SIZE` the minimum wins.
    pub fn target_size(&self, base: (u32, u32), max: (u32, u32)) -> (f64, f64) {
        let bound = |base: u32, max: u32| {
            let wanted = f64::from(base) * self.step_scale * self.committed_scale;
            MIN_SIZE.max(wanted.min(f64::from(max)))
        };
        (bound(base.0, max.0), bound(base.1, max.1))
    }

    fn plan(&self, base: (u32, u32), max: (u32, u32)) -> RenderPlan {
        let (width, height) = self.target_size(base, max);
        RenderPlan {
            width,
            height,
            aspect: self.aspect_mode(),
        }
    }

    /// Size the image occupies once scaled into [`PinState::target_size`].
    pub fn fitted_size(&self, base: (u32, u32), max: (u32, u32)) -> (u32, u32) {
        self.plan(base, max).fitted_size(base)
    }

    /// Plan a repaint if something changed since the last one, clearing the
    /// dirty flag.
    pub fn take_render_plan(&mut self, base: (u32, u32), max: (u32, u32)) -> Option<RenderPlan> {
        if !self.size_changed {
            return None;
        }
        self.size_changed = false;
        Some(self.plan(base, max))
    }

    fn commit(&mut self) {
        self.committed_scale *= self.step_scale;
        self.step_scale = 1.0;
        self.expanding = false;
        self.interaction = Interaction::Idle;
        self.last_scroll_ms = None;
    }

    fn zoom_notice(&self) -> Notice {
        Notice::Zoom(self.effective_scale() * 100.0)
    }

    fn change_opacity(&mut self, step: f64) -> Notice {
        self.opacity = (self.opacity + step).clamp(0.0, 1.0);
        Notice::Opacity(self.opacity * 100.0)
    }

    fn wheel_opacity(&mut self, delta_y: i32, timestamp_ms: u64) -> Option<Notice> {
        let direction = if delta_y >= WHEEL_TICK {
            1.0
        } else if delta_y <= -WHEEL_TICK {
            -1.0
        } else {
            // Touchpad: react at most once per quiet window.
            if let Some(last) = self.last_touchpad_ms {
                if timestamp_ms.saturating_sub(last) < SCROLL_QUIET_MS {
                    return None;
                }
            }
            self.last_touchpad_ms = Some(timestamp_ms);
            match delta_y.signum() {
                0 => return None,
                sign => f64::from(sign),
            }
        };
        Some(self.change_opacity(direction * OPACITY_WHEEL_STEP))
    }

    fn wheel_zoom(
        &mut self,
        delta_y: i32,
        phase: ScrollPhase,
        timestamp_ms: u64,
    ) -> Option<Notice> {
        if phase.accumulates() {
            if delta_y == 0 {
                return None;
            }
            let step = if delta_y > 0 {
                self.step_scale + SCALING_STEP
            } else {
                self.step_scale - SCALING_STEP
            };
            self.step_scale = step.max(SCALING_STEP);
            self.expanding = self.step_scale >= 1.0;
            self.interaction = Interaction::Scrolling;
            self.last_scroll_ms = Some(timestamp_ms);
        } else {
            self.commit();
        }
        self.size_changed = true;
        Some(self.zoom_notice())
    }

    fn apply(&mut self, event: &PinEvent) -> Option<Notice> {
        match *event {
            PinEvent::Wheel {
                delta_y,
                modifier: true,
                timestamp_ms,
                ..
            } => self.wheel_opacity(delta_y, timestamp_ms),
            PinEvent::Wheel {
                delta_y,
                modifier: false,
                phase,
                timestamp_ms,
            } => self.wheel_zoom(delta_y, phase, timestamp_ms),
            PinEvent::PinchUpdate {
                total_scale_factor,
                last_scale_factor,
            } => {
                if !total_scale_factor.is_finite() {
                    return None;
                }
                self.step_scale = total_scale_factor.max(SCALING_STEP);
                self.expanding = self.step_scale > last_scale_factor;
                self.interaction = Interaction::Pinching;
                self.size_changed = true;
                None
            }
            PinEvent::GestureFinished => {
                self.commit();
                self.size_changed = true;
                None
            }
            PinEvent::Tick { now_ms } => {
                if self.interaction != Interaction::Scrolling {
                    return None;
                }
                let quiet = self
                    .last_scroll_ms
                    .map_or(true, |last| now_ms.saturating_sub(last) >= SCROLL_QUIET_MS);
                if !quiet {
                    return None;
                }
                self.commit();
                self.size_changed = true;
                Some(self.zoom_notice())
            }
            PinEvent::SetOpacityLevel(level) => {
                self.opacity = match level {
                    0 => 1.0,
                    1..=9 => f64::from(level) / 10.0,
                    _ => return None,
                };
                None
            }
            PinEvent::IncreaseOpacity => Some(self.change_opacity(OPACITY_STEP)),
            PinEvent::DecreaseOpacity => Some(self.change_opacity(-OPACITY_STEP)),
            PinEvent::HideShadow => {
                self.shadow_enabled = false;
                None
            }
            PinEvent::Repainted => {
                self.size_changed = false;
                None
            }
        }
    }
}

/// Apply one event to `state`.
pub fn transition(state: &PinState, event: &PinEvent) -> Transition {
    let mut next = state.clone();
    let notice = next.apply(event);
    Transition {
        state: next,
        notice,
    }
}
