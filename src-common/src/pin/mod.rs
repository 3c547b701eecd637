//! Pinned images: interaction state, state hand-off and the pin itself.

mod host;
mod pack;
mod state;

pub use host::*;
pub use state::*;

use std::sync::Arc;

use image::RgbaImage;

use crate::request::{CaptureRequest, ExportTask};
use crate::types::{CaptureMode, Rect};
use crate::wire::WireError;

/// A pinned image with its placement and interaction state.
pub struct Pin {
    image: RgbaImage,
    geometry: Rect,
    state: PinState,
    sink: Arc<dyn MessageSink>,
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pin")
            .field("image", &self.image.dimensions())
            .field("geometry", &self.geometry)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Pin {
    /// Open a pin with default state.
    pub fn new(image: RgbaImage, geometry: Rect, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            image,
            geometry,
            state: PinState::default(),
            sink,
        }
    }

    /// Open a pin from state handed over by another pin.
    pub fn restore(
        image: RgbaImage,
        geometry: Rect,
        packed: &[u8],
        sink: Arc<dyn MessageSink>,
    ) -> Result<Self, WireError> {
        Ok(Self {
            image,
            geometry,
            state: PinState::unpack(packed)?,
            sink,
        })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn state(&self) -> &PinState {
        &self.state
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.geometry.x = x;
        self.geometry.y = y;
    }

    /// Feed one input event through the state machine.
    ///
    /// A click-through pin ignores pointer input; returns `false` when the
    /// event was dropped for that reason.
    pub fn handle(&mut self, event: PinEvent) -> bool {
        if self.state.mouse_transparent && event.is_pointer() {
            return false;
        }
        let Transition { state, notice } = transition(&self.state, &event);
        self.state = state;
        if let Some(notice) = notice {
            self.sink.notify_transient(&notice.to_string());
        }
        true
    }

    /// Repaint plan for a surface capped at `max`, if one is due.
    pub fn take_render_plan(&mut self, max: (u32, u32)) -> Option<RenderPlan> {
        self.state.take_render_plan(self.image.dimensions(), max)
    }

    pub fn is_mouse_transparent(&self) -> bool {
        self.state.mouse_transparent
    }

    pub fn displayed_opacity(&self) -> f64 {
        self.state.displayed_opacity()
    }

    /// Switch to click-through in place. Returns the opacity to display.
    pub fn enter_mouse_transparent(&mut self) -> f64 {
        self.state.mouse_transparent = true;
        self.state.displayed_opacity()
    }

    /// Leave click-through mode.
    ///
    /// Returns the pin untouched when it is not click-through. Otherwise the
    /// pin is packed, handed to `host` to be recreated as a normal window,
    /// and consumed.
    pub fn leave_mouse_transparent(self, host: &mut dyn PinHost) -> Option<Pin> {
        if !self.state.mouse_transparent {
            return Some(self);
        }
        let packed = self.state.pack();
        host.recreate_pin(self.image, self.geometry, packed);
        None
    }

    /// Toggle click-through; see [`Pin::leave_mouse_transparent`].
    pub fn set_mouse_transparent(mut self, on: bool, host: &mut dyn PinHost) -> Option<Pin> {
        if on {
            self.enter_mouse_transparent();
            Some(self)
        } else {
            self.leave_mouse_transparent(host)
        }
    }

    /// Open an independent copy at the same transform.
    pub fn clone_into(&self, host: &mut dyn PinHost) {
        host.recreate_pin(self.image.clone(), self.geometry, self.state.pack());
    }

    /// Request to re-capture the pinned area and pin the result.
    pub fn edit_request(&self) -> CaptureRequest {
        let mut request = CaptureRequest::new(CaptureMode::Graphical);
        request.add_task(ExportTask::Pin);
        request.set_initial_selection(self.geometry);
        request
    }
}
