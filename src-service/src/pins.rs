//! Open pins, keyed by id.
//!
//! The registry is the daemon's [`PinHost`]: hand-offs (leaving click-through
//! mode, cloning) land here as freshly restored pins under new ids.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use pinshot_common::ipc::PinSummary;
use pinshot_common::pin::{Interaction, MessageSink, Pin, PinEvent, PinHost, ScreenProvider};
use pinshot_common::request::CaptureRequest;
use pinshot_common::wire::WireError;
use pinshot_common::Rect;
use tracing::{debug, info, warn};

/// Error type for pin registry operations.
#[derive(Debug)]
pub enum PinError {
    /// No pin with this id
    UnknownPin(u64),
    /// Handed-over state could not be restored
    InvalidState(WireError),
    /// A hand-off produced no successor
    HandOffFailed(u64),
    /// Pointer input sent to a click-through pin
    IgnoresPointer(u64),
    /// Writing the pinned image failed
    SaveFailed { path: PathBuf, message: String },
}

impl std::fmt::Display for PinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinError::UnknownPin(id) => write!(f, "No pin with id {}", id),
            PinError::InvalidState(e) => write!(f, "Invalid pin state: {}", e),
            PinError::HandOffFailed(id) => write!(f, "Pin {} could not be recreated", id),
            PinError::SaveFailed { path, message } => {
                write!(f, "Failed to save {}: {}", path.display(), message)
            }
            PinError::IgnoresPointer(id) => {
                write!(f, "Pin {} is click-through and ignores pointer input", id)
            }
        }
    }
}

impl std::error::Error for PinError {}

impl From<WireError> for PinError {
    fn from(e: WireError) -> Self {
        PinError::InvalidState(e)
    }
}

/// All open pins.
pub struct PinRegistry {
    pins: BTreeMap<u64, Pin>,
    next_id: u64,
    sink: Arc<dyn MessageSink>,
    screen: Arc<dyn ScreenProvider>,
    /// Id given to the last pin created through [`PinHost::recreate_pin`]
    recreated: Option<u64>,
}

impl PinRegistry {
    pub fn new(sink: Arc<dyn MessageSink>, screen: Arc<dyn ScreenProvider>) -> Self {
        Self {
            pins: BTreeMap::new(),
            next_id: 1,
            sink,
            screen,
            recreated: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn insert(&mut self, pin: Pin) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pins.insert(id, pin);
        id
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Pin, PinError> {
        self.pins.get_mut(&id).ok_or(PinError::UnknownPin(id))
    }

    /// Largest size a pin may render at on the current screen.
    fn render_max(&self) -> (u32, u32) {
        let bounds = self.screen.current_screen_info().bounds;
        (bounds.width.max(0) as u32, bounds.height.max(0) as u32)
    }

    /// Open a pin at `(x, y)`, optionally restoring packed state.
    pub fn open(
        &mut self,
        image: RgbaImage,
        x: i32,
        y: i32,
        packed: Option<&[u8]>,
    ) -> Result<u64, PinError> {
        let (width, height) = image.dimensions();
        let geometry = Rect::new(x, y, width as i32, height as i32);
        let pin = match packed {
            Some(packed) => Pin::restore(image, geometry, packed, self.sink.clone())?,
            None => Pin::new(image, geometry, self.sink.clone()),
        };
        let id = self.insert(pin);
        info!("Opened pin {} at {}", id, geometry);
        Ok(id)
    }

    pub fn summary(&self, id: u64) -> Result<PinSummary, PinError> {
        let pin = self.pins.get(&id).ok_or(PinError::UnknownPin(id))?;
        Ok(PinSummary::describe(id, pin, self.render_max()))
    }

    pub fn list(&self) -> Vec<PinSummary> {
        let max = self.render_max();
        self.pins
            .iter()
            .map(|(id, pin)| PinSummary::describe(*id, pin, max))
            .collect()
    }

    /// Feed one event to a pin and repaint it if needed.
    pub fn apply(&mut self, id: u64, event: PinEvent) -> Result<PinSummary, PinError> {
        let max = self.render_max();
        let pin = self.get_mut(id)?;
        debug!("Pin {} <- {:?}", id, event);
        if !pin.handle(event) {
            return Err(PinError::IgnoresPointer(id));
        }
        if let Some(plan) = pin.take_render_plan(max) {
            let (width, height) = plan.fitted_size(pin.image().dimensions());
            debug!(
                "Repaint pin {} at {}x{} ({:?})",
                id, width, height, plan.aspect
            );
        }
        self.summary(id)
    }

    /// Commit scroll bursts that have gone quiet. Returns how many settled.
    pub fn settle(&mut self, now_ms: u64) -> usize {
        let max = self.render_max();
        let mut settled = 0;
        for (id, pin) in self.pins.iter_mut() {
            if pin.state().interaction() != Interaction::Scrolling {
                continue;
            }
            pin.handle(PinEvent::Tick { now_ms });
            if pin.state().interaction() == Interaction::Scrolling {
                continue;
            }
            settled += 1;
            if let Some(plan) = pin.take_render_plan(max) {
                let (width, height) = plan.fitted_size(pin.image().dimensions());
                debug!("Settled pin {} at {}x{}", id, width, height);
            }
        }
        settled
    }

    /// Open an independent copy of a pin. Returns the copy's id.
    pub fn clone_pin(&mut self, id: u64) -> Result<u64, PinError> {
        let pin = self.pins.remove(&id).ok_or(PinError::UnknownPin(id))?;
        self.recreated = None;
        pin.clone_into(self);
        self.pins.insert(id, pin);
        let copy = self.recreated.take().ok_or(PinError::HandOffFailed(id))?;
        info!("Cloned pin {} as {}", id, copy);
        Ok(copy)
    }

    /// Copy of a pin's pixels, for saving outside the registry lock.
    pub fn snapshot(&self, id: u64) -> Result<RgbaImage, PinError> {
        self.pins
            .get(&id)
            .map(|pin| pin.image().clone())
            .ok_or(PinError::UnknownPin(id))
    }

    pub fn close(&mut self, id: u64) -> Result<(), PinError> {
        self.pins.remove(&id).ok_or(PinError::UnknownPin(id))?;
        info!("Closed pin {}", id);
        Ok(())
    }

    /// Toggle click-through. Returns the id now holding the pin, which
    /// changes when leaving click-through recreates it.
    pub fn set_mouse_transparent(&mut self, id: u64, enabled: bool) -> Result<u64, PinError> {
        let pin = self.pins.remove(&id).ok_or(PinError::UnknownPin(id))?;
        self.recreated = None;
        match pin.set_mouse_transparent(enabled, self) {
            Some(pin) => {
                if enabled {
                    info!(
                        "Pin {} is click-through (shown at {:.0}%)",
                        id,
                        pin.displayed_opacity() * 100.0
                    );
                }
                self.pins.insert(id, pin);
                Ok(id)
            }
            None => {
                let successor = self.recreated.take().ok_or(PinError::HandOffFailed(id))?;
                info!("Pin {} left click-through as pin {}", id, successor);
                Ok(successor)
            }
        }
    }

    /// Turn click-through off everywhere. Returns `(old_id, new_id)` pairs.
    pub fn unset_all_mouse_transparent(&mut self) -> Vec<(u64, u64)> {
        let transparent: Vec<u64> = self
            .pins
            .iter()
            .filter(|(_, pin)| pin.is_mouse_transparent())
            .map(|(id, _)| *id)
            .collect();

        let mut replaced = Vec::with_capacity(transparent.len());
        for id in transparent {
            match self.set_mouse_transparent(id, false) {
                Ok(new_id) => replaced.push((id, new_id)),
                Err(e) => warn!("Failed to restore pin {}: {}", id, e),
            }
        }
        replaced
    }

    pub fn count_mouse_transparent(&self) -> usize {
        self.pins
            .values()
            .filter(|pin| pin.is_mouse_transparent())
            .count()
    }

    /// Close a pin and return the request that re-captures its area.
    pub fn edit(&mut self, id: u64) -> Result<CaptureRequest, PinError> {
        let pin = self.pins.remove(&id).ok_or(PinError::UnknownPin(id))?;
        info!("Editing pin {}", id);
        Ok(pin.edit_request())
    }
}

/// Write pinned pixels to `path`; the format follows the extension.
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<(), PinError> {
    image.save(path).map_err(|e| PinError::SaveFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl PinHost for PinRegistry {
    fn recreate_pin(&mut self, image: RgbaImage, geometry: Rect, packed: Vec<u8>) {
        match Pin::restore(image, geometry, &packed, self.sink.clone()) {
            Ok(pin) => {
                let id = self.insert(pin);
                self.recreated = Some(id);
            }
            Err(e) => warn!("Dropping pin hand-off: {}", e),
        }
    }
}
