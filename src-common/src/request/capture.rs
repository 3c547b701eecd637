//! Capture request value and its marker-bracketed wire codec.
//!
//! Wire layout (all integers big-endian, see [`crate::wire`]):
//! ```text
//! ┌──────┬──────┬───────┬──────┬───────┬──────────────┬──────────────┬──────┐
//! │ "F0" │ mode │ delay │ path │ tasks │ pin geometry │ selection    │ "F9" │
//! │ str  │ i32  │ u32   │ str  │ i32   │ 4 x i32      │ 4 x i32      │ str  │
//! └──────┴──────┴───────┴──────┴───────┴──────────────┴──────────────┴──────┘
//! ```
//! Field order is fixed for compatibility with existing senders.

use crate::request::tasks::{ExportTask, TaskFlags};
use crate::types::{CaptureMode, Rect};
use crate::wire::{WireError, WireReader, WireWriter};

/// Sentinel written before the first field.
pub const START_MARKER: &str = "F0";

/// Sentinel written after the last field.
pub const END_MARKER: &str = "F9";

/// What to capture and what to do with the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRequest {
    mode: CaptureMode,
    delay_ms: u32,
    path: String,
    payload: Vec<u8>,
    tasks: TaskFlags,
    initial_selection: Rect,
    pin_window_geometry: Rect,
}

impl CaptureRequest {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Attach opaque data for the dispatcher. Not carried on the wire.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Save destination. Only meaningful when the Save task is set.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn tasks(&self) -> TaskFlags {
        self.tasks
    }

    pub fn initial_selection(&self) -> Rect {
        self.initial_selection
    }

    pub fn pin_window_geometry(&self) -> Rect {
        self.pin_window_geometry
    }

    /// Add any task except Save.
    ///
    /// # Panics
    ///
    /// Panics when `task` is [`ExportTask::Save`]; a save needs a path, use
    /// [`CaptureRequest::add_save_task`].
    pub fn add_task(&mut self, task: ExportTask) {
        assert!(
            task != ExportTask::Save,
            "Save task must be added using add_save_task"
        );
        self.tasks.insert(task);
    }

    /// Clear a task. Removing an absent task is a no-op; `path` and the pin
    /// geometry are left as they are.
    pub fn remove_task(&mut self, task: ExportTask) {
        self.tasks.remove(task);
    }

    /// Set the Save task together with its destination.
    pub fn add_save_task(&mut self, path: impl Into<String>) {
        self.tasks.insert(ExportTask::Save);
        self.path = path.into();
    }

    /// Set the Pin task together with the pin window placement.
    pub fn add_pin_task(&mut self, geometry: Rect) {
        self.tasks.insert(ExportTask::Pin);
        self.pin_window_geometry = geometry;
    }

    pub fn set_initial_selection(&mut self, selection: Rect) {
        self.initial_selection = selection;
    }

    /// Serialize to the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.put_str(START_MARKER)
            .put_i32(self.mode.as_i32())
            .put_u32(self.delay_ms)
            .put_str(&self.path)
            .put_i32(self.tasks.bits() as i32)
            .put_rect(&self.pin_window_geometry)
            .put_rect(&self.initial_selection)
            .put_str(END_MARKER);
        w.into_bytes()
    }

    /// Overwrite this request from `bytes`.
    ///
    /// Every field is read before anything is assigned; if the buffer is
    /// short or either marker is wrong, `self` is left exactly as it was.
    /// The payload is never touched.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let mut r = WireReader::new(bytes);
        let start = r.string()?;
        let mode = r.i32()?;
        let delay_ms = r.u32()?;
        let path = r.string()?;
        let tasks = r.i32()?;
        let pin_window_geometry = r.rect()?;
        let initial_selection = r.rect()?;
        let end = r.string()?;

        check_marker(START_MARKER, start)?;
        check_marker(END_MARKER, end)?;
        let mode = CaptureMode::from_i32(mode).ok_or(WireError::UnknownMode(mode))?;

        self.mode = mode;
        self.delay_ms = delay_ms;
        self.path = path;
        self.tasks = TaskFlags::from_bits(tasks as u32);
        self.pin_window_geometry = pin_window_geometry;
        self.initial_selection = initial_selection;
        Ok(())
    }

    /// Decode into a fresh request.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let mut request = Self::default();
        request.decode(bytes)?;
        Ok(request)
    }
}

fn check_marker(expected: &'static str, found: String) -> Result<(), WireError> {
    if found == expected {
        Ok(())
    } else {
        Err(WireError::BadMarker { expected, found })
    }
}
