//! IPC response types.

use serde::{Deserialize, Serialize};

use crate::pin::Pin;
use crate::request::{CaptureRequest, ExportTask};
use crate::types::{CaptureMode, Rect};

/// What the daemon made of a capture request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub mode: CaptureMode,
    pub delay_ms: u32,
    pub tasks: Vec<ExportTask>,
    /// Resolved save destination, when saving
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Initial selection, when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Rect>,
    /// Pin placement, when pinning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_geometry: Option<Rect>,
}

impl CaptureSummary {
    pub fn from_request(request: &CaptureRequest) -> Self {
        let tasks = request.tasks();
        let non_null = |rect: Rect| (!rect.is_null()).then_some(rect);
        Self {
            mode: request.mode(),
            delay_ms: request.delay_ms(),
            tasks: tasks.iter().collect(),
            path: tasks
                .contains(ExportTask::Save)
                .then(|| request.path().to_string()),
            selection: non_null(request.initial_selection()),
            pin_geometry: tasks
                .contains(ExportTask::Pin)
                .then(|| request.pin_window_geometry()),
        }
    }
}

/// Snapshot of one pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinSummary {
    pub id: u64,
    pub geometry: Rect,
    /// Committed zoom times the in-flight step, in percent
    pub zoom_percent: f64,
    pub opacity: f64,
    pub displayed_opacity: f64,
    pub shadow_enabled: bool,
    pub mouse_transparent: bool,
    /// Size the image is rendered at on the daemon's screen
    pub render_width: u32,
    pub render_height: u32,
}

impl PinSummary {
    /// Summarize `pin` as rendered on a surface capped at `max`.
    pub fn describe(id: u64, pin: &Pin, max: (u32, u32)) -> Self {
        let state = pin.state();
        let (render_width, render_height) = state.fitted_size(pin.image().dimensions(), max);
        Self {
            id,
            geometry: pin.geometry(),
            zoom_percent: state.effective_scale() * 100.0,
            opacity: state.opacity(),
            displayed_opacity: state.displayed_opacity(),
            shadow_enabled: state.shadow_enabled(),
            mouse_transparent: state.is_mouse_transparent(),
            render_width,
            render_height,
        }
    }
}

/// Daemon status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub pins: usize,
    pub mouse_transparent: usize,
    /// Last floating notice shown by any pin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notice: Option<String>,
    /// Configured delay for delayed captures
    pub delay_take_screenshot_ms: u32,
}

/// IPC response from service to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    // === Success Responses ===
    /// Capture request decoded and dispatched
    CaptureAccepted(CaptureSummary),
    /// New pin opened
    PinOpened { pin: PinSummary },
    /// All open pins
    Pins { pins: Vec<PinSummary> },
    /// One pin after an update
    Pin { pin: PinSummary },
    /// Pin closed
    PinClosed { id: u64 },
    /// Pin image written to `path`
    PinSaved { id: u64, path: String },
    /// Pin handed off to a new instance
    PinReplaced { old_id: u64, pin: PinSummary },
    /// Daemon status
    Status(ServiceStatus),
    /// Generic success
    Ok,
    /// Pong response to ping
    Pong,

    // === Error Response ===
    /// Error occurred (message is sanitized - no internal details)
    Error { message: String },
}

impl Response {
    /// Create an error response with a sanitized message.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Create a success response.
    pub fn ok() -> Self {
        Response::Ok
    }

    /// Check if this response indicates an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
