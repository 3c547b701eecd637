//! IPC request types.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::pin::{PinEvent, ScrollPhase};
use crate::request::CaptureRequest;
use crate::validation::{
    validate_coordinates, validate_image_path, validate_opacity_level, validate_scale_factor,
    ValidationError,
};
use crate::wire::WireError;

/// Pin input forwarded by a client.
///
/// Timestamps are added by the daemon when the input arrives, so clients
/// never need a clock shared with the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PinInput {
    Wheel {
        delta_y: i32,
        #[serde(default)]
        modifier: bool,
        #[serde(default)]
        phase: ScrollPhase,
    },
    Pinch {
        total_scale_factor: f64,
        last_scale_factor: f64,
    },
    GestureFinished,
    OpacityLevel {
        level: u8,
    },
    IncreaseOpacity,
    DecreaseOpacity,
    HideShadow,
    /// Let a pending scroll burst settle
    Tick,
}

impl PinInput {
    /// Stamp with the daemon clock.
    pub fn into_event(self, now_ms: u64) -> PinEvent {
        match self {
            PinInput::Wheel {
                delta_y,
                modifier,
                phase,
            } => PinEvent::Wheel {
                delta_y,
                modifier,
                phase,
                timestamp_ms: now_ms,
            },
            PinInput::Pinch {
                total_scale_factor,
                last_scale_factor,
            } => PinEvent::PinchUpdate {
                total_scale_factor,
                last_scale_factor,
            },
            PinInput::GestureFinished => PinEvent::GestureFinished,
            PinInput::OpacityLevel { level } => PinEvent::SetOpacityLevel(level),
            PinInput::IncreaseOpacity => PinEvent::IncreaseOpacity,
            PinInput::DecreaseOpacity => PinEvent::DecreaseOpacity,
            PinInput::HideShadow => PinEvent::HideShadow,
            PinInput::Tick => PinEvent::Tick { now_ms },
        }
    }
}

/// IPC request from client to service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    // === Capture ===
    /// Base64 of [`CaptureRequest::encode`]
    Capture { request: String },

    // === Pins ===
    /// Pin an image file at the given position
    OpenPin {
        image_path: String,
        x: i32,
        y: i32,
        /// Base64 of [`crate::pin::PinState::pack`]
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    /// List open pins
    ListPins,
    /// Forward input to a pin
    PinInput { id: u64, input: PinInput },
    /// Open an independent copy of a pin
    ClonePin { id: u64 },
    /// Close a pin
    ClosePin { id: u64 },
    /// Close a pin and re-capture its area
    EditPin { id: u64 },
    /// Write a pin's image to a file. A directory or an empty path gets a
    /// timestamped name; empty means the configured save directory.
    SavePin {
        id: u64,
        #[serde(default)]
        path: String,
    },
    /// Toggle click-through on a pin
    SetMouseTransparent { id: u64, enabled: bool },
    /// Turn click-through off on every pin
    UnsetAllMouseTransparent,

    // === Service Control ===
    /// Get daemon status
    GetStatus,
    /// Request service shutdown
    Shutdown,
    /// Ping for health check
    Ping,
}

impl Request {
    /// Wrap an encoded capture request.
    pub fn capture(request: &CaptureRequest) -> Self {
        Request::Capture {
            request: BASE64.encode(request.encode()),
        }
    }

    /// Validate all parameters in this request.
    ///
    /// Capture requests are not validated here: their only integrity check
    /// is the marker check in [`CaptureRequest::decode`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Request::OpenPin {
                image_path, x, y, ..
            } => {
                validate_image_path(image_path)?;
                validate_coordinates(*x, *y)?;
            }
            Request::PinInput { input, .. } => match input {
                PinInput::OpacityLevel { level } => validate_opacity_level(*level)?,
                PinInput::Pinch {
                    total_scale_factor,
                    last_scale_factor,
                } => {
                    validate_scale_factor("total_scale_factor", *total_scale_factor)?;
                    validate_scale_factor("last_scale_factor", *last_scale_factor)?;
                }
                _ => {}
            },
            Request::SavePin { path, .. } if !path.is_empty() => validate_image_path(path)?,
            // Other requests have no parameters to validate
            _ => {}
        }
        Ok(())
    }
}

/// Error decoding a binary field carried inside a JSON request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Field is not valid base64
    Base64(String),
    /// Decoded bytes are malformed
    Wire(WireError),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Base64(e) => write!(f, "Invalid base64: {}", e),
            PayloadError::Wire(e) => write!(f, "Malformed payload: {}", e),
        }
    }
}

impl std::error::Error for PayloadError {}

impl From<WireError> for PayloadError {
    fn from(e: WireError) -> Self {
        PayloadError::Wire(e)
    }
}

/// Decode a base64 field into raw bytes.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    BASE64
        .decode(encoded)
        .map_err(|e| PayloadError::Base64(e.to_string()))
}

/// Encode raw bytes for a base64 field.
pub fn encode_payload(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode the capture request carried by [`Request::Capture`].
pub fn decode_capture(encoded: &str) -> Result<CaptureRequest, PayloadError> {
    let bytes = decode_payload(encoded)?;
    Ok(CaptureRequest::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExportTask;
    use crate::types::{CaptureMode, Rect};

    #[test]
    fn test_capture_request_survives_json() {
        let mut capture = CaptureRequest::new(CaptureMode::Graphical).with_delay(500);
        capture.add_save_task("/tmp/x.png");
        capture.add_pin_task(Rect::new(0, 0, 100, 100));

        let json = serde_json::to_string(&Request::capture(&capture)).unwrap();
        assert!(json.starts_with(r#"{"type":"capture","request":""#));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        let Request::Capture { request } = parsed else {
            panic!("Expected Capture request");
        };
        let decoded = decode_capture(&request).unwrap();
        assert_eq!(decoded, capture);
        assert!(decoded.tasks().contains(ExportTask::Pin));
    }

    #[test]
    fn test_decode_capture_errors() {
        assert!(matches!(
            decode_capture("not base64!"),
            Err(PayloadError::Base64(_))
        ));
        assert!(matches!(
            decode_capture(&encode_payload(b"garbage")),
            Err(PayloadError::Wire(_))
        ));
    }

    #[test]
    fn test_pin_input_json_shape() {
        let json = r#"{"type":"pin_input","id":3,"input":{"kind":"wheel","delta_y":-120}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        match request {
            Request::PinInput { id, input } => {
                assert_eq!(id, 3);
                assert_eq!(
                    input,
                    PinInput::Wheel {
                        delta_y: -120,
                        modifier: false,
                        phase: ScrollPhase::NoPhase,
                    }
                );
                assert_eq!(
                    input.into_event(42),
                    PinEvent::Wheel {
                        delta_y: -120,
                        modifier: false,
                        phase: ScrollPhase::NoPhase,
                        timestamp_ms: 42,
                    }
                );
            }
            _ => panic!("Expected PinInput request"),
        }
    }

    #[test]
    fn test_validate() {
        assert!(Request::Ping.validate().is_ok());
        assert!(Request::Capture {
            request: "anything".into()
        }
        .validate()
        .is_ok());

        let open = Request::OpenPin {
            image_path: "/tmp/shot.png".into(),
            x: 100,
            y: -200,
            state: None,
        };
        assert!(open.validate().is_ok());

        let open = Request::OpenPin {
            image_path: String::new(),
            x: 0,
            y: 0,
            state: None,
        };
        assert!(open.validate().is_err());

        let save = Request::SavePin {
            id: 1,
            path: String::new(),
        };
        assert!(save.validate().is_ok());
        let save = Request::SavePin {
            id: 1,
            path: "bad\0name.png".into(),
        };
        assert!(save.validate().is_err());

        let bad_level = Request::PinInput {
            id: 1,
            input: PinInput::OpacityLevel { level: 10 },
        };
        assert!(bad_level.validate().is_err());

        let bad_pinch = Request::PinInput {
            id: 1,
            input: PinInput::Pinch {
                total_scale_factor: f64::NAN,
                last_scale_factor: 1.0,
            },
        };
        assert!(bad_pinch.validate().is_err());
    }
}
