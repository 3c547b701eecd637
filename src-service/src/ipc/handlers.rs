//! IPC request handlers.

use chrono::Local;
use image::RgbaImage;
use pinshot_common::ipc::{decode_capture, decode_payload, PinSummary, Request, Response};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::dispatch::resolve_save_path;
use crate::pins::{save_image, PinError, PinRegistry};
use crate::state::ServiceState;

/// Handle an IPC request and return a response.
pub async fn handle_request(state: &ServiceState, request: Request) -> Response {
    debug!("Handling request: {:?}", request);

    match request {
        // === Capture ===
        Request::Capture { request } => match decode_capture(&request) {
            Ok(capture) => {
                let summary = state.dispatcher.lock().await.dispatch(capture);
                Response::CaptureAccepted(summary)
            }
            Err(e) => {
                warn!("Dropping malformed capture request: {}", e);
                Response::error(format!("Malformed capture request: {}", e))
            }
        },

        // === Pins ===
        Request::OpenPin {
            image_path,
            x,
            y,
            state: packed,
        } => {
            let packed = match packed.as_deref().map(decode_payload).transpose() {
                Ok(packed) => packed,
                Err(e) => {
                    warn!("Rejecting pin state: {}", e);
                    return Response::error(format!("Invalid pin state: {}", e));
                }
            };
            let image = match load_image(image_path.clone()).await {
                Ok(image) => image,
                Err(e) => {
                    warn!("Failed to load {}: {}", image_path, e);
                    return Response::error(format!("Failed to load image: {}", e));
                }
            };
            let mut pins = state.pins.lock().await;
            let opened = pins
                .open(image, x, y, packed.as_deref())
                .and_then(|id| pins.summary(id));
            match opened {
                Ok(pin) => Response::PinOpened { pin },
                Err(e) => pin_error(e),
            }
        }
        Request::ListPins => Response::Pins {
            pins: state.pins.lock().await.list(),
        },
        Request::PinInput { id, input } => {
            let event = input.into_event(state.now_ms());
            pin_response(state.pins.lock().await.apply(id, event))
        }
        Request::ClonePin { id } => {
            let mut pins = state.pins.lock().await;
            pin_response(pins.clone_pin(id).and_then(|copy| pins.summary(copy)))
        }
        Request::ClosePin { id } => match state.pins.lock().await.close(id) {
            Ok(()) => Response::PinClosed { id },
            Err(e) => pin_error(e),
        },
        Request::EditPin { id } => {
            let edit = state.pins.lock().await.edit(id);
            match edit {
                Ok(capture) => {
                    let summary = state.dispatcher.lock().await.dispatch(capture);
                    Response::CaptureAccepted(summary)
                }
                Err(e) => pin_error(e),
            }
        }
        Request::SavePin { id, path } => {
            let directory = state.config.capture.save_directory.as_deref().map(Path::new);
            let Some(target) = resolve_save_path(&path, directory, Local::now()) else {
                return Response::error(
                    "Invalid save path: none given and no save_directory configured",
                );
            };
            let image = match state.pins.lock().await.snapshot(id) {
                Ok(image) => image,
                Err(e) => return pin_error(e),
            };
            let file = target.clone();
            match tokio::task::spawn_blocking(move || save_image(&image, &file)).await {
                Ok(Ok(())) => {
                    info!("Saved pin {} to {}", id, target.display());
                    Response::PinSaved {
                        id,
                        path: target.display().to_string(),
                    }
                }
                Ok(Err(e)) => pin_error(e),
                Err(e) => Response::error(format!("Save task failed: {}", e)),
            }
        }
        Request::SetMouseTransparent { id, enabled } => {
            let mut pins = state.pins.lock().await;
            match pins.set_mouse_transparent(id, enabled) {
                Ok(new_id) => replaced(&pins, id, new_id),
                Err(e) => pin_error(e),
            }
        }
        Request::UnsetAllMouseTransparent => {
            let mut pins = state.pins.lock().await;
            let restored = pins.unset_all_mouse_transparent();
            info!("Restored {} click-through pins", restored.len());
            Response::Pins { pins: pins.list() }
        }

        // === Service Control ===
        Request::GetStatus => Response::Status(state.status().await),
        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            crate::request_shutdown();
            Response::ok()
        }
        Request::Ping => Response::Pong,
    }
}

async fn load_image(path: String) -> Result<RgbaImage, String> {
    tokio::task::spawn_blocking(move || image::open(&path).map(|image| image.to_rgba8()))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

fn pin_response(result: Result<PinSummary, PinError>) -> Response {
    match result {
        Ok(pin) => Response::Pin { pin },
        Err(e) => pin_error(e),
    }
}

fn replaced(pins: &PinRegistry, old_id: u64, new_id: u64) -> Response {
    match pins.summary(new_id) {
        Ok(pin) if old_id == new_id => Response::Pin { pin },
        Ok(pin) => Response::PinReplaced { old_id, pin },
        Err(e) => pin_error(e),
    }
}

fn pin_error(e: PinError) -> Response {
    match e {
        PinError::UnknownPin(_) | PinError::IgnoresPointer(_) => debug!("{}", e),
        _ => error!("{}", e),
    }
    Response::error(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use pinshot_common::ipc::{encode_payload, PinInput};
    use pinshot_common::pin::{transition, PinEvent, PinState};
    use pinshot_common::request::{CaptureRequest, ExportTask};
    use pinshot_common::{CaptureMode, Rect};

    fn write_png(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("shot.png");
        RgbaImage::new(320, 200).save(&path).unwrap();
        path.display().to_string()
    }

    async fn open_pin(state: &ServiceState, image_path: String) -> PinSummary {
        let request = Request::OpenPin {
            image_path,
            x: 5,
            y: 6,
            state: None,
        };
        match handle_request(state, request).await {
            Response::PinOpened { pin } => pin,
            other => panic!("Expected PinOpened, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_capture_is_dispatched() {
        let state = ServiceState::new(ServiceConfig::default());
        let mut capture = CaptureRequest::new(CaptureMode::Graphical).with_delay(100);
        capture.add_task(ExportTask::Copy);
        capture.add_pin_task(Rect::new(0, 0, 50, 50));

        match handle_request(&state, Request::capture(&capture)).await {
            Response::CaptureAccepted(summary) => {
                assert_eq!(summary.delay_ms, 100);
                assert_eq!(summary.tasks, vec![ExportTask::Copy, ExportTask::Pin]);
                assert_eq!(summary.pin_geometry, Some(Rect::new(0, 0, 50, 50)));
            }
            other => panic!("Expected CaptureAccepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_capture_is_an_error() {
        let state = ServiceState::new(ServiceConfig::default());
        let request = Request::Capture {
            request: encode_payload(b"\x00\x00\x00\x02F1"),
        };
        assert!(handle_request(&state, request).await.is_error());
    }

    #[tokio::test]
    async fn test_pin_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServiceState::new(ServiceConfig::default());
        let pin = open_pin(&state, write_png(&dir)).await;
        assert_eq!(pin.geometry, Rect::new(5, 6, 320, 200));

        let input = Request::PinInput {
            id: pin.id,
            input: PinInput::OpacityLevel { level: 3 },
        };
        match handle_request(&state, input).await {
            Response::Pin { pin } => assert!((pin.opacity - 0.3).abs() < 1e-9),
            other => panic!("Expected Pin, got {:?}", other),
        }

        let on = Request::SetMouseTransparent {
            id: pin.id,
            enabled: true,
        };
        assert!(matches!(
            handle_request(&state, on).await,
            Response::Pin { .. }
        ));

        let new_id = match handle_request(&state, Request::UnsetAllMouseTransparent).await {
            Response::Pins { pins } => {
                assert_eq!(pins.len(), 1);
                assert!(!pins[0].mouse_transparent);
                assert!((pins[0].opacity - 0.3).abs() < 1e-9);
                pins[0].id
            }
            other => panic!("Expected Pins, got {:?}", other),
        };
        assert_ne!(new_id, pin.id);

        match handle_request(&state, Request::ClosePin { id: new_id }).await {
            Response::PinClosed { id } => assert_eq!(id, new_id),
            other => panic!("Expected PinClosed, got {:?}", other),
        }
        assert_eq!(state.status().await.pins, 0);
    }

    #[tokio::test]
    async fn test_open_pin_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServiceState::new(ServiceConfig::default());

        let packed = transition(&PinState::default(), &PinEvent::HideShadow).state;
        let request = Request::OpenPin {
            image_path: write_png(&dir),
            x: 0,
            y: 0,
            state: Some(encode_payload(&packed.pack())),
        };
        match handle_request(&state, request).await {
            Response::PinOpened { pin } => assert!(!pin.shadow_enabled),
            other => panic!("Expected PinOpened, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_missing_image_fails() {
        let state = ServiceState::new(ServiceConfig::default());
        let request = Request::OpenPin {
            image_path: "/nonexistent/shot.png".to_string(),
            x: 0,
            y: 0,
            state: None,
        };
        assert!(handle_request(&state, request).await.is_error());
    }

    #[tokio::test]
    async fn test_edit_pin_dispatches_recapture() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServiceState::new(ServiceConfig::default());
        let pin = open_pin(&state, write_png(&dir)).await;

        match handle_request(&state, Request::EditPin { id: pin.id }).await {
            Response::CaptureAccepted(summary) => {
                assert_eq!(summary.mode, CaptureMode::Graphical);
                assert_eq!(summary.selection, Some(pin.geometry));
                assert_eq!(summary.tasks, vec![ExportTask::Pin]);
            }
            other => panic!("Expected CaptureAccepted, got {:?}", other),
        }
        assert_eq!(state.status().await.pins, 0);
    }

    #[tokio::test]
    async fn test_save_pin() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.capture.save_directory = Some(dir.path().display().to_string());
        let state = ServiceState::new(config);
        let pin = open_pin(&state, write_png(&dir)).await;

        let explicit = dir.path().join("copy.png").display().to_string();
        let request = Request::SavePin {
            id: pin.id,
            path: explicit.clone(),
        };
        match handle_request(&state, request).await {
            Response::PinSaved { id, path } => {
                assert_eq!(id, pin.id);
                assert_eq!(path, explicit);
            }
            other => panic!("Expected PinSaved, got {:?}", other),
        }
        assert!(Path::new(&explicit).exists());

        // No path: timestamped file in the save directory
        let request = Request::SavePin {
            id: pin.id,
            path: String::new(),
        };
        match handle_request(&state, request).await {
            Response::PinSaved { path, .. } => {
                let path = Path::new(&path);
                assert_eq!(path.parent(), Some(dir.path()));
                assert!(path.exists());
            }
            other => panic!("Expected PinSaved, got {:?}", other),
        }

        let unknown = Request::SavePin {
            id: 99,
            path: explicit,
        };
        assert!(handle_request(&state, unknown).await.is_error());
    }

    #[tokio::test]
    async fn test_save_pin_without_destination() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServiceState::new(ServiceConfig::default());
        let pin = open_pin(&state, write_png(&dir)).await;
        let request = Request::SavePin {
            id: pin.id,
            path: String::new(),
        };
        match handle_request(&state, request).await {
            Response::Error { message } => assert!(message.starts_with("Invalid save path")),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_pin() {
        let state = ServiceState::new(ServiceConfig::default());
        let response = handle_request(&state, Request::ClonePin { id: 42 }).await;
        assert!(response.is_error());
    }
}
