//! CLI command implementations.

use crate::client::{ServiceClient, ServiceError};
use crate::colors;
use crate::exit_codes::ExitCode;
use crate::{CaptureOptions, PinAction, Toggle};
use pinshot_common::ipc::{CaptureSummary, PinInput, PinSummary, Request, Response, ServiceStatus};
use pinshot_common::request::{CaptureRequest, ExportTask};
use pinshot_common::CaptureMode;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl Output {
    fn fail(&self, e: &ServiceError) -> ExitCode {
        if !self.quiet {
            eprintln!("{}", colors::error(&e.to_string()));
        }
        e.to_exit_code()
    }

    fn unexpected(&self, response: &Response) -> ExitCode {
        if !self.quiet {
            eprintln!(
                "{}",
                colors::error(&format!("Unexpected response: {:?}", response))
            );
        }
        ExitCode::GeneralError
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("Failed to encode JSON: {}", e)));
            ExitCode::GeneralError
        }
    }
}

async fn connect(output: Output) -> Result<ServiceClient, ExitCode> {
    let client = ServiceClient::new();
    match client.connect_or_spawn().await {
        Ok(()) => Ok(client),
        Err(e) => Err(output.fail(&e)),
    }
}

/// Build the capture request for `mode` from command-line options.
///
/// Screen and full captures with no export option are saved, leaving the
/// destination to the service's configured save directory.
pub fn build_request(mode: CaptureMode, options: &CaptureOptions, delay_ms: u32) -> CaptureRequest {
    let mut request = CaptureRequest::new(mode).with_delay(delay_ms);

    if let Some(path) = &options.path {
        request.add_save_task(path.clone());
    }
    if options.clipboard {
        request.add_task(ExportTask::Copy);
    }
    if options.raw {
        request.add_task(ExportTask::PrintRaw);
    }
    if options.print_geometry {
        request.add_task(ExportTask::PrintGeometry);
    }
    if options.upload {
        request.add_task(ExportTask::Upload);
    }
    if options.accept_on_select {
        request.add_task(ExportTask::AcceptOnSelect);
    }
    if options.pin {
        request.add_pin_task(options.region.unwrap_or_default());
    }
    if let Some(region) = options.region {
        request.set_initial_selection(region);
    }

    if mode != CaptureMode::Graphical && request.tasks().is_empty() {
        request.add_save_task("");
    }
    request
}

/// Send a capture request.
pub async fn capture(mode: CaptureMode, options: CaptureOptions, output: Output) -> ExitCode {
    let client = match connect(output).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let delay_ms = match options.delay {
        None => 0,
        Some(Some(ms)) => ms,
        Some(None) => match client.request(Request::GetStatus).await {
            Ok(Response::Status(status)) => status.delay_take_screenshot_ms,
            Ok(other) => return output.unexpected(&other),
            Err(e) => return output.fail(&e),
        },
    };

    if options.pin && options.region.is_none() && !output.quiet {
        eprintln!(
            "{}",
            colors::warning("--pin without --region leaves pin placement to the service")
        );
    }

    let request = build_request(mode, &options, delay_ms);
    if output.verbose {
        eprintln!(
            "{}",
            colors::dim_err(&format!("Sending {}-byte capture request", request.encode().len()))
        );
    }

    match client.request(Request::capture(&request)).await {
        Ok(response) => print_response(response, output),
        Err(e) => output.fail(&e),
    }
}

/// Resolve a relative path against the working directory, since the
/// service runs elsewhere.
fn absolute_path(raw: &str) -> String {
    let path = Path::new(raw);
    if path.is_absolute() {
        return raw.to_string();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}

/// Translate a pin action into its request.
pub fn pin_request(action: PinAction) -> Request {
    let input = |id: u64, input: PinInput| Request::PinInput { id, input };
    match action {
        PinAction::Open { image, x, y } => Request::OpenPin {
            image_path: absolute_path(&image),
            x,
            y,
            state: None,
        },
        PinAction::List => Request::ListPins,
        PinAction::Wheel {
            id,
            delta,
            modifier,
            phase,
        } => input(
            id,
            PinInput::Wheel {
                delta_y: delta,
                modifier,
                phase: phase.into(),
            },
        ),
        PinAction::Pinch { id, total, last } => input(
            id,
            PinInput::Pinch {
                total_scale_factor: total,
                last_scale_factor: last,
            },
        ),
        PinAction::Finish { id } => input(id, PinInput::GestureFinished),
        PinAction::Opacity { id, level } => input(id, level),
        PinAction::HideShadow { id } => input(id, PinInput::HideShadow),
        PinAction::Clone { id } => Request::ClonePin { id },
        PinAction::Close { id } => Request::ClosePin { id },
        PinAction::Edit { id } => Request::EditPin { id },
        PinAction::Save { id, path } => Request::SavePin {
            id,
            path: path.as_deref().map(absolute_path).unwrap_or_default(),
        },
        PinAction::Transparent { id, mode } => Request::SetMouseTransparent {
            id,
            enabled: mode == Toggle::On,
        },
        PinAction::UnsetTransparent => Request::UnsetAllMouseTransparent,
    }
}

/// Run a pin command.
pub async fn pin(action: PinAction, output: Output) -> ExitCode {
    let client = match connect(output).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    match client.request(pin_request(action)).await {
        Ok(response) => print_response(response, output),
        Err(e) => output.fail(&e),
    }
}

fn print_response(response: Response, output: Output) -> ExitCode {
    if output.json {
        return print_json(&response);
    }
    if output.quiet {
        return match response {
            Response::Error { .. } => ExitCode::GeneralError,
            _ => ExitCode::Success,
        };
    }

    match response {
        Response::CaptureAccepted(summary) => print_capture(&summary),
        Response::PinOpened { pin } => {
            println!("{}", colors::success("Pinned:"));
            print_pins(&[pin]);
        }
        Response::Pin { pin } => print_pins(&[pin]),
        Response::Pins { pins } if pins.is_empty() => {
            println!("{}", colors::dim("No open pins."));
        }
        Response::Pins { pins } => print_pins(&pins),
        Response::PinClosed { id } => {
            println!(
                "{} {}",
                colors::success("Closed pin"),
                colors::number(&id.to_string())
            );
        }
        Response::PinSaved { id, path } => {
            println!(
                "{} {} {} {}",
                colors::success("Saved pin"),
                colors::number(&id.to_string()),
                colors::success("to"),
                colors::path(&path)
            );
        }
        Response::PinReplaced { old_id, pin } => {
            println!(
                "{} {} {} {}",
                colors::info("Pin"),
                colors::number(&old_id.to_string()),
                colors::info("is now pin"),
                colors::number(&pin.id.to_string())
            );
            print_pins(&[pin]);
        }
        other => return output.unexpected(&other),
    }
    ExitCode::Success
}

fn print_capture(summary: &CaptureSummary) {
    println!(
        "{} {}",
        colors::info("Capture accepted:"),
        colors::bold(summary.mode.as_str())
    );
    if summary.delay_ms > 0 {
        println!("  {} {} ms", colors::bold("Delay:  "), summary.delay_ms);
    }
    let tasks: Vec<String> = summary
        .tasks
        .iter()
        .map(|task| colors::task(task.as_str()))
        .collect();
    if tasks.is_empty() {
        println!("  {} {}", colors::bold("Tasks:  "), colors::dim("none"));
    } else {
        println!("  {} {}", colors::bold("Tasks:  "), tasks.join(", "));
    }
    if let Some(path) = &summary.path {
        let path = if path.is_empty() {
            colors::dim("(unset)")
        } else {
            colors::path(path)
        };
        println!("  {} {}", colors::bold("Save to:"), path);
    }
    if let Some(selection) = summary.selection {
        println!("  {} {}", colors::bold("Region: "), selection);
    }
    if let Some(geometry) = summary.pin_geometry {
        if geometry.is_null() {
            println!("  {} {}", colors::bold("Pin at: "), colors::dim("(unset)"));
        } else {
            println!("  {} {}", colors::bold("Pin at: "), geometry);
        }
    }
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn print_pins(pins: &[PinSummary]) {
    let geometry_width = pins
        .iter()
        .map(|p| p.geometry.to_string().len())
        .max()
        .unwrap_or(0)
        .max("GEOMETRY".len());
    let widths = [4, geometry_width, 8, 8, 6, 13];

    let headings = ["ID", "GEOMETRY", "ZOOM", "OPACITY", "SHADOW", "CLICK-THROUGH"];
    let mut line: Vec<String> = headings
        .iter()
        .zip(widths)
        .map(|(heading, width)| colors::cell(heading, width, colors::header))
        .collect();
    line.push(colors::header("SIZE"));
    println!("{}", line.join("  "));

    let mut rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    rule.push("-".repeat(4));
    println!("{}", rule.join("  "));

    for pin in pins {
        let row = [
            colors::cell(&pin.id.to_string(), widths[0], colors::number),
            colors::cell(&pin.geometry.to_string(), widths[1], str::to_string),
            colors::cell(&percent(pin.zoom_percent), widths[2], colors::figure),
            colors::cell(&percent(pin.opacity * 100.0), widths[3], colors::figure),
            colors::cell(yes_no(pin.shadow_enabled), widths[4], |_| {
                colors::flag(pin.shadow_enabled)
            }),
            colors::cell(yes_no(pin.mouse_transparent), widths[5], |_| {
                colors::flag(pin.mouse_transparent)
            }),
            format!("{}x{}", pin.render_width, pin.render_height),
        ];
        println!("{}", row.join("  "));
    }
}

fn yes_no(on: bool) -> &'static str {
    if on {
        "yes"
    } else {
        "no"
    }
}

/// Show service status.
pub async fn status(output: Output) -> ExitCode {
    let client = ServiceClient::new();

    if let Err(e) = client.connect().await {
        if output.json {
            return print_json(&StatusReport::unavailable(&e));
        }
        return output.fail(&e);
    }

    if output.verbose {
        if let Ok(latency) = client.ping().await {
            eprintln!(
                "{}",
                colors::dim_err(&format!("Service answered in {:?}", latency))
            );
        }
    }

    match client.request(Request::GetStatus).await {
        Ok(Response::Status(status)) => {
            if output.json {
                return print_json(&StatusReport::running(status));
            }
            println!("{} {}", colors::bold("Service:"), colors::success("running"));
            println!(
                "{} {}",
                colors::bold("Pins:"),
                colors::number(&status.pins.to_string())
            );
            println!(
                "{} {}",
                colors::bold("Click-through:"),
                colors::number(&status.mouse_transparent.to_string())
            );
            println!(
                "{} {} ms",
                colors::bold("Capture delay:"),
                status.delay_take_screenshot_ms
            );
            if let Some(notice) = &status.last_notice {
                println!("{} {}", colors::bold("Last notice:"), notice);
            }
            ExitCode::Success
        }
        Ok(other) => output.unexpected(&other),
        Err(e) => output.fail(&e),
    }
}

#[derive(Serialize)]
struct StatusReport {
    status: &'static str,
    #[serde(flatten)]
    service: Option<ServiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StatusReport {
    fn running(status: ServiceStatus) -> Self {
        Self {
            status: "running",
            service: Some(status),
            error: None,
        }
    }

    fn unavailable(e: &ServiceError) -> Self {
        Self {
            status: "service_unavailable",
            service: None,
            error: Some(e.to_string()),
        }
    }
}

/// Stop the service.
pub async fn stop(output: Output) -> ExitCode {
    let client = ServiceClient::new();

    if client.connect().await.is_err() {
        if output.json {
            println!(r#"{{"status": "not_running"}}"#);
        } else if !output.quiet {
            println!("{}", colors::dim("Service is not running."));
        }
        return ExitCode::Success;
    }

    match client.request(Request::Shutdown).await {
        Ok(Response::Ok) => {
            if output.json {
                println!(r#"{{"status": "stopped"}}"#);
            } else if !output.quiet {
                println!("{}", colors::success("Service stopped."));
            }
            ExitCode::Success
        }
        Ok(other) => output.unexpected(&other),
        Err(e) => output.fail(&e),
    }
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(r#"{{"version": "{}"}}"#, version);
    } else {
        println!("{} {}", colors::bold("pinshot"), version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhaseArg;
    use pinshot_common::pin::ScrollPhase;
    use pinshot_common::Rect;

    #[test]
    fn test_screen_without_tasks_saves() {
        let request = build_request(CaptureMode::Screen, &CaptureOptions::default(), 0);
        assert_eq!(request.tasks().iter().collect::<Vec<_>>(), vec![ExportTask::Save]);
        assert_eq!(request.path(), "");
    }

    #[test]
    fn test_gui_without_tasks_stays_empty() {
        let request = build_request(CaptureMode::Graphical, &CaptureOptions::default(), 0);
        assert!(request.tasks().is_empty());
    }

    #[test]
    fn test_all_options() {
        let options = CaptureOptions {
            delay: Some(Some(750)),
            path: Some("/tmp/out.png".to_string()),
            clipboard: true,
            pin: true,
            upload: true,
            raw: true,
            print_geometry: true,
            accept_on_select: true,
            region: Some(Rect::new(1, 2, 30, 40)),
        };
        let request = build_request(CaptureMode::Graphical, &options, 750);

        assert_eq!(request.delay_ms(), 750);
        assert_eq!(request.path(), "/tmp/out.png");
        assert_eq!(request.tasks().bits(), 127);
        assert_eq!(request.initial_selection(), Rect::new(1, 2, 30, 40));
        assert_eq!(request.pin_window_geometry(), Rect::new(1, 2, 30, 40));
    }

    #[test]
    fn test_clipboard_only_full_capture_is_not_saved() {
        let options = CaptureOptions {
            clipboard: true,
            ..CaptureOptions::default()
        };
        let request = build_request(CaptureMode::Full, &options, 0);
        assert!(!request.tasks().contains(ExportTask::Save));
    }

    #[test]
    fn test_pin_requests() {
        let request = pin_request(PinAction::Wheel {
            id: 4,
            delta: 120,
            modifier: true,
            phase: PhaseArg::End,
        });
        match request {
            Request::PinInput { id, input } => {
                assert_eq!(id, 4);
                assert_eq!(
                    input,
                    PinInput::Wheel {
                        delta_y: 120,
                        modifier: true,
                        phase: ScrollPhase::End,
                    }
                );
            }
            other => panic!("Expected PinInput, got {:?}", other),
        }

        assert!(matches!(
            pin_request(PinAction::Transparent {
                id: 2,
                mode: Toggle::On
            }),
            Request::SetMouseTransparent {
                id: 2,
                enabled: true
            }
        ));
        assert!(matches!(
            pin_request(PinAction::Edit { id: 9 }),
            Request::EditPin { id: 9 }
        ));
    }

    #[test]
    fn test_save_request_paths() {
        match pin_request(PinAction::Save {
            id: 3,
            path: Some("out.png".to_string()),
        }) {
            Request::SavePin { id, path } => {
                assert_eq!(id, 3);
                assert!(Path::new(&path).is_absolute());
                assert!(path.ends_with("out.png"));
            }
            other => panic!("Expected SavePin, got {:?}", other),
        }
        assert!(matches!(
            pin_request(PinAction::Save { id: 3, path: None }),
            Request::SavePin { id: 3, ref path } if path.is_empty()
        ));
    }

    #[test]
    fn test_open_makes_path_absolute() {
        match pin_request(PinAction::Open {
            image: "shot.png".to_string(),
            x: 0,
            y: 0,
        }) {
            Request::OpenPin { image_path, .. } => {
                assert!(Path::new(&image_path).is_absolute());
                assert!(image_path.ends_with("shot.png"));
            }
            other => panic!("Expected OpenPin, got {:?}", other),
        }
    }
}
