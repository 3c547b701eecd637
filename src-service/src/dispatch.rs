//! Capture request dispatch.
//!
//! The daemon has no grabber of its own. Dispatching a request means
//! settling everything the request leaves open (where a save goes, which
//! area to preselect) and logging the resulting plan.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use pinshot_common::ipc::CaptureSummary;
use pinshot_common::pin::ScreenProvider;
use pinshot_common::request::{CaptureRequest, ExportTask};
use pinshot_common::{CaptureMode, Rect};
use tracing::{info, warn};

use crate::config::CaptureConfig;

/// File name pattern for saves into a directory.
const SCREENSHOT_FILE_FORMAT: &str = "screenshot_%Y-%m-%d_%H-%M-%S.png";

/// Executes decoded capture requests.
pub trait RequestDispatcher: Send {
    fn dispatch(&mut self, request: CaptureRequest) -> CaptureSummary;
}

/// Dispatcher that plans captures and reports them through `tracing`.
pub struct LoggingDispatcher {
    config: CaptureConfig,
    screen: Arc<dyn ScreenProvider>,
    last_region: Option<Rect>,
}

impl LoggingDispatcher {
    pub fn new(config: CaptureConfig, screen: Arc<dyn ScreenProvider>) -> Self {
        Self {
            config,
            screen,
            last_region: None,
        }
    }

    fn seed_selection(&mut self, request: &mut CaptureRequest) {
        if request.mode() == CaptureMode::Graphical
            && request.initial_selection().is_null()
            && self.config.save_last_region
        {
            if let Some(region) = self.last_region {
                info!("Reusing last region {}", region);
                request.set_initial_selection(region);
            }
        }

        let selection = request.initial_selection();
        if !selection.is_null() {
            self.last_region = Some(selection);
        }
    }

    fn settle_save_path(&self, request: &mut CaptureRequest) {
        if !request.tasks().contains(ExportTask::Save) {
            return;
        }
        let directory = self.config.save_directory.as_deref().map(Path::new);
        match resolve_save_path(request.path(), directory, Local::now()) {
            Some(path) => {
                let path = path.display().to_string();
                if path != request.path() {
                    request.add_save_task(path);
                }
            }
            None => warn!("Save task has no destination and no save_directory is configured"),
        }
    }
}

impl RequestDispatcher for LoggingDispatcher {
    fn dispatch(&mut self, mut request: CaptureRequest) -> CaptureSummary {
        self.seed_selection(&mut request);
        self.settle_save_path(&mut request);

        let tasks = request.tasks();
        info!(
            "Capture planned: mode={} delay={}ms tasks=[{}]",
            request.mode(),
            request.delay_ms(),
            tasks
        );

        if tasks.contains(ExportTask::Save) {
            info!("  save to {}", request.path());
        }
        if tasks.contains(ExportTask::Pin) {
            let geometry = request.pin_window_geometry();
            if geometry.is_null() {
                warn!("  pin requested without window geometry");
            } else {
                let logical = geometry.to_logical(&self.screen.current_screen_info());
                info!("  pin at {} (logical {})", geometry, logical);
            }
        }
        let selection = request.initial_selection();
        if !selection.is_null() {
            info!("  preselect {}", selection);
        }
        if !request.payload().is_empty() {
            info!("  payload of {} bytes", request.payload().len());
        }

        CaptureSummary::from_request(&request)
    }
}

/// Resolve where a save goes.
///
/// A path naming an existing directory, or an empty path with a configured
/// save directory, gets a timestamped file name. Any other non-empty path
/// is kept as given. Returns `None` when there is nowhere to save.
pub fn resolve_save_path(
    path: &str,
    save_directory: Option<&Path>,
    now: DateTime<Local>,
) -> Option<PathBuf> {
    let file_name = now.format(SCREENSHOT_FILE_FORMAT).to_string();
    if path.is_empty() {
        return save_directory.map(|dir| dir.join(file_name));
    }
    let path = PathBuf::from(path);
    if path.is_dir() {
        Some(path.join(file_name))
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pinshot_common::pin::StaticScreen;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap()
    }

    fn dispatcher(config: CaptureConfig) -> LoggingDispatcher {
        LoggingDispatcher::new(config, Arc::new(StaticScreen::default()))
    }

    #[test]
    fn test_resolve_explicit_file_kept() {
        let resolved = resolve_save_path("/tmp/does-not-exist/shot.png", None, fixed_time());
        assert_eq!(resolved, Some(PathBuf::from("/tmp/does-not-exist/shot.png")));
    }

    #[test]
    fn test_resolve_directory_gets_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_save_path(dir.path().to_str().unwrap(), None, fixed_time());
        assert_eq!(
            resolved,
            Some(dir.path().join("screenshot_2026-03-01_09-05-07.png"))
        );
    }

    #[test]
    fn test_resolve_empty_path() {
        assert_eq!(resolve_save_path("", None, fixed_time()), None);
        let dir = Path::new("/srv/shots");
        assert_eq!(
            resolve_save_path("", Some(dir), fixed_time()),
            Some(dir.join("screenshot_2026-03-01_09-05-07.png"))
        );
    }

    #[test]
    fn test_dispatch_saves_into_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(CaptureConfig {
            save_directory: Some(dir.path().display().to_string()),
            ..CaptureConfig::default()
        });

        let mut request = CaptureRequest::new(CaptureMode::Full);
        request.add_save_task("");
        let summary = dispatcher.dispatch(request);

        let path = PathBuf::from(summary.path.unwrap());
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.to_string_lossy().ends_with(".png"));
    }

    #[test]
    fn test_dispatch_reports_empty_save_without_rejecting() {
        let mut dispatcher = dispatcher(CaptureConfig::default());
        let mut request = CaptureRequest::new(CaptureMode::Screen);
        request.add_save_task("");
        let summary = dispatcher.dispatch(request);
        assert_eq!(summary.path.as_deref(), Some(""));
        assert_eq!(summary.tasks, vec![ExportTask::Save]);
    }

    #[test]
    fn test_last_region_reused_when_enabled() {
        let mut dispatcher = dispatcher(CaptureConfig {
            save_last_region: true,
            ..CaptureConfig::default()
        });

        let mut first = CaptureRequest::new(CaptureMode::Graphical);
        first.set_initial_selection(Rect::new(10, 10, 200, 100));
        dispatcher.dispatch(first);

        let summary = dispatcher.dispatch(CaptureRequest::new(CaptureMode::Graphical));
        assert_eq!(summary.selection, Some(Rect::new(10, 10, 200, 100)));

        // Only graphical captures are seeded
        let summary = dispatcher.dispatch(CaptureRequest::new(CaptureMode::Full));
        assert_eq!(summary.selection, None);
    }

    #[test]
    fn test_last_region_ignored_when_disabled() {
        let mut dispatcher = dispatcher(CaptureConfig::default());
        let mut first = CaptureRequest::new(CaptureMode::Graphical);
        first.set_initial_selection(Rect::new(10, 10, 200, 100));
        dispatcher.dispatch(first);

        let summary = dispatcher.dispatch(CaptureRequest::new(CaptureMode::Graphical));
        assert_eq!(summary.selection, None);
    }

    #[test]
    fn test_pin_without_geometry_is_accepted() {
        let mut dispatcher = dispatcher(CaptureConfig::default());
        let mut request = CaptureRequest::new(CaptureMode::Graphical);
        request.add_pin_task(Rect::default());
        let summary = dispatcher.dispatch(request);
        assert_eq!(summary.pin_geometry, Some(Rect::default()));
    }
}
