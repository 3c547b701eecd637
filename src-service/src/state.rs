//! Shared daemon state.
//!
//! One [`ServiceState`] is created at start-up and shared by every client
//! connection. Pins and the dispatcher each sit behind a tokio mutex, so
//! every event is applied by exactly one writer at a time.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use pinshot_common::ipc::ServiceStatus;
use pinshot_common::pin::{MessageSink, StaticScreen};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ServiceConfig;
use crate::dispatch::{LoggingDispatcher, RequestDispatcher};
use crate::pins::PinRegistry;

/// Floating pin notices, logged and remembered for `status`.
#[derive(Default)]
pub struct NoticeLog {
    last: StdMutex<Option<String>>,
}

impl NoticeLog {
    pub fn last(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

impl MessageSink for NoticeLog {
    fn notify_transient(&self, message: &str) {
        info!(target: "pinshot::notice", "{}", message);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(message.to_string());
        }
    }
}

/// State shared by all client connections.
pub struct ServiceState {
    pub config: ServiceConfig,
    pub pins: Mutex<PinRegistry>,
    pub dispatcher: Mutex<Box<dyn RequestDispatcher>>,
    notices: Arc<NoticeLog>,
    started: Instant,
}

impl ServiceState {
    pub fn new(config: ServiceConfig) -> Self {
        let screen = Arc::new(StaticScreen(config.screen.screen_info()));
        let notices = Arc::new(NoticeLog::default());
        let dispatcher = LoggingDispatcher::new(config.capture.clone(), screen.clone());
        Self {
            pins: Mutex::new(PinRegistry::new(notices.clone(), screen)),
            dispatcher: Mutex::new(Box::new(dispatcher)),
            notices,
            config,
            started: Instant::now(),
        }
    }

    /// Milliseconds since start-up, used to stamp pin input.
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub async fn status(&self) -> ServiceStatus {
        let pins = self.pins.lock().await;
        ServiceStatus {
            pins: pins.len(),
            mouse_transparent: pins.count_mouse_transparent(),
            last_notice: self.notices.last(),
            delay_take_screenshot_ms: self.config.capture.delay_take_screenshot_ms,
        }
    }
}
