//! Collaborators a pin talks to. Implemented by the daemon (or a GUI shell)
//! and by fakes in tests.

use image::RgbaImage;

use crate::types::{Rect, ScreenInfo};

/// Floating status text ("Zoom 125.0%").
pub trait MessageSink: Send + Sync {
    fn notify_transient(&self, message: &str);
}

/// Owner of pin windows; receives hand-offs.
pub trait PinHost {
    /// Open a new pin from pixels, placement and [`PinState::pack`] bytes.
    ///
    /// [`PinState::pack`]: crate::pin::PinState::pack
    fn recreate_pin(&mut self, image: RgbaImage, geometry: Rect, packed: Vec<u8>);
}

/// Source of the current screen's metrics.
pub trait ScreenProvider: Send + Sync {
    fn current_screen_info(&self) -> ScreenInfo;
}

/// Sink that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn notify_transient(&self, _message: &str) {}
}

/// Screen with fixed metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticScreen(pub ScreenInfo);

impl ScreenProvider for StaticScreen {
    fn current_screen_info(&self) -> ScreenInfo {
        self.0
    }
}
