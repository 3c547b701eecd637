//! Shared geometry and capture types.

use serde::{Deserialize, Serialize};

/// Rectangle in screen coordinates.
///
/// A rectangle with zero width and zero height is *null* and means
/// "not set" wherever a geometry is optional (initial selection, pin
/// placement).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when both width and height are zero.
    pub fn is_null(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// True when the rectangle covers no pixels (including negative sizes).
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Convert physical pixel geometry to logical coordinates on `screen`.
    ///
    /// The offset relative to the screen origin and the size are divided by
    /// the device pixel ratio; the screen origin itself stays put.
    pub fn to_logical(&self, screen: &ScreenInfo) -> Rect {
        let ratio = screen.device_pixel_ratio;
        if !(ratio.is_finite() && ratio > 0.0) || (ratio - 1.0).abs() < f64::EPSILON {
            return *self;
        }
        let origin_x = screen.bounds.x;
        let origin_y = screen.bounds.y;
        Rect {
            x: (f64::from(self.x - origin_x) / ratio) as i32 + origin_x,
            y: (f64::from(self.y - origin_y) / ratio) as i32 + origin_y,
            width: (f64::from(self.width) / ratio) as i32,
            height: (f64::from(self.height) / ratio) as i32,
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl std::str::FromStr for Rect {
    type Err = String;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,width,height, got '{}'", s));
        }
        let mut values = [0i32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{}' is not an integer", part))?;
        }
        Ok(Rect::new(values[0], values[1], values[2], values[3]))
    }
}

/// Information about the screen a pin lives on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    /// Scale factor (e.g., 2.0 for HiDPI displays)
    pub device_pixel_ratio: f64,
    /// Screen bounds in logical coordinates
    pub bounds: Rect,
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            bounds: Rect::new(0, 0, 1920, 1080),
        }
    }
}

/// Capture strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum CaptureMode {
    /// Interactive region selection
    #[default]
    Graphical = 0,
    /// A single screen
    Screen = 1,
    /// All screens
    Full = 2,
}

impl CaptureMode {
    /// Wire representation.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(CaptureMode::Graphical),
            1 => Some(CaptureMode::Screen),
            2 => Some(CaptureMode::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Graphical => "graphical",
            CaptureMode::Screen => "screen",
            CaptureMode::Full => "full",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_rect() {
        assert!(Rect::default().is_null());
        assert!(!Rect::new(0, 0, 10, 0).is_null());
        assert!(Rect::new(0, 0, 10, 0).is_empty());
    }

    #[test]
    fn test_parse_rect() {
        let rect: Rect = "10, 20,300,400".parse().unwrap();
        assert_eq!(rect, Rect::new(10, 20, 300, 400));
        assert!("1,2,3".parse::<Rect>().is_err());
        assert!("a,2,3,4".parse::<Rect>().is_err());
    }

    #[test]
    fn test_to_logical() {
        let screen = ScreenInfo {
            device_pixel_ratio: 2.0,
            bounds: Rect::new(1920, 0, 1280, 800),
        };
        let physical = Rect::new(2120, 100, 400, 200);
        assert_eq!(physical.to_logical(&screen), Rect::new(2020, 50, 200, 100));

        let unscaled = ScreenInfo::default();
        assert_eq!(physical.to_logical(&unscaled), physical);
    }

    #[test]
    fn test_capture_mode_wire_values() {
        for mode in [CaptureMode::Graphical, CaptureMode::Screen, CaptureMode::Full] {
            assert_eq!(CaptureMode::from_i32(mode.as_i32()), Some(mode));
        }
        assert_eq!(CaptureMode::from_i32(7), None);
    }
}
