//! Configuration management for the pinshot daemon.
//!
//! Loads `config.json` from the platform config directory:
//! - Linux: `~/.config/pinshot/config.json`
//! - macOS: `~/Library/Application Support/pinshot/config.json`
//! - Windows: `%APPDATA%\pinshot\config\config.json`

use directories::ProjectDirs;
use pinshot_common::{Rect, ScreenInfo};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Capture-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Reuse the last selection when a graphical capture has none.
    #[serde(default)]
    pub save_last_region: bool,
    /// Where saves with a directory (or no) destination go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_directory: Option<String>,
    /// Delay applied to delayed captures, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_take_screenshot_ms: u32,
}

fn default_delay_ms() -> u32 {
    3000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            save_last_region: false,
            save_directory: None,
            delay_take_screenshot_ms: default_delay_ms(),
        }
    }
}

/// Metrics of the screen pins are shown on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenConfig {
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

fn default_width() -> i32 {
    1920
}

fn default_height() -> i32 {
    1080
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: default_device_pixel_ratio(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl ScreenConfig {
    pub fn screen_info(&self) -> ScreenInfo {
        let ratio = self.device_pixel_ratio;
        let device_pixel_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            warn!("Ignoring invalid device_pixel_ratio {}", ratio);
            default_device_pixel_ratio()
        };
        ScreenInfo {
            device_pixel_ratio,
            bounds: Rect::new(0, 0, self.width.max(0), self.height.max(0)),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceConfig {
    /// Capture settings group.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Screen settings group.
    #[serde(default)]
    pub screen: ScreenConfig,
}

/// Get the path to the config file.
fn get_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pinshot").map(|dirs| dirs.config_dir().join("config.json"))
}

/// Load configuration from the platform config directory.
/// Returns default config if the file doesn't exist or is invalid.
pub fn load_config() -> ServiceConfig {
    match get_config_path() {
        Some(path) => load_config_from(&path),
        None => {
            warn!("Could not determine config directory, using defaults");
            ServiceConfig::default()
        }
    }
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> ServiceConfig {
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return ServiceConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<ServiceConfig>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                ServiceConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}. Using defaults.", e);
            ServiceConfig::default()
        }
    }
}
