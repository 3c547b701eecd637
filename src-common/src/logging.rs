//! Platform-specific logging directory resolution.

use std::path::PathBuf;

const APP_NAME: &str = "pinshot";

/// File name prefix for the daemon's rolling log.
pub const SERVICE_LOG_PREFIX: &str = "pinshot-service";

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/pinshot/logs` or `~/.local/state/pinshot/logs` |
/// | macOS | `~/Library/Logs/pinshot` |
/// | Windows | `%LOCALAPPDATA%\pinshot\pinshot\logs` |
///
/// Falls back to the temp directory when no home directory is known.
pub fn log_dir() -> PathBuf {
    let Some(base) = directories::ProjectDirs::from("", "", APP_NAME) else {
        return std::env::temp_dir().join(APP_NAME).join("logs");
    };

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().join("state"))
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // data_local_dir is ~/Library/Application Support/pinshot
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join(APP_NAME)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
