//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Arguments rejected by the service
    InvalidArguments = 2,
    /// Failed to connect to the service
    ServiceConnectionFailed = 3,
    /// Capture request could not be decoded
    CaptureRejected = 4,
    /// No pin with the given id
    PinNotFound = 5,
    /// Image to pin could not be loaded
    ImageLoadFailed = 6,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::ServiceConnectionFailed => write!(f, "service connection failed"),
            ExitCode::CaptureRejected => write!(f, "capture rejected"),
            ExitCode::PinNotFound => write!(f, "pin not found"),
            ExitCode::ImageLoadFailed => write!(f, "image load failed"),
        }
    }
}
