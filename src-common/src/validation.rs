//! Input validation for IPC request parameters.

/// Maximum coordinate value (positive or negative)
pub const MAX_COORDINATE: i32 = 65535;

/// Maximum image path length
pub const MAX_PATH_LEN: usize = 4096;

/// Highest opacity level a digit key can select
pub const MAX_OPACITY_LEVEL: u8 = 9;

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Coordinate (x/y) is out of valid range
    CoordinateOutOfRange { field: &'static str, value: i32 },
    /// Path is empty or contains a NUL byte
    InvalidPath(String),
    /// String field exceeds maximum length
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    /// Opacity level is not a single digit
    OpacityLevelOutOfRange(u8),
    /// Scale factor is not a positive finite number
    InvalidScaleFactor { field: &'static str, value: f64 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::CoordinateOutOfRange { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
            ValidationError::InvalidPath(reason) => write!(f, "Invalid path: {}", reason),
            ValidationError::StringTooLong { field, len, max } => {
                write!(f, "{} too long: {} chars (max {})", field, len, max)
            }
            ValidationError::OpacityLevelOutOfRange(level) => {
                write!(f, "Opacity level out of range: {} (max {})", level, MAX_OPACITY_LEVEL)
            }
            ValidationError::InvalidScaleFactor { field, value } => {
                write!(f, "{} must be positive and finite: {}", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate screen coordinates.
pub fn validate_coordinates(x: i32, y: i32) -> Result<(), ValidationError> {
    for (field, value) in [("x", x), ("y", y)] {
        if !(-MAX_COORDINATE..=MAX_COORDINATE).contains(&value) {
            return Err(ValidationError::CoordinateOutOfRange { field, value });
        }
    }
    Ok(())
}

/// Validate the path of an image to pin.
///
/// Only shape is checked here. Whether the file exists and decodes is up to
/// the daemon.
pub fn validate_image_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::InvalidPath("empty".to_string()));
    }
    if path.contains('\0') {
        return Err(ValidationError::InvalidPath("contains NUL byte".to_string()));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(ValidationError::StringTooLong {
            field: "image_path",
            len: path.len(),
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

/// Validate a digit-key opacity level (0-9).
pub fn validate_opacity_level(level: u8) -> Result<(), ValidationError> {
    if level > MAX_OPACITY_LEVEL {
        return Err(ValidationError::OpacityLevelOutOfRange(level));
    }
    Ok(())
}

/// Validate a pinch scale factor.
pub fn validate_scale_factor(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidScaleFactor { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates() {
        assert!(validate_coordinates(0, 0).is_ok());
        assert!(validate_coordinates(-MAX_COORDINATE, MAX_COORDINATE).is_ok());
        assert_eq!(
            validate_coordinates(0, MAX_COORDINATE + 1),
            Err(ValidationError::CoordinateOutOfRange {
                field: "y",
                value: MAX_COORDINATE + 1
            })
        );
        assert_eq!(
            validate_coordinates(i32::MIN, 0),
            Err(ValidationError::CoordinateOutOfRange {
                field: "x",
                value: i32::MIN
            })
        );
        assert!(validate_coordinates(0, i32::MAX).is_err());
    }

    #[test]
    fn test_image_path() {
        assert!(validate_image_path("/home/user/shot.png").is_ok());
        assert!(validate_image_path("relative.png").is_ok());
        assert!(validate_image_path("").is_err());
        assert!(validate_image_path("/tmp/a\0b.png").is_err());
        assert!(matches!(
            validate_image_path(&"a".repeat(MAX_PATH_LEN + 1)),
            Err(ValidationError::StringTooLong { .. })
        ));
    }

    #[test]
    fn test_opacity_level() {
        for level in 0..=9 {
            assert!(validate_opacity_level(level).is_ok());
        }
        assert!(validate_opacity_level(10).is_err());
    }

    #[test]
    fn test_scale_factor() {
        assert!(validate_scale_factor("f", 0.5).is_ok());
        assert!(validate_scale_factor("f", 0.0).is_err());
        assert!(validate_scale_factor("f", -1.0).is_err());
        assert!(validate_scale_factor("f", f64::INFINITY).is_err());
        assert!(validate_scale_factor("f", f64::NAN).is_err());
    }
}
