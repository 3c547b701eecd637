//! Big-endian binary stream used by the capture-request and pin codecs.
//!
//! ```text
//! i32 / u32   4 bytes, big-endian
//! f64         8 bytes, IEEE-754 big-endian
//! bool        1 byte, 0 or 1 (any non-zero reads as true)
//! string      u32 byte length + UTF-8 bytes; 0xFFFFFFFF = null (reads as "")
//! Rect        4 x i32: x, y, width, height
//! ```

use crate::types::Rect;

/// Length prefix that marks a null string.
const NULL_STRING: u32 = u32::MAX;

/// Error type for binary decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer ended before the field was complete
    Truncated { needed: usize, remaining: usize },
    /// Start or end marker missing or wrong
    BadMarker { expected: &'static str, found: String },
    /// String field is not valid UTF-8
    InvalidUtf8,
    /// Capture mode value outside the known range
    UnknownMode(i32),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Truncated { needed, remaining } => write!(
                f,
                "Buffer truncated: needed {} bytes, {} remaining",
                needed, remaining
            ),
            WireError::BadMarker { expected, found } => {
                write!(f, "Bad marker: expected {:?}, found {:?}", expected, found)
            }
            WireError::InvalidUtf8 => write!(f, "String field is not valid UTF-8"),
            WireError::UnknownMode(mode) => write!(f, "Unknown capture mode: {}", mode),
        }
    }
}

impl std::error::Error for WireError {}

/// Appends fields to an owned buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    /// Strings longer than the largest non-null length are cut at a char
    /// boundary.
    pub fn put_str(&mut self, value: &str) -> &mut Self {
        let max = usize::try_from(NULL_STRING - 1).unwrap_or(usize::MAX);
        let value = clip_to(value, max);
        let len = u32::try_from(value.len()).unwrap_or(NULL_STRING - 1);
        self.put_u32(len);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn put_rect(&mut self, rect: &Rect) -> &mut Self {
        self.put_i32(rect.x)
            .put_i32(rect.y)
            .put_i32(rect.width)
            .put_i32(rect.height)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads fields from a borrowed buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    pub fn bool(&mut self) -> Result<bool, WireError> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn string(&mut self) -> Result<String, WireError> {
        let len = self.u32()?;
        if len == NULL_STRING {
            return Ok(String::new());
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn rect(&mut self) -> Result<Rect, WireError> {
        Ok(Rect {
            x: self.i32()?,
            y: self.i32()?,
            width: self.i32()?,
            height: self.i32()?,
        })
    }
}

/// Longest prefix of `value` that is at most `max` bytes and ends on a
/// char boundary.
fn clip_to(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut w = WireWriter::new();
        w.put_i32(-2).put_u32(500).put_str("F0");
        assert_eq!(
            w.into_bytes(),
            vec![0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0x01, 0xF4, 0, 0, 0, 2, b'F', b'0']
        );
    }

    #[test]
    fn test_null_string_reads_empty() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.string().unwrap(), "");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_string() {
        let bytes = [0, 0, 0, 5, b'a', b'b'];
        let mut r = WireReader::new(&bytes);
        assert_eq!(
            r.string(),
            Err(WireError::Truncated {
                needed: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [0, 0, 0, 2, 0xC3, 0x28];
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.string(), Err(WireError::InvalidUtf8));
    }

    #[test]
    fn test_rect_and_f64() {
        let mut w = WireWriter::new();
        w.put_rect(&Rect::new(-5, 6, 70, 80)).put_f64(1.25).put_bool(true);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 16 + 8 + 1);

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.rect().unwrap(), Rect::new(-5, 6, 70, 80));
        assert_eq!(r.f64().unwrap(), 1.25);
        assert!(r.bool().unwrap());
        assert!(r.i32().is_err());
    }

    #[test]
    fn test_clip_keeps_char_boundaries() {
        assert_eq!(clip_to("abc", 8), "abc");
        assert_eq!(clip_to("abcdef", 4), "abcd");
        // "é" is two bytes; a cut inside it backs off to the previous char
        assert_eq!(clip_to("aé", 2), "a");
        assert_eq!(clip_to("aé", 3), "aé");
    }
}
