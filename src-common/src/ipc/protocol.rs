//! Length-prefixed JSON framing between the service and its clients.
//!
//! A frame is a little-endian `u32` byte count followed by that many bytes
//! of JSON:
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────┐
//! │ Length (4 bytes) │ JSON Payload (variable length)  │
//! │ Little-endian    │ Max 65,536 bytes                │
//! └──────────────────┴─────────────────────────────────┘
//! ```

use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload either side will send or accept.
pub const MAX_MESSAGE_SIZE: usize = 65536;

const HEADER_LEN: usize = 4;

/// Named pipe used on Windows.
pub const PIPE_NAME: &str = r"\\.\pipe\pinshot-service";

const SOCKET_DIR: &str = "pinshot";
const SOCKET_FILE: &str = "service.sock";

#[derive(Debug)]
pub enum IpcError {
    Io(std::io::Error),
    /// Frame longer than [`MAX_MESSAGE_SIZE`]
    MessageTooLarge { size: usize, max: usize },
    /// Frame arrived intact but its JSON did not fit the expected type
    ParseError(String),
    /// Peer hung up, possibly mid-frame
    ConnectionClosed,
}

impl std::fmt::Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpcError::Io(e) => write!(f, "I/O error: {}", e),
            IpcError::MessageTooLarge { size, max } => {
                write!(f, "Message of {} bytes exceeds the {} byte limit", size, max)
            }
            IpcError::ParseError(e) => write!(f, "Bad message: {}", e),
            IpcError::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for IpcError {}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => IpcError::ConnectionClosed,
            _ => IpcError::Io(e),
        }
    }
}

/// Directory the service socket lives in.
#[cfg(target_os = "linux")]
fn runtime_dir() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(format!("/run/user/{}", unsafe { libc::getuid() })),
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn runtime_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Where the service listens: a Unix socket under the user's runtime
/// directory, or a named pipe on Windows.
pub fn get_socket_path() -> PathBuf {
    #[cfg(unix)]
    {
        runtime_dir().join(SOCKET_DIR).join(SOCKET_FILE)
    }

    #[cfg(windows)]
    {
        PathBuf::from(PIPE_NAME)
    }
}

fn ensure_fits(size: usize) -> Result<(), IpcError> {
    match size {
        size if size > MAX_MESSAGE_SIZE => Err(IpcError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        }),
        _ => Ok(()),
    }
}

/// Prefix `payload` with its length.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, IpcError> {
    ensure_fits(payload.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Read one frame's payload. The length is checked before the body buffer
/// is allocated.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, IpcError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let size = u32::from_le_bytes(header) as usize;
    ensure_fits(size)?;

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write `payload` as one frame and flush it.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), IpcError> {
    writer.write_all(&frame(payload)?).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_json<R: AsyncRead + Unpin, T: serde::de::DeserializeOwned>(
    reader: &mut R,
) -> Result<T, IpcError> {
    let body = read_message(reader).await?;
    serde_json::from_slice(&body).map_err(|e| IpcError::ParseError(e.to_string()))
}

pub async fn write_json<W: AsyncWrite + Unpin, T: serde::Serialize>(
    writer: &mut W,
    value: &T,
) -> Result<(), IpcError> {
    let body = serde_json::to_vec(value).map_err(|e| IpcError::ParseError(e.to_string()))?;
    write_message(writer, &body).await
}
