//! Connection to pinshot-service.

use pinshot_common::ipc::{get_socket_path, read_json, write_json, Request, Response};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::exit_codes::ExitCode;

#[cfg(unix)]
type Stream = tokio::net::UnixStream;
#[cfg(windows)]
type Stream = tokio::net::windows::named_pipe::NamedPipeClient;

/// How long one request may wait for its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a freshly spawned service gets to start listening.
const SPAWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub enum ServiceError {
    NotConnected,
    ConnectionFailed(String),
    SendFailed(String),
    ReceiveFailed(String),
    /// The service answered with an error response
    RemoteError(String),
    Timeout,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotConnected => write!(f, "Not connected to service"),
            ServiceError::ConnectionFailed(msg) => write!(f, "Cannot reach service: {}", msg),
            ServiceError::SendFailed(msg) => write!(f, "Sending request failed: {}", msg),
            ServiceError::ReceiveFailed(msg) => write!(f, "Reading response failed: {}", msg),
            ServiceError::RemoteError(msg) => write!(f, "{}", msg),
            ServiceError::Timeout => write!(f, "Service did not answer in time"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Exit code for this failure. Service errors are told apart by the
    /// leading words of their message.
    pub fn to_exit_code(&self) -> ExitCode {
        let ServiceError::RemoteError(msg) = self else {
            return ExitCode::ServiceConnectionFailed;
        };
        const PREFIXES: [(&str, ExitCode); 4] = [
            ("No pin", ExitCode::PinNotFound),
            ("Malformed capture", ExitCode::CaptureRejected),
            ("Failed to load image", ExitCode::ImageLoadFailed),
            ("Invalid", ExitCode::InvalidArguments),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| msg.starts_with(prefix))
            .map(|(_, code)| *code)
            .unwrap_or(ExitCode::GeneralError)
    }
}

/// One connection to the service, opened lazily and reused across
/// requests.
pub struct ServiceClient {
    stream: Mutex<Option<Stream>>,
    socket_path: PathBuf,
}

impl ServiceClient {
    pub fn new() -> Self {
        Self::with_socket_path(get_socket_path())
    }

    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            stream: Mutex::new(None),
            socket_path,
        }
    }

    #[cfg(unix)]
    async fn open(&self) -> std::io::Result<Stream> {
        tokio::net::UnixStream::connect(&self.socket_path).await
    }

    #[cfg(windows)]
    async fn open(&self) -> std::io::Result<Stream> {
        tokio::net::windows::named_pipe::ClientOptions::new().open(&self.socket_path)
    }

    /// Connect unless already connected.
    pub async fn connect(&self) -> Result<(), ServiceError> {
        let mut stream = self.stream.lock().await;
        if stream.is_none() {
            let opened = self.open().await.map_err(|e| {
                ServiceError::ConnectionFailed(format!("{}: {}", self.socket_path.display(), e))
            })?;
            *stream = Some(opened);
        }
        Ok(())
    }

    /// Send `request` and wait for its response. Error responses come back
    /// as [`ServiceError::RemoteError`]. A failed exchange drops the
    /// connection so the next request reconnects.
    pub async fn request(&self, request: Request) -> Result<Response, ServiceError> {
        self.connect().await?;

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ServiceError::NotConnected)?;

        let exchange = async {
            write_json(stream, &request)
                .await
                .map_err(|e| ServiceError::SendFailed(e.to_string()))?;
            read_json::<_, Response>(stream)
                .await
                .map_err(|e| ServiceError::ReceiveFailed(e.to_string()))
        };
        let result = tokio::time::timeout(REQUEST_TIMEOUT, exchange)
            .await
            .unwrap_or(Err(ServiceError::Timeout));
        if result.is_err() {
            *guard = None;
        }

        match result? {
            Response::Error { message } => Err(ServiceError::RemoteError(message)),
            response => Ok(response),
        }
    }

    /// Round-trip a ping.
    pub async fn ping(&self) -> Result<Duration, ServiceError> {
        let start = Instant::now();
        match self.request(Request::Ping).await? {
            Response::Pong => Ok(start.elapsed()),
            other => Err(ServiceError::ReceiveFailed(format!(
                "expected pong, got {:?}",
                other
            ))),
        }
    }

    async fn wait_for_service(&self, timeout: Duration) -> Result<(), ServiceError> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.connect().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Err(ServiceError::Timeout)
    }

    /// Connect, starting the service first if nothing is listening.
    pub async fn connect_or_spawn(&self) -> Result<(), ServiceError> {
        if self.connect().await.is_ok() {
            return Ok(());
        }

        let binary = find_service_binary().ok_or_else(|| {
            ServiceError::ConnectionFailed(format!("{} binary not found", SERVICE_BINARY))
        })?;

        std::process::Command::new(&binary)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                ServiceError::ConnectionFailed(format!(
                    "failed to start {}: {}",
                    binary.display(),
                    e
                ))
            })?;

        self.wait_for_service(SPAWN_TIMEOUT).await
    }
}

impl Default for ServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
const SERVICE_BINARY: &str = "pinshot-service.exe";
#[cfg(not(windows))]
const SERVICE_BINARY: &str = "pinshot-service";

#[cfg(windows)]
const INSTALL_PATHS: [&str; 1] = [r"C:\Program Files\pinshot\pinshot-service.exe"];
#[cfg(not(windows))]
const INSTALL_PATHS: [&str; 2] = ["/usr/local/bin/pinshot-service", "/usr/bin/pinshot-service"];

/// Look next to this executable, then on PATH, then in install locations.
fn find_service_binary() -> Option<PathBuf> {
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(SERVICE_BINARY)));

    sibling
        .into_iter()
        .chain(which::which(SERVICE_BINARY).ok())
        .chain(INSTALL_PATHS.iter().map(PathBuf::from))
        .find(|path| path.exists())
}
