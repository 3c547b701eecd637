//! IPC server with secure socket setup.

use pinshot_common::ipc::{get_socket_path, read_json, write_json, IpcError, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use super::handlers::handle_request;
use crate::state::ServiceState;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
#[cfg(unix)]
use std::path::Path;

/// Socket file permissions (owner read/write only)
#[cfg(unix)]
const SOCKET_MODE: u32 = 0o600;

/// Socket directory permissions (owner read/write/execute only)
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o700;

/// Create socket directory with secure permissions.
#[cfg(unix)]
fn create_secure_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    let socket_dir = socket_path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "socket path has no parent directory",
        )
    })?;

    std::fs::create_dir_all(socket_dir)?;
    std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(DIRECTORY_MODE))?;

    // Remove stale socket if exists
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

/// Set socket file permissions after binding.
#[cfg(unix)]
fn secure_socket_file(socket_path: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;

    let actual = std::fs::metadata(socket_path)?.permissions().mode() & 0o777;
    if actual != SOCKET_MODE {
        warn!("Socket mode is {:o}, expected {:o}", actual, SOCKET_MODE);
    }

    Ok(())
}

/// Serve one client connection until it disconnects.
async fn handle_client<S>(mut stream: S, state: Arc<ServiceState>, peer_info: String)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("Client connected: {}", peer_info);

    loop {
        let request: Request = match read_json(&mut stream).await {
            Ok(req) => req,
            Err(IpcError::ConnectionClosed) => {
                info!("Client disconnected: {}", peer_info);
                break;
            }
            Err(IpcError::ParseError(e)) => {
                // Framing is intact, so the connection can carry on
                warn!("Unreadable request from {}: {}", peer_info, e);
                let response = Response::error("Unreadable request");
                if let Err(e) = write_json(&mut stream, &response).await {
                    error!("Error writing response: {}", e);
                    break;
                }
                continue;
            }
            Err(e) => {
                error!("Error reading request from {}: {}", peer_info, e);
                break;
            }
        };

        let response = match request.validate() {
            Ok(()) => handle_request(&state, request).await,
            Err(e) => {
                warn!("Invalid request from {}: {}", peer_info, e);
                Response::error(format!("Invalid request: {}", e))
            }
        };

        if let Err(e) = write_json(&mut stream, &response).await {
            error!("Error writing response to {}: {}", peer_info, e);
            break;
        }
    }
}

/// How often quiet scroll bursts are checked for
#[cfg(unix)]
const SETTLE_INTERVAL: Duration = Duration::from_millis(50);

/// Commit pin scroll bursts once they go quiet.
#[cfg(unix)]
async fn settle_pins(state: Arc<ServiceState>) {
    let mut interval = tokio::time::interval(SETTLE_INTERVAL);
    loop {
        interval.tick().await;
        let now_ms = state.now_ms();
        state.pins.lock().await.settle(now_ms);
    }
}

/// Run the IPC server (Unix implementation).
#[cfg(unix)]
pub async fn run_server(state: Arc<ServiceState>) -> Result<(), Box<dyn std::error::Error>> {
    use tokio::net::UnixListener;

    let socket_path = get_socket_path();
    info!("Starting IPC server at {:?}", socket_path);

    create_secure_socket_dir(&socket_path)?;
    let listener = UnixListener::bind(&socket_path)?;
    // Permissions can only be set once the socket file exists
    secure_socket_file(&socket_path)?;

    info!("IPC server listening on {:?}", socket_path);

    let settler = tokio::spawn(settle_pins(state.clone()));
    let mut next_client = 0u64;
    loop {
        if crate::is_shutdown_requested() {
            info!("Shutdown requested, stopping IPC server");
            break;
        }

        // Wake up periodically to check the shutdown flag
        let accept_result = tokio::select! {
            result = listener.accept() => Some(result),
            _ = tokio::time::sleep(Duration::from_millis(100)) => None,
        };

        let (stream, _) = match accept_result {
            Some(Ok(conn)) => conn,
            Some(Err(e)) => {
                error!("Accept error: {}", e);
                continue;
            }
            None => continue,
        };

        next_client += 1;
        let peer_info = format!("client#{}", next_client);
        tokio::spawn(handle_client(stream, state.clone(), peer_info));
    }

    settler.abort();
    Ok(())
}

/// Run the IPC server (Windows implementation).
#[cfg(windows)]
pub async fn run_server(_state: Arc<ServiceState>) -> Result<(), Box<dyn std::error::Error>> {
    let socket_path = get_socket_path();
    error!("Named pipe server at {:?} is not supported", socket_path);
    Err("IPC server is only available on Unix".into())
}
