//! pinshot Background Service
//!
//! Owns open pins and receives capture requests from the `pinshot` client
//! over IPC.

mod config;
mod dispatch;
mod ipc;
mod pins;
mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pinshot_common::logging;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::state::ServiceState;

/// Global shutdown flag
static SHUTDOWN_FLAG: std::sync::OnceLock<Arc<AtomicBool>> = std::sync::OnceLock::new();

/// Get the global shutdown flag.
pub fn get_shutdown_flag() -> Arc<AtomicBool> {
    SHUTDOWN_FLAG
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Request service shutdown.
pub fn request_shutdown() {
    info!("Shutdown requested");
    get_shutdown_flag().store(true, Ordering::SeqCst);
}

/// Check if shutdown has been requested.
pub fn is_shutdown_requested() -> bool {
    get_shutdown_flag().load(Ordering::SeqCst)
}

/// Log to stderr and to a daily file in the platform log directory.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let appender = logging::ensure_log_dir()
        .map_err(|e| e.to_string())
        .and_then(|dir| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(logging::SERVICE_LOG_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| e.to_string())
        });

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            warn!("File logging disabled: {}", e);
            None
        }
    }
}

fn main() {
    let _log_guard = init_logging();

    info!("pinshot service starting (pid: {})...", std::process::id());

    setup_signal_handlers();

    let state = Arc::new(ServiceState::new(config::load_config()));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        // Runs until shutdown
        if let Err(e) = ipc::run_server(state).await {
            if !is_shutdown_requested() {
                error!("IPC server error: {}", e);
                cleanup_on_shutdown();
                std::process::exit(1);
            }
        }
    });

    cleanup_on_shutdown();
    info!("pinshot service stopped");
}

/// Set up signal handlers for graceful shutdown.
fn setup_signal_handlers() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        std::thread::spawn(|| {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create signal runtime: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                let (mut sigterm, mut sigint, mut sighup) = match (
                    signal(SignalKind::terminate()),
                    signal(SignalKind::interrupt()),
                    signal(SignalKind::hangup()),
                ) {
                    (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
                    _ => {
                        error!("Failed to install signal handlers");
                        return;
                    }
                };

                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT");
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP");
                    }
                }

                request_shutdown();
            });
        });
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            info!("Received Ctrl+C");
            request_shutdown();
        }) {
            error!("Error setting Ctrl+C handler: {}", e);
        }
    }
}

/// Cleanup resources on shutdown.
fn cleanup_on_shutdown() {
    info!("Cleaning up...");

    #[cfg(unix)]
    {
        let socket_path = pinshot_common::ipc::get_socket_path();
        if socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&socket_path) {
                warn!("Failed to remove socket file: {}", e);
            } else {
                info!("Removed socket file: {:?}", socket_path);
            }
        }
    }
}
