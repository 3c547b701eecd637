//! IPC server and request handlers.

mod handlers;
mod server;

pub use server::run_server;
