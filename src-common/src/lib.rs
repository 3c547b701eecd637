//! pinshot Common Library
//!
//! Capture-request wire format, pinned-image state machine, and the IPC
//! protocol shared by the pinshot daemon and its command-line client.

pub mod ipc;
pub mod logging;
pub mod pin;
pub mod request;
pub mod types;
pub mod validation;
pub mod wire;

pub use types::*;
