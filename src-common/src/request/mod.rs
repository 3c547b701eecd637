//! Capture requests exchanged between the daemon and its clients.

mod capture;
mod tasks;

pub use capture::*;
pub use tasks::*;
