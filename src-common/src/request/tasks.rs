//! Post-capture actions and the flag set that carries them.

use serde::{Deserialize, Serialize};

/// One post-capture action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportTask {
    /// Copy the image to the clipboard
    Copy,
    /// Save the image to `CaptureRequest::path`
    Save,
    /// Print raw image bytes to stdout
    PrintRaw,
    /// Print the selected geometry to stdout
    PrintGeometry,
    /// Open a pin window at `CaptureRequest::pin_window_geometry`
    Pin,
    /// Upload to the configured image host
    Upload,
    /// Finish the capture as soon as a selection is made
    AcceptOnSelect,
}

impl ExportTask {
    /// Every task, in bit order.
    pub const ALL: [ExportTask; 7] = [
        ExportTask::Copy,
        ExportTask::Save,
        ExportTask::PrintRaw,
        ExportTask::PrintGeometry,
        ExportTask::Pin,
        ExportTask::Upload,
        ExportTask::AcceptOnSelect,
    ];

    /// Bit used for this task on the wire.
    pub const fn bit(self) -> u32 {
        match self {
            ExportTask::Copy => 1,
            ExportTask::Save => 2,
            ExportTask::PrintRaw => 4,
            ExportTask::PrintGeometry => 8,
            ExportTask::Pin => 16,
            ExportTask::Upload => 32,
            ExportTask::AcceptOnSelect => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportTask::Copy => "copy",
            ExportTask::Save => "save",
            ExportTask::PrintRaw => "print-raw",
            ExportTask::PrintGeometry => "print-geometry",
            ExportTask::Pin => "pin",
            ExportTask::Upload => "upload",
            ExportTask::AcceptOnSelect => "accept-on-select",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        ExportTask::ALL.into_iter().find(|task| task.as_str() == s)
    }
}

impl std::fmt::Display for ExportTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`ExportTask`]s.
///
/// Only readable from outside the crate: tasks are added and removed through
/// `CaptureRequest`, which keeps Save paired with a path and Pin paired with
/// a window geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TaskFlags(u32);

impl TaskFlags {
    pub const fn empty() -> Self {
        TaskFlags(0)
    }

    /// Rebuild from wire bits. Unknown bits are kept so they survive a
    /// decode/encode cycle through an older or newer peer.
    pub const fn from_bits(bits: u32) -> Self {
        TaskFlags(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, task: ExportTask) -> bool {
        self.0 & task.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Known tasks in the set, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = ExportTask> {
        let flags = *self;
        ExportTask::ALL
            .into_iter()
            .filter(move |task| flags.contains(*task))
    }

    pub(crate) fn insert(&mut self, task: ExportTask) {
        self.0 |= task.bit();
    }

    pub(crate) fn remove(&mut self, task: ExportTask) {
        self.0 &= !task.bit();
    }
}

impl std::fmt::Display for TaskFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|task| task.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

impl Serialize for TaskFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
