//! Extended enrichment configuration

use serde::{Deserialize, Serialize};

/// How a record is rendered by the console and file backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageStructure {
    /// One human-readable text line.
    #[default]
    Plain,
    /// One JSON object per line, disabled fields omitted.
    Json,
}

/// Toggles for the contextual fields attached to every record.
///
/// Applied to a `Logging` instance via `set_ext_config`; each toggle that is
/// off leaves the corresponding record field empty/zero, never fabricated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtConfig {
    /// Message structuring for text sinks.
    pub structured: MessageStructure,
    /// Include the hostname.
    pub hostname: bool,
    /// Include the process name.
    pub pname: bool,
    /// Include the process id.
    pub pid: bool,
    /// Include the thread name.
    pub tname: bool,
    /// Include the thread id.
    pub tid: bool,
}

impl ExtConfig {
    pub fn new(
        structured: MessageStructure,
        hostname: bool,
        pname: bool,
        pid: bool,
        tname: bool,
        tid: bool,
    ) -> Self {
        Self {
            structured,
            hostname,
            pname,
            pid,
            tname,
            tid,
        }
    }
}
