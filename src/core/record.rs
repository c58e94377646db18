//! Immutable log record and its renderings

use super::ext_config::MessageStructure;
use super::level::{LevelStyle, LogLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One enriched log event.
///
/// Created on the producer thread by the enricher, shared with every
/// admitting backend as `Arc<Record>`, and discarded once all of them have
/// processed it. Fields disabled by the instance `ExtConfig` are `None`/zero.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub level: LogLevel,
    pub domain: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub process_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    /// Rendering chosen by the emitting instance, snapshotted per record.
    #[serde(skip_serializing)]
    pub structure: MessageStructure,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Record {
    /// Render for a text sink, honoring the structure the emitting instance
    /// was configured with.
    pub fn render(&self, style: LevelStyle) -> String {
        match self.structure {
            MessageStructure::Plain => self.format_plain(style),
            MessageStructure::Json => self.format_json(),
        }
    }

    fn format_plain(&self, style: LevelStyle) -> String {
        let mut line = self.timestamp.format("%Y.%m.%d %H:%M:%S%.3f").to_string();
        if let Some(ref hostname) = self.hostname {
            line.push(' ');
            line.push_str(hostname);
        }
        match (self.process_name.as_deref(), self.process_id) {
            (Some(pname), 0) => {
                line.push(' ');
                line.push_str(pname);
            }
            (Some(pname), pid) => {
                line.push_str(&format!(" {pname}[{pid}]"));
            }
            (None, pid) if pid != 0 => {
                line.push_str(&format!(" [{pid}]"));
            }
            (None, _) => {}
        }
        if let Some(ref tname) = self.thread_name {
            line.push(' ');
            line.push_str(tname);
        }
        if let Some(ref tid) = self.thread_id {
            line.push_str(&format!(" T{tid}"));
        }
        line.push(' ');
        line.push_str(&self.domain);
        line.push(' ');
        line.push_str(self.level.render(style));
        line.push(' ');
        line.push_str(&self.message);
        line
    }

    fn format_json(&self) -> String {
        // Serialization of these fields cannot fail; fall back to the plain
        // line if it somehow does.
        serde_json::to_string(self).unwrap_or_else(|_| self.format_plain(LevelStyle::Str))
    }
}
