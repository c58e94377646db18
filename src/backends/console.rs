//! Console backend

use super::{shutdown_worker, sync_worker, Command, WORKER_QUEUE_CAPACITY};
use crate::core::error::Result;
use crate::core::level::{LevelFilter, LevelStyle, LogLevel};
use colored::Colorize;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Which stream console output goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
    /// `Error` and above to stderr, everything else to stdout.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleWriterConfig {
    pub level: LogLevel,
    pub colors: bool,
    pub target: ConsoleTarget,
    pub level_style: LevelStyle,
}

impl ConsoleWriterConfig {
    pub fn new(level: LogLevel, colors: bool) -> Self {
        Self {
            level,
            colors,
            target: ConsoleTarget::default(),
            level_style: LevelStyle::default(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_level_style(mut self, style: LevelStyle) -> Self {
        self.level_style = style;
        self
    }
}

impl Default for ConsoleWriterConfig {
    fn default() -> Self {
        Self::new(LogLevel::Trace, false)
    }
}

fn console_writer_thread(config: ConsoleWriterConfig, rx: Receiver<Command>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Record(record) => {
                let line = record.render(config.level_style);
                let line = if config.colors {
                    line.color(record.level.color_code()).to_string()
                } else {
                    line
                };
                let to_stderr = match config.target {
                    ConsoleTarget::Stdout => false,
                    ConsoleTarget::Stderr => true,
                    ConsoleTarget::Auto => record.level >= LogLevel::Error,
                };
                if to_stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            Command::Sync(ack) => {
                // Both streams may carry output under the Auto target.
                let _ = std::io::stdout().flush();
                let _ = std::io::stderr().flush();
                let _ = ack.send(());
            }
            Command::Rotate => {}
            Command::Stop => break,
        }
    }
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}

pub struct ConsoleBackend {
    filter: LevelFilter,
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleBackend {
    pub(crate) fn new(config: ConsoleWriterConfig) -> Result<Self> {
        let filter = LevelFilter::new(config.level);
        let (tx, rx) = bounded(WORKER_QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("ConsoleWriter".to_string())
            .spawn(move || console_writer_thread(config, rx))?;
        Ok(Self {
            filter,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn filter(&self) -> &LevelFilter {
        &self.filter
    }

    pub(crate) fn sender(&self) -> &Sender<Command> {
        &self.tx
    }

    pub(crate) fn sync(&self, deadline: Instant) -> bool {
        sync_worker(&self.tx, deadline)
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        shutdown_worker("ConsoleWriter", &self.tx, &self.handle)
    }
}
