//! Log level definitions and admission filtering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Success = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
}

/// `FATAL` is an alias of [`LogLevel::Critical`]; the `fatal(..)` emit
/// methods map to it.
pub const FATAL: LogLevel = LogLevel::Critical;

impl LogLevel {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    pub fn to_short(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRC",
            LogLevel::Debug => "DBG",
            LogLevel::Info => "INF",
            LogLevel::Success => "SUC",
            LogLevel::Warning => "WRN",
            LogLevel::Error => "ERR",
            LogLevel::Critical => "CRT",
        }
    }

    pub fn to_sym(&self) -> &'static str {
        match self {
            LogLevel::Trace => "T",
            LogLevel::Debug => "D",
            LogLevel::Info => "I",
            LogLevel::Success => "S",
            LogLevel::Warning => "W",
            LogLevel::Error => "E",
            LogLevel::Critical => "C",
        }
    }

    /// Render the level token in the requested width.
    pub fn render(&self, style: LevelStyle) -> &'static str {
        match style {
            LevelStyle::Sym => self.to_sym(),
            LevelStyle::Short => self.to_short(),
            LevelStyle::Str => self.to_str(),
        }
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => BrightBlack,
            LogLevel::Debug => Blue,
            LogLevel::Info => Green,
            LogLevel::Success => Cyan,
            LogLevel::Warning => Yellow,
            LogLevel::Error => Magenta,
            LogLevel::Critical => Red,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LogLevel::Trace),
            1 => Some(LogLevel::Debug),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Success),
            4 => Some(LogLevel::Warning),
            5 => Some(LogLevel::Error),
            6 => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARN" | "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// Width of the level token in rendered log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelStyle {
    /// Single character: `I`
    Sym,
    /// Three characters: `INF`
    Short,
    /// Full name: `INFO`
    #[default]
    Str,
}

/// Lock-free admission gate.
///
/// A record is admitted iff its level is at or above the configured level.
/// Every `Logging`/`Logger` handle and every backend carries its own filter,
/// so a record is checked twice: once at the emitting handle and once at
/// each backend.
#[derive(Debug)]
pub struct LevelFilter(AtomicU8);

impl LevelFilter {
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    #[inline]
    pub fn admits(&self, level: LogLevel) -> bool {
        level as u8 >= self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, level: LogLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    pub fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.0.load(Ordering::Relaxed)).unwrap_or_default()
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}
