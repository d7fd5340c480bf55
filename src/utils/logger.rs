//! Logging setup
//!
//! Logs always go to stderr: stdout carries the report and, in worker
//! processes, the coordinator protocol.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

const NAMES: &[(&str, LogLevel)] = &[
    ("trace", LogLevel::Trace),
    ("debug", LogLevel::Debug),
    ("info", LogLevel::Info),
    ("warn", LogLevel::Warn),
    ("warning", LogLevel::Warn),
    ("error", LogLevel::Error),
];

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, level)| *level == self)
            .map(|(name, _)| *name)
            .unwrap_or("warn")
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, level)| *level)
    }

    /// `--verbose` wins, then an explicit name, then warnings only
    pub fn resolve(verbose: bool, explicit: Option<&str>) -> Result<Self> {
        match (verbose, explicit) {
            (true, _) => Ok(LogLevel::Debug),
            (false, Some(name)) => {
                Self::from_str(name).ok_or_else(|| anyhow!("Unknown log level: {name}"))
            }
            (false, None) => Ok(LogLevel::Warn),
        }
    }

    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install the global subscriber for this process
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(format!("spindle={}", level.to_tracing_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
