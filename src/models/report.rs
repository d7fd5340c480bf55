//! Final run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::summary::RunSummary;
use crate::config::RunMode;

/// Everything the reporter renders for one finished run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub mode: RunMode,
    /// Worker processes started; 0 for sequential runs
    pub workers: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub files: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crashed: Vec<PathBuf>,
    pub summary: RunSummary,
}

impl Report {
    pub fn new(mode: RunMode, files: usize, summary: RunSummary) -> Self {
        Self {
            mode,
            workers: 0,
            started_at: Utc::now(),
            duration_ms: 0,
            files,
            crashed: Vec::new(),
            summary,
        }
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        self.started_at = started_at;
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_workers(mut self, workers: usize, crashed: Vec<PathBuf>) -> Self {
        self.workers = workers;
        self.crashed = crashed;
        self
    }

    pub fn has_failures(&self) -> bool {
        self.summary.has_failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_without_empty_crash_list() {
        let report = Report::new(RunMode::Sequential, 2, RunSummary::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "sequential");
        assert_eq!(json["files"], 2);
        assert!(json.get("crashed").is_none());
        assert!(!report.has_failures());
    }
}
