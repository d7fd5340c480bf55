//! Configuration module
//!
//! Handles loading and layering harness configuration: defaults, then a
//! config file, then `SPINDLE_*` environment variables, then CLI flags.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How files are executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Sequential,
    Parallel,
}

/// What the coordinator does when a worker exits holding a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashPolicy {
    /// Record a crash entry in the error list (after the optional retry)
    #[default]
    Record,
    /// Log a diagnostic only; the file's results are absent
    Drop,
}

impl CrashPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "record" => Some(CrashPolicy::Record),
            "drop" => Some(CrashPolicy::Drop),
            _ => None,
        }
    }
}

/// Harness configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root directory searched for test files
    pub test_dir: PathBuf,

    /// Only run files whose name ends with this suffix
    pub suffix: Option<String>,

    /// Execution mode
    pub mode: RunMode,

    /// Worker pool size; 0 means available parallelism
    pub workers: usize,

    /// Tasks a worker serves before it is replaced; 0 means unlimited
    pub tasks_per_worker: usize,

    /// Crash handling
    pub crash_policy: CrashPolicy,

    /// Requeue a crashed file once before recording the crash
    pub retry_crashed: bool,

    /// Output format (text, summary, json, json-pretty, csv)
    pub format: String,

    /// Colourize text output
    pub color: bool,

    /// Exit status when any case failed or any error was recorded
    pub fail_exit_code: i32,

    /// Always exit 0
    pub exit_zero: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("tests"),
            suffix: None,
            mode: RunMode::Sequential,
            workers: 0,
            tasks_per_worker: 0,
            crash_policy: CrashPolicy::Record,
            retry_crashed: false,
            format: "text".to_string(),
            color: true,
            fail_exit_code: 1,
            exit_zero: false,
        }
    }
}

impl HarnessConfig {
    /// Pool size with 0 resolved to the machine's available parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) -> anyhow::Result<()> {
        if let Some(dir) = &env.test_dir {
            self.test_dir = PathBuf::from(dir);
        }
        if let Some(parallel) = env.parallel {
            self.mode = if parallel {
                RunMode::Parallel
            } else {
                RunMode::Sequential
            };
        }
        if let Some(workers) = env.workers {
            self.workers = workers;
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(color) = env.color {
            self.color = color;
        }
        if let Some(policy) = env.crash_policy.as_deref() {
            self.crash_policy = CrashPolicy::from_str(policy)
                .ok_or_else(|| anyhow::anyhow!("Unknown SPINDLE_CRASH_POLICY: {policy}"))?;
        }
        Ok(())
    }

    /// Status the process should exit with for a finished run
    pub fn exit_code(&self, has_failures: bool) -> i32 {
        if has_failures && !self.exit_zero {
            self.fail_exit_code
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.test_dir, PathBuf::from("tests"));
        assert_eq!(config.mode, RunMode::Sequential);
        assert_eq!(config.crash_policy, CrashPolicy::Record);
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn test_exit_code() {
        let mut config = HarnessConfig::default();
        assert_eq!(config.exit_code(false), 0);
        assert_eq!(config.exit_code(true), 1);

        config.fail_exit_code = 3;
        assert_eq!(config.exit_code(true), 3);

        config.exit_zero = true;
        assert_eq!(config.exit_code(true), 0);
    }

    #[test]
    fn test_load_partial_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("spindle.yaml");
        std::fs::write(
            &path,
            "harness:\n  mode: parallel\n  workers: 3\n  crash_policy: drop\n",
        )
        .unwrap();

        let config = ConfigFile::load(&path).unwrap().harness;
        assert_eq!(config.mode, RunMode::Parallel);
        assert_eq!(config.effective_workers(), 3);
        assert_eq!(config.crash_policy, CrashPolicy::Drop);
        assert_eq!(config.format, "text");
    }

    #[test]
    fn test_apply_env() {
        let env = EnvConfig {
            parallel: Some(true),
            workers: Some(2),
            crash_policy: Some("drop".into()),
            ..Default::default()
        };

        let mut config = HarnessConfig::default();
        config.apply_env(&env).unwrap();
        assert_eq!(config.mode, RunMode::Parallel);
        assert_eq!(config.workers, 2);
        assert_eq!(config.crash_policy, CrashPolicy::Drop);
    }

    #[test]
    fn test_apply_env_rejects_unknown_crash_policy() {
        let env = EnvConfig {
            crash_policy: Some("dorp".into()),
            ..Default::default()
        };

        let mut config = HarnessConfig::default();
        let err = config.apply_env(&env).unwrap_err().to_string();
        assert!(err.contains("dorp"));
        assert_eq!(config.crash_policy, CrashPolicy::Record);
    }
}
