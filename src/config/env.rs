//! Environment variable configuration
//!
//! Provides `SPINDLE_*` environment variable overrides.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "SPINDLE";

/// Configuration read from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Test directory from SPINDLE_DIR
    pub test_dir: Option<String>,
    /// Parallel mode from SPINDLE_PARALLEL
    pub parallel: Option<bool>,
    /// Pool size from SPINDLE_WORKERS
    pub workers: Option<usize>,
    /// Output format from SPINDLE_FORMAT
    pub format: Option<String>,
    /// Colour from SPINDLE_COLOR
    pub color: Option<bool>,
    /// Crash policy from SPINDLE_CRASH_POLICY
    pub crash_policy: Option<String>,
    /// Config file from SPINDLE_CONFIG
    pub config_file: Option<String>,
    /// Log level from SPINDLE_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        Self {
            test_dir: get("DIR"),
            parallel: get("PARALLEL").map(|v| parse_bool(&v)),
            workers: get("WORKERS").and_then(|v| v.parse().ok()),
            format: get("FORMAT"),
            color: get("COLOR").map(|v| parse_bool(&v)),
            crash_policy: get("CRASH_POLICY"),
            config_file: get("CONFIG"),
            log_level: get("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.test_dir.is_some()
            || self.parallel.is_some()
            || self.workers.is_some()
            || self.format.is_some()
            || self.color.is_some()
            || self.crash_policy.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_DIR:          {:?}", ENV_PREFIX, self.test_dir);
        println!("  {}_PARALLEL:     {:?}", ENV_PREFIX, self.parallel);
        println!("  {}_WORKERS:      {:?}", ENV_PREFIX, self.workers);
        println!("  {}_FORMAT:       {:?}", ENV_PREFIX, self.format);
        println!("  {}_COLOR:        {:?}", ENV_PREFIX, self.color);
        println!("  {}_CRASH_POLICY: {:?}", ENV_PREFIX, self.crash_policy);
        println!("  {}_CONFIG:       {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_LOG:          {:?}", ENV_PREFIX, self.log_level);
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all SPINDLE environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_DIR           Test directory");
    println!("  {ENV_PREFIX}_PARALLEL      Run files in worker processes (true/false)");
    println!("  {ENV_PREFIX}_WORKERS       Worker pool size (0 = available parallelism)");
    println!("  {ENV_PREFIX}_FORMAT        Output format (text, summary, json, json-pretty, csv)");
    println!("  {ENV_PREFIX}_COLOR         Colourize text output (true/false)");
    println!("  {ENV_PREFIX}_CRASH_POLICY  Worker crash handling (record, drop)");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_LOG           Log level (trace, debug, info, warn, error)");
}
