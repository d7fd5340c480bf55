//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// describe/it test harness with sequential and parallel runners
#[derive(Parser, Debug)]
#[command(name = "spindle")]
#[command(version)]
#[command(about = "Discover test files and run their describe/it cases, in-process or on a worker pool")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test files
    Run(RunArgs),

    /// List discovered test files
    List(ListArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Serve tasks from a coordinator over stdin/stdout
    #[command(hide = true)]
    Worker,
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Directory searched recursively for test files
    pub dir: Option<PathBuf>,

    /// Run files in a pool of worker processes
    #[arg(short, long)]
    pub parallel: bool,

    /// Worker pool size (0 = available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Tasks a worker serves before it is replaced (0 = unlimited)
    #[arg(long)]
    pub tasks_per_worker: Option<usize>,

    /// Give every file a fresh worker process
    #[arg(long, conflicts_with = "tasks_per_worker")]
    pub isolate: bool,

    /// Retry a file once if its worker crashes
    #[arg(long)]
    pub retry: bool,

    /// Worker crash handling (record, drop)
    #[arg(long)]
    pub crash_policy: Option<String>,

    /// Only run files whose name ends with this suffix
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Output format (text, summary, json, json-pretty, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Exit 0 even when tests fail
    #[arg(long)]
    pub exit_zero: bool,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Directory searched recursively for test files
    pub dir: Option<PathBuf>,

    /// Only list files whose name ends with this suffix
    #[arg(short, long)]
    pub suffix: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write an example configuration file
    Init {
        /// Destination path
        #[arg(default_value = "spindle.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file
    Validate {
        /// File to check (defaults to the first one found)
        file: Option<PathBuf>,
    },

    /// Describe supported environment variables
    Env,
}
