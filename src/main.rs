//! Spindle - a minimal describe/it test harness
//!
//! Discovers test files under a directory and runs their cases either
//! in-process, one file after another, or on a bounded pool of worker
//! processes that each run one file at a time.
//!
//! ## Usage
//!
//! ```bash
//! # Run every file under ./tests in this process
//! spindle run
//!
//! # Run files under specs/ on four workers
//! spindle run specs --parallel --workers 4
//!
//! # Fresh worker per file, retry files whose worker crashed
//! spindle run --parallel --isolate --retry
//!
//! # Machine readable report
//! spindle run --format json --output report.json
//!
//! # Show what would run
//! spindle list specs --suffix .spec.yaml
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod cli;
mod config;
mod discovery;
mod executor;
mod models;
mod output;
mod registry;
mod units;
mod utils;

use cli::{Args, RunArgs};
use config::{ConfigFile, CrashPolicy, EnvConfig, HarnessConfig, RunMode};
use discovery::Discovery;
use executor::{run_worker, ParallelExecutor, PoolConfig, ProcessSpawner, TestRunner};
use models::Report;
use output::{write_report_to_file, OutputFormat, ResultFormatter};
use units::Loaders;
use utils::{init_logger, LogLevel, Timer};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = LogLevel::resolve(
        args.verbose,
        args.log_level.as_deref().or(env.log_level.as_deref()),
    )?;
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => {
            let code = run_tests(run_args, &env, level).await?;
            if code != 0 {
                std::io::stdout().flush()?;
                std::process::exit(code);
            }
        }
        cli::Command::List(list_args) => {
            list_files(list_args, &env)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env)?;
        }
        cli::Command::Worker => {
            run_worker(&Loaders::default())?;
        }
    }

    Ok(())
}

/// Layer config file, environment and flags into one configuration
fn resolve_config(args: &RunArgs, env: &EnvConfig) -> Result<HarnessConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));

    let mut config = match path {
        Some(path) => ConfigFile::load(&path)?.harness,
        None => ConfigFile::load_default()?.harness,
    };
    config.apply_env(env)?;

    if let Some(dir) = &args.dir {
        config.test_dir = dir.clone();
    }
    if args.parallel {
        config.mode = RunMode::Parallel;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.isolate {
        config.tasks_per_worker = 1;
    } else if let Some(tasks) = args.tasks_per_worker {
        config.tasks_per_worker = tasks;
    }
    if args.retry {
        config.retry_crashed = true;
    }
    if let Some(policy) = &args.crash_policy {
        config.crash_policy =
            CrashPolicy::from_str(policy).ok_or_else(|| anyhow!("Unknown crash policy: {policy}"))?;
    }
    if args.suffix.is_some() {
        config.suffix = args.suffix.clone();
    }
    if let Some(format) = &args.format {
        config.format = format.clone();
    }
    if args.no_color {
        config.color = false;
    }
    if args.exit_zero {
        config.exit_zero = true;
    }

    Ok(config)
}

async fn run_tests(args: RunArgs, env: &EnvConfig, level: LogLevel) -> Result<i32> {
    let config = resolve_config(&args, env)?;
    let format = OutputFormat::from_str(&config.format)
        .ok_or_else(|| anyhow!("Unknown output format: {}", config.format))?;

    let files = Discovery::new()
        .with_suffix(config.suffix.clone())
        .discover(&config.test_dir)?;

    info!(
        "Running {} files from {} ({:?})",
        files.len(),
        config.test_dir.display(),
        config.mode
    );

    let started_at = Utc::now();
    let timer = Timer::start("run");

    let report = match config.mode {
        RunMode::Sequential => {
            let summary = TestRunner::new(Loaders::default()).run_all(&files);
            Report::new(RunMode::Sequential, files.len(), summary)
        }
        RunMode::Parallel => {
            let spawner = ProcessSpawner::current_exe()?.with_log_level(level);
            let executor = ParallelExecutor::new(spawner, PoolConfig::from(&config));
            let outcome = executor.run_all(files.clone()).await;
            debug!(
                "Pool spawned {} workers, retried {} files",
                outcome.spawned, outcome.retried
            );
            Report::new(RunMode::Parallel, files.len(), outcome.summary)
                .with_workers(outcome.spawned, outcome.crashed)
        }
    }
    .with_timing(started_at, timer.stop());

    let formatter = if config.color {
        ResultFormatter::new(format)
    } else {
        ResultFormatter::new(format).no_color()
    };
    println!("{}", formatter.format_report(&report)?);

    if let Some(path) = &args.output {
        write_report_to_file(path, &report, format)?;
        info!("Report written to {path}");
    }

    Ok(config.exit_code(report.has_failures()))
}

fn list_files(args: cli::ListArgs, env: &EnvConfig) -> Result<()> {
    let run_args = RunArgs {
        dir: args.dir,
        suffix: args.suffix,
        ..Default::default()
    };
    let config = resolve_config(&run_args, env)?;

    let files = Discovery::new()
        .with_suffix(config.suffix.clone())
        .discover(&config.test_dir)?;

    for file in &files {
        println!("{}", file.display());
    }
    info!("{} test files under {}", files.len(), config.test_dir.display());

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show { config } => {
            let run_args = RunArgs {
                config,
                ..Default::default()
            };
            let effective = ConfigFile {
                harness: resolve_config(&run_args, env)?,
                ..Default::default()
            };
            println!("{}", serde_yaml::to_string(&effective)?);
            if env.has_any() {
                env.print_summary();
            }
        }

        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            ConfigFile::example().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(ConfigFile::find)
                .ok_or_else(|| anyhow!("No configuration file found"))?;
            validate_config(&path)?;
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}

fn validate_config(path: &Path) -> Result<()> {
    match ConfigFile::load(path) {
        Ok(_) => {
            println!("✓ Configuration file is valid: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration file is invalid: {}", path.display());
            Err(e).with_context(|| format!("Invalid configuration: {}", path.display()))
        }
    }
}
