//! Worker process loop
//!
//! A worker reads task lines, runs each file into a fresh summary that only
//! it owns, and writes back one result line per task. It exits when its
//! input closes.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

use super::protocol::{decode, encode, FromWorker, ToWorker};
use crate::models::RunSummary;
use crate::units::{run_file, Loaders};

/// Serve tasks from `reader` until EOF, returning how many were served
pub fn serve<R: BufRead, W: Write>(loaders: &Loaders, reader: R, mut writer: W) -> Result<usize> {
    let mut served = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read task from coordinator")?;
        if line.trim().is_empty() {
            continue;
        }

        let path = match decode::<ToWorker>(&line)? {
            ToWorker::Task(path) => path,
        };
        debug!("Worker {} running {}", std::process::id(), path.display());

        let mut summary = RunSummary::new();
        run_file(&path, loaders, &mut summary);

        let reply = encode(&FromWorker::Result(summary))?;
        writeln!(writer, "{reply}").context("Failed to send result to coordinator")?;
        writer.flush()?;
        served += 1;
    }

    Ok(served)
}

/// Entry point of the `worker` subcommand
pub fn run_worker(loaders: &Loaders) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let served = serve(loaders, stdin.lock(), stdout.lock())?;

    info!("Worker {} done after {} tasks", std::process::id(), served);
    Ok(())
}
