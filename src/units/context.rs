//! Execution context for one file
//!
//! Every failure that escapes the file's suites and cases, including a
//! failure to load it, is recorded as a single file error and never
//! propagated to the caller.

use std::path::Path;
use tracing::{debug, warn};

use super::Loaders;
use crate::models::RunSummary;
use crate::registry::{guard, Registrar};

/// Run one file, recording its outcomes into `summary`
pub fn run_file(path: &Path, loaders: &Loaders, summary: &mut RunSummary) {
    debug!("Running {}", path.display());

    let unit = match loaders.load(path) {
        Ok(unit) => unit,
        Err(e) => {
            warn!("Could not load {}: {}", path.display(), e);
            summary.record_file_error(path, e.to_string());
            return;
        }
    };

    let outcome = {
        let mut registrar = Registrar::new(summary);
        guard(|| unit.register(&mut registrar))
    };

    if let Err(message) = outcome {
        warn!("{} aborted: {}", path.display(), message);
        summary.record_file_error(path, message);
    }
}
