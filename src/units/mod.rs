//! Test units and their loaders
//!
//! A test file is loaded into a `TestUnit`, whose `register` entry point
//! receives an explicit `Registrar`. Loaders are tried in order; the first
//! one that claims a path loads it.

mod context;
mod script;

pub use context::run_file;
pub use script::ScriptLoader;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::registry::Registrar;

/// Errors raised while turning a file into a test unit
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("no loader accepts {}", .0.display())]
    Unclaimed(PathBuf),
}

/// A loaded test module
pub trait TestUnit {
    /// Register suites and cases. An error returned here escaped every
    /// suite and case guard and is reported against the whole file.
    fn register(&self, t: &mut Registrar<'_>) -> Result<()>;
}

/// Turns files of a given kind into test units
pub trait UnitLoader: Send + Sync {
    fn name(&self) -> &'static str;

    fn claims(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> std::result::Result<Box<dyn TestUnit>, LoadError>;
}

/// Ordered loader chain
#[derive(Clone)]
pub struct Loaders {
    loaders: Vec<Arc<dyn UnitLoader>>,
}

impl Loaders {
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    pub fn with(mut self, loader: impl UnitLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    pub fn load(&self, path: &Path) -> std::result::Result<Box<dyn TestUnit>, LoadError> {
        let loader = self
            .loaders
            .iter()
            .find(|l| l.claims(path))
            .ok_or_else(|| LoadError::Unclaimed(path.to_path_buf()))?;
        debug!("Loading {} with the {} loader", path.display(), loader.name());
        loader.load(path)
    }
}

impl Default for Loaders {
    fn default() -> Self {
        Self::empty().with(ScriptLoader)
    }
}
