//! Test file discovery
//!
//! Recursively lists a directory and returns the regular files in it.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Discovery errors; these abort the run
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Test directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recursive lister with an optional file-name suffix filter
#[derive(Clone, Debug, Default)]
pub struct Discovery {
    suffix: Option<String>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep files whose name ends with `suffix`
    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// List regular files under `root`, absolute, in a stable order: a
    /// directory's own files first (sorted by name), then each subdirectory's.
    pub fn discover(&self, root: impl AsRef<Path>) -> Result<Vec<PathBuf>, DiscoveryError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DiscoveryError::NotFound(root.to_path_buf()));
        }

        let root = fs::canonicalize(root).map_err(|source| DiscoveryError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        self.walk(&root, &mut files)?;
        debug!("Discovered {} files under {}", files.len(), root.display());
        Ok(files)
    }

    fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
        let read_err = |source| DiscoveryError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir)
            .map_err(read_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                subdirs.push(path);
            } else if path.is_file() && self.accepts(&path) {
                files.push(path);
            }
        }

        for subdir in subdirs {
            self.walk(&subdir, files)?;
        }

        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        match &self.suffix {
            Some(suffix) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(suffix.as_str()))
                .unwrap_or(false),
            None => true,
        }
    }
}
