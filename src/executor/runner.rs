//! Sequential test runner
//!
//! Runs every file in this process into one shared summary.

use std::path::PathBuf;
use tracing::info;

use crate::models::RunSummary;
use crate::units::{run_file, Loaders};
use crate::utils::Timer;

/// In-process runner
pub struct TestRunner {
    loaders: Loaders,
}

impl TestRunner {
    pub fn new(loaders: Loaders) -> Self {
        Self { loaders }
    }

    /// Run all files in order
    pub fn run_all(&self, files: &[PathBuf]) -> RunSummary {
        info!("Running {} files sequentially", files.len());

        let timer = Timer::start("sequential run");
        let mut summary = RunSummary::new();
        for file in files {
            run_file(file, &self.loaders, &mut summary);
        }

        info!(
            "Sequential run completed in {}ms - Pass: {}/{} ({:.1}%)",
            timer.stop(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        summary
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new(Loaders::default())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_three_files_two_passing_cases_each() {
        let tmp = TempDir::new().unwrap();
        let files: Vec<PathBuf> = ["fib", "closest", "frequent"]
            .iter()
            .map(|name| {
                let path = tmp.path().join(format!("{name}.spec.yaml"));
                std::fs::write(
                    &path,
                    format!(
                        "- describe: {name}\n  body:\n    - it: first\n      steps:\n        - equal: [1, 1]\n    - it: second\n"
                    ),
                )
                .unwrap();
                path
            })
            .collect();

        let summary = TestRunner::default().run_all(&files);
        assert_eq!((summary.total, summary.passed, summary.failed), (6, 6, 0));
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_single_throwing_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("boom.yaml");
        std::fs::write(&path, "- it: explodes\n  steps:\n    - fail: boom\n").unwrap();

        let summary = TestRunner::default().run_all(&[path]);
        assert_eq!((summary.total, summary.passed, summary.failed), (1, 0, 1));
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].title, "explodes");
        assert_eq!(summary.errors[0].message, "boom");
    }

    #[test]
    fn test_no_files() {
        let summary = TestRunner::default().run_all(&[]);
        assert_eq!(summary, RunSummary::new());
    }
}
