//! Test case models
//!
//! Defines the per-case record and its outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single `it` case
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl Outcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Pending => "○",
            Outcome::Passed => "✓",
            Outcome::Failed => "✗",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => write!(f, "PENDING"),
            Outcome::Passed => write!(f, "PASS"),
            Outcome::Failed => write!(f, "FAIL"),
        }
    }
}

/// Record of one case, created when `it` is invoked and resolved in the same call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub outcome: Outcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestCase {
    pub fn pending(title: impl Into<String>, suite: Option<String>) -> Self {
        Self {
            title: title.into(),
            suite,
            outcome: Outcome::Pending,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn pass(mut self, duration_ms: u64) -> Self {
        self.outcome = Outcome::Passed;
        self.duration_ms = duration_ms;
        self
    }

    pub fn fail(mut self, duration_ms: u64, error: impl Into<String>) -> Self {
        self.outcome = Outcome::Failed;
        self.duration_ms = duration_ms;
        self.error = Some(error.into());
        self
    }

    /// `suite > title`, or just the title for top-level cases
    pub fn full_title(&self) -> String {
        match &self.suite {
            Some(suite) => format!("{suite} > {}", self.title),
            None => self.title.clone(),
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.outcome.symbol(),
            self.full_title(),
            self.duration_ms
        )?;
        if let Some(error) = &self.error {
            write!(f, " - {error}")?;
        }
        Ok(())
    }
}
