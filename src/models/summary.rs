//! Run summary models
//!
//! A `RunSummary` belongs to exactly one execution unit: the sequential run,
//! one worker task, or the coordinator's aggregate. Summaries combine with
//! `merge`, which is associative and has the empty summary as identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::case::{Outcome, TestCase};

/// Where an error entry was caught
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Raised inside an `it` body; counted in `failed`
    Case,
    /// Raised inside a `describe` body outside any case
    Suite,
    /// The file could not be loaded or escaped its guard
    File,
    /// A worker exited while holding the file
    Crash,
}

impl ErrorKind {
    pub fn counts_as_failure(&self) -> bool {
        matches!(self, ErrorKind::Case)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Case => write!(f, "case"),
            ErrorKind::Suite => write!(f, "suite"),
            ErrorKind::File => write!(f, "file"),
            ErrorKind::Crash => write!(f, "crash"),
        }
    }
}

/// One `{title, error}` pair of the error list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub title: String,
    pub message: String,
    pub kind: ErrorKind,
}

impl ErrorEntry {
    pub fn new(kind: ErrorKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \n\t{}", self.title, self.message)
    }
}

/// Kind of a trace line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Suite,
    Start,
    Pass,
    Fail,
}

/// A single line of execution trace, rendered by the reporter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
    pub kind: TraceKind,
    pub text: String,
}

impl TraceLine {
    pub fn suite(title: &str) -> Self {
        Self {
            kind: TraceKind::Suite,
            text: format!("Suite: {title}"),
        }
    }

    pub fn start(title: &str) -> Self {
        Self {
            kind: TraceKind::Start,
            text: format!("{title}: Running"),
        }
    }

    pub fn finished(title: &str, outcome: Outcome, duration_ms: u64) -> Self {
        let kind = if outcome.is_success() {
            TraceKind::Pass
        } else {
            TraceKind::Fail
        };
        Self {
            kind,
            text: format!("{title}: Finished ({duration_ms}ms)"),
        }
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Counters, error list and trace of one execution unit
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
    #[serde(default)]
    pub output_lines: Vec<TraceLine>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved case, updating counters and the error list
    pub fn record_case(&mut self, case: TestCase) {
        match case.outcome {
            // Unresolved cases are not counted.
            Outcome::Pending => return,
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => {
                self.failed += 1;
                self.errors.push(ErrorEntry::new(
                    ErrorKind::Case,
                    case.title.clone(),
                    case.error.clone().unwrap_or_default(),
                ));
            }
        }
        self.total += 1;
        self.cases.push(case);
    }

    pub fn record_suite_error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.errors
            .push(ErrorEntry::new(ErrorKind::Suite, title, message));
    }

    /// Record that a file could not be run; the title names the path
    pub fn record_file_error(&mut self, path: &Path, message: impl Into<String>) {
        self.errors.push(ErrorEntry::new(
            ErrorKind::File,
            format!("Couldn't run {}", path.display()),
            message,
        ));
    }

    pub fn record_crash(&mut self, path: &Path, message: impl Into<String>) {
        self.errors.push(ErrorEntry::new(
            ErrorKind::Crash,
            format!("Worker crashed running {}", path.display()),
            message,
        ));
    }

    pub fn trace(&mut self, line: TraceLine) {
        self.output_lines.push(line);
    }

    /// Fold another summary into this one. Counters add, lists concatenate,
    /// and `other`'s trace is appended as one contiguous block.
    pub fn absorb(&mut self, other: RunSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.output_lines.extend(other.output_lines);
        self.cases.extend(other.cases);
    }

    /// Pure form of `absorb`
    pub fn merge(mut self, other: RunSummary) -> RunSummary {
        self.absorb(other);
        self
    }

    /// `total == passed + failed` and every case failure has exactly one error entry
    pub fn is_consistent(&self) -> bool {
        let case_errors = self
            .errors
            .iter()
            .filter(|e| e.kind.counts_as_failure())
            .count();
        self.total == self.passed + self.failed && case_errors == self.failed
    }

    pub fn non_case_errors(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| !e.kind.counts_as_failure())
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.errors.is_empty()
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Tests: {}, Passed: {}, Failed: {}",
            self.total, self.passed, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn merge_all(summaries: impl IntoIterator<Item = RunSummary>) -> RunSummary {
        summaries.into_iter().fold(RunSummary::new(), RunSummary::merge)
    }

    fn summary(passes: usize, failures: usize, tag: &str) -> RunSummary {
        let mut s = RunSummary::new();
        for i in 0..passes {
            s.record_case(TestCase::pending(format!("{tag}-ok-{i}"), None).pass(1));
        }
        for i in 0..failures {
            s.record_case(TestCase::pending(format!("{tag}-bad-{i}"), None).fail(1, "boom"));
        }
        s.trace(TraceLine::suite(tag));
        s
    }

    #[test]
    fn test_record_case_counts() {
        let s = summary(2, 1, "a");
        assert_eq!(s.total, 3);
        assert_eq!(s.passed, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.errors.len(), 1);
        assert_eq!(s.errors[0].title, "a-bad-0");
        assert_eq!(s.errors[0].message, "boom");
        assert!(s.is_consistent());
    }

    #[test]
    fn test_pending_case_is_not_counted() {
        let mut s = RunSummary::new();
        s.record_case(TestCase::pending("never resolved", None));
        assert_eq!(s.total, 0);
        assert!(s.cases.is_empty());
    }

    #[test]
    fn test_non_case_errors_leave_counters() {
        let mut s = RunSummary::new();
        s.record_suite_error("math", "setup failed");
        s.record_file_error(&PathBuf::from("/t/a.yaml"), "parse error");
        s.record_crash(&PathBuf::from("/t/b.yaml"), "exit status 3");
        assert_eq!(s.total, 0);
        assert_eq!(s.failed, 0);
        assert_eq!(s.non_case_errors(), 3);
        assert_eq!(s.errors[1].title, "Couldn't run /t/a.yaml");
        assert!(s.is_consistent());
        assert!(s.has_failures());
    }

    #[test]
    fn test_merge_is_elementwise_sum() {
        let parts = vec![summary(1, 0, "a"), summary(2, 2, "b"), summary(0, 1, "c")];
        let merged = merge_all(parts.clone());

        assert_eq!(merged.total, parts.iter().map(|p| p.total).sum::<usize>());
        assert_eq!(merged.passed, 3);
        assert_eq!(merged.failed, 3);
        assert!(merged.is_consistent());

        let errors: Vec<_> = parts.iter().flat_map(|p| p.errors.clone()).collect();
        assert_eq!(merged.errors, errors);
    }

    #[test]
    fn test_merge_is_associative_with_identity() {
        let (a, b, c) = (summary(1, 1, "a"), summary(2, 0, "b"), summary(0, 3, "c"));
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.clone().merge(b.merge(c));
        assert_eq!(left, right);
        assert_eq!(RunSummary::new().merge(a.clone()), a);
    }

    #[test]
    fn test_arrival_order_does_not_change_counters() {
        let parts = vec![summary(3, 0, "a"), summary(1, 2, "b"), summary(0, 1, "c")];
        let forward = merge_all(parts.clone());
        let backward = merge_all(parts.into_iter().rev());

        assert_eq!(
            (forward.total, forward.passed, forward.failed),
            (backward.total, backward.passed, backward.failed)
        );
        assert_ne!(forward.errors, backward.errors);
    }

    #[test]
    fn test_trace_blocks_stay_contiguous() {
        let mut agg = RunSummary::new();
        agg.absorb(summary(1, 0, "first"));
        agg.absorb(summary(1, 0, "second"));
        let texts: Vec<_> = agg.output_lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Suite: first", "Suite: second"]);
    }

    #[test]
    fn test_summary_serde() {
        let s = summary(1, 1, "wire");
        let json = serde_json::to_string(&s).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
