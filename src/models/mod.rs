//! Data models for test runs
//!
//! Case records, error entries, trace lines, the mergeable run summary and
//! the final report.

mod case;
mod report;
mod summary;

pub use case::TestCase;
pub use report::Report;
pub use summary::{ErrorEntry, ErrorKind, RunSummary, TraceKind, TraceLine};
