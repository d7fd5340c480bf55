//! Output formatters for run reports
//!
//! Provides text, one-line summary, JSON and CSV renderings.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ErrorEntry, ErrorKind, Report, RunSummary, TraceKind, TraceLine};

const RULE: &str = "==================================================";

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Summary,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Some(OutputFormat::Text),
            "summary" => Some(OutputFormat::Summary),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Report formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Render a finished run
    pub fn format_report(&self, report: &Report) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.format_text(report)),
            OutputFormat::Summary => Ok(self.format_brief(report)),
            OutputFormat::Json => {
                serde_json::to_string(report).context("Failed to serialize report")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(report).context("Failed to serialize report")
            }
            OutputFormat::Csv => self.format_csv(&report.summary),
        }
    }

    /// Render one trace line
    pub fn format_trace(&self, line: &TraceLine) -> String {
        if !self.colorize {
            return line.text.clone();
        }
        let code = match line.kind {
            TraceKind::Suite => "\x1b[47;30m",
            TraceKind::Start => "\x1b[33m",
            TraceKind::Pass => "\x1b[32m",
            TraceKind::Fail => "\x1b[31m",
        };
        format!("{code}{}\x1b[0m", line.text)
    }

    fn format_text(&self, report: &Report) -> String {
        let summary = &report.summary;
        let mut output = String::new();

        for line in &summary.output_lines {
            if line.kind == TraceKind::Suite {
                output.push('\n');
            }
            output.push_str(&self.format_trace(line));
            output.push('\n');
        }

        output.push_str("\n\n");
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&self.format_counts(summary));
        output.push('\n');
        output.push_str(RULE);
        output.push('\n');

        for (i, error) in summary.errors.iter().enumerate() {
            output.push_str(&self.format_error(i + 1, error));
        }

        output
    }

    fn format_counts(&self, summary: &RunSummary) -> String {
        let passed = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let failed = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        format!(
            "Total Tests: {}, Passed: {}, Failed: {}",
            summary.total, passed, failed
        )
    }

    fn format_error(&self, index: usize, error: &ErrorEntry) -> String {
        // Crashes in magenta, everything else red
        let title = if self.colorize {
            let code = match error.kind {
                ErrorKind::Crash => 35,
                _ => 31,
            };
            format!("\x1b[{code}m{}\x1b[0m", error.title)
        } else {
            error.title.clone()
        };
        format!("{index}) [{}] {}: \n\t{}\n", error.kind, title, error.message)
    }

    fn format_brief(&self, report: &Report) -> String {
        let summary = &report.summary;
        format!(
            "{:?} run over {} files: {}/{} passed ({:.1}%), {} failed, {} other errors in {}ms",
            report.mode,
            report.files,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.failed,
            summary.non_case_errors(),
            report.duration_ms
        )
    }

    fn format_csv(&self, summary: &RunSummary) -> Result<String> {
        #[derive(Serialize)]
        struct Row<'a> {
            suite: &'a str,
            title: &'a str,
            outcome: String,
            duration_ms: u64,
            error: &'a str,
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for case in &summary.cases {
            writer
                .serialize(Row {
                    suite: case.suite.as_deref().unwrap_or(""),
                    title: &case.title,
                    outcome: case.outcome.to_string(),
                    duration_ms: case.duration_ms,
                    error: case.error.as_deref().unwrap_or(""),
                })
                .context("Failed to write CSV row")?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV")?;
        String::from_utf8(bytes).context("CSV output was not UTF-8")
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}

/// Write a report to a file, uncoloured
pub fn write_report_to_file(path: &str, report: &Report, format: OutputFormat) -> Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_report(report)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write report to {path}"))?;
    Ok(())
}
