//! Markdown execution log for scenario runs.

use crate::error::HarnessError;
use rmr_utils::{format_duration, format_duration_precise};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const LOG_HEADER: &str = "# RMR Test Execution Log\n\n";

#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    pub elapsed: Duration,
}

/// Outcome of the steps of one run, rendered as a markdown section.
pub struct ExecutionReport {
    title: String,
    started_unix: u64,
    started: Instant,
    step_started: Instant,
    steps: Vec<StepResult>,
}

impl ExecutionReport {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            title: title.into(),
            started_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            started: now,
            step_started: now,
            steps: Vec::new(),
        }
    }

    /// Record a step; its duration runs from the previous record.
    pub fn record(&mut self, name: impl Into<String>, passed: bool, detail: impl Into<String>) {
        let now = Instant::now();
        self.steps.push(StepResult {
            name: name.into(),
            passed,
            detail: detail.into(),
            elapsed: now.duration_since(self.step_started),
        });
        self.step_started = now;
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn total(&self) -> usize {
        self.steps.len()
    }

    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Percentage of passed steps; 0 for an empty report.
    pub fn pass_rate(&self) -> f64 {
        percent(self.passed(), self.total())
    }

    pub fn render(&self) -> String {
        let total = self.total();
        let mut out = String::new();
        let _ = writeln!(out, "## {}", self.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "- Started: {} (unix)", self.started_unix);
        let _ = writeln!(
            out,
            "- Duration: {}",
            format_duration(self.started.elapsed().as_secs())
        );
        let _ = writeln!(out, "- Total: {total}");
        let _ = writeln!(out, "- Passed: {} ({:.1}%)", self.passed(), self.pass_rate());
        let _ = writeln!(
            out,
            "- Failed: {} ({:.1}%)",
            self.failed(),
            percent(self.failed(), total)
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "| Step | Result | Time | Detail |");
        let _ = writeln!(out, "|------|--------|------|--------|");
        for step in &self.steps {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                step.name,
                if step.passed { "PASS" } else { "FAIL" },
                format_duration_precise(step.elapsed),
                step.detail.replace('|', "\\|").replace('\n', " ")
            );
        }
        let _ = writeln!(out);
        out
    }

    /// Append the rendered section to `path`, writing the log header when the
    /// file is new or empty.
    pub fn append_to(&self, path: &Path) -> Result<(), HarnessError> {
        let io_err = |source| HarnessError::Report {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let is_new = file.metadata().map_err(io_err)?.len() == 0;
        if is_new {
            file.write_all(LOG_HEADER.as_bytes()).map_err(io_err)?;
        }
        file.write_all(self.render().as_bytes()).map_err(io_err)?;
        tracing::info!(path = %path.display(), passed = self.passed(), failed = self.failed(), "report written");
        Ok(())
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
