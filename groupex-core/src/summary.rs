use crate::service::ExportOutcome;
use chrono::{DateTime, Local};
use groupex_scanner::ScrollOutcome;
use std::path::PathBuf;

/// Human-readable account of one export run.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub count: usize,
    pub path: PathBuf,
    pub steps: usize,
    pub outcome: ScrollOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl ExportSummary {
    pub fn from_outcome(
        outcome: &ExportOutcome,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> Self {
        Self {
            count: outcome.extraction.count(),
            path: outcome.path.clone(),
            steps: outcome.extraction.scroll.steps,
            outcome: outcome.extraction.scroll.outcome,
            started_at,
            finished_at,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.outcome == ScrollOutcome::TimedOut
    }

    pub fn render(&self) -> String {
        let took = (self.finished_at - self.started_at).num_seconds().max(0);
        let noun = if self.count == 1 { "group" } else { "groups" };
        let ending = match self.outcome {
            ScrollOutcome::Plateau => "plateau",
            ScrollOutcome::TimedOut => "timed out, partial listing",
        };
        let mut report = String::new();
        report.push_str(&format!("  Exported: {} {}\n", self.count, noun));
        report.push_str(&format!("  Scroll: {} steps, {}\n", self.steps, ending));
        report.push_str(&format!("  File: {}\n", self.path.display()));
        report.push_str(&format!(
            "  Finished: {} (took {}s)\n",
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            took
        ));
        report
    }
}
