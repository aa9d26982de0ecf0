//! Aggregation of judged records into per-check pass rates.

use std::fmt::Write as _;

use crate::judge::EvalRun;

const BAR_WIDTH: usize = 20;
const QUESTION_PREVIEW: usize = 60;
const RULE: &str = "============================================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRate {
    pub name: String,
    pub passed: usize,
    /// Records that carried this check, each counted once.
    pub total: usize,
}

impl CheckRate {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub file: String,
    pub question: String,
    pub failed: Vec<String>,
}

impl RecordSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub records: Vec<RecordSummary>,
    /// Checks in first-seen order.
    pub checks: Vec<CheckRate>,
    pub skipped: usize,
}

impl Report {
    #[must_use]
    pub fn aggregate(run: &EvalRun) -> Self {
        let mut report = Self {
            skipped: run.skipped,
            ..Self::default()
        };

        for result in &run.results {
            let verdicts = result.checklist.verdicts();
            for (name, pass) in &verdicts {
                let idx = if let Some(idx) = report.checks.iter().position(|c| c.name == *name) {
                    idx
                } else {
                    report.checks.push(CheckRate {
                        name: (*name).to_owned(),
                        passed: 0,
                        total: 0,
                    });
                    report.checks.len() - 1
                };
                let entry = &mut report.checks[idx];
                entry.total += 1;
                if *pass {
                    entry.passed += 1;
                }
            }
            report.records.push(RecordSummary {
                file: result.file.clone(),
                question: result.question.clone(),
                failed: verdicts
                    .iter()
                    .filter(|(_, pass)| !pass)
                    .map(|(name, _)| (*name).to_owned())
                    .collect(),
            });
        }

        report
    }

    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn pass_rate(&self, check: &str) -> Option<f64> {
        self.checks
            .iter()
            .find(|c| c.name == check)
            .map(CheckRate::rate)
    }

    /// Plain-text report for the terminal.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{RULE}\nEVALUATION RESULTS\n{RULE}");

        out.push_str("\nPer-question results:\n");
        for record in &self.records {
            let status = if record.passed() {
                "PASS".to_owned()
            } else {
                format!("FAIL ({})", record.failed.join(", "))
            };
            let preview: String = record.question.chars().take(QUESTION_PREVIEW).collect();
            let _ = writeln!(out, "  {preview}... -> {status}");
        }

        out.push_str("\nOverall pass rates:\n");
        for check in &self.checks {
            let rate = check.rate();
            let _ = writeln!(
                out,
                "  {:25} [{}] {:.0}%",
                check.name,
                bar(rate),
                rate * 100.0
            );
        }

        let _ = writeln!(out, "\nTotal interactions evaluated: {}", self.evaluated());
        let _ = writeln!(out, "Skipped records: {}", self.skipped);
        out
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar(rate: f64) -> String {
    let filled = ((rate * BAR_WIDTH as f64).floor() as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}
