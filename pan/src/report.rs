//! Exit classification and the JSON results file

use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// TCONF exit code of the test harness.
const EXIT_CONF: i32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Conf,
    Fail,
    Brok,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Conf => "CONF",
            Verdict::Fail => "FAIL",
            Verdict::Brok => "BROK",
        }
    }
}

/// Map a finished test's exit status onto a verdict.
///
/// Exit 0 passed, exit 32 is the harness TCONF, any other exit failed and a
/// signal death means the test never got to report.
pub fn classify(status: ExitStatus) -> Verdict {
    use std::os::unix::process::ExitStatusExt;

    match status.code() {
        Some(0) => Verdict::Pass,
        Some(EXIT_CONF) => Verdict::Conf,
        Some(_) => Verdict::Fail,
        None => {
            debug_assert!(status.signal().is_some());
            Verdict::Brok
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestResult {
    pub tag: String,
    pub cmdline: String,
    pub verdict: Verdict,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub duration_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub broken: usize,
}

impl Summary {
    fn count(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Conf => self.skipped += 1,
            Verdict::Fail => self.failed += 1,
            Verdict::Brok => self.broken += 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: Summary,
    pub results: Vec<TestResult>,
}

impl Report {
    pub fn new(started_at: DateTime<Utc>, mut results: Vec<TestResult>) -> Report {
        results.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        let mut summary = Summary::default();
        for r in &results {
            summary.count(r.verdict);
        }
        Report {
            started_at,
            finished_at: Utc::now(),
            summary,
            results,
        }
    }

    /// Whether the run as a whole succeeded. TCONF does not fail a run.
    pub fn all_good(&self) -> bool {
        self.summary.failed == 0 && self.summary.broken == 0
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing results")?;
        std::fs::write(path, json).with_context(|| format!("writing results to {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn exited(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn exit_codes_classify() {
        assert_eq!(classify(exited(0)), Verdict::Pass);
        assert_eq!(classify(exited(32)), Verdict::Conf);
        assert_eq!(classify(exited(1)), Verdict::Fail);
        assert_eq!(classify(exited(2)), Verdict::Fail);
        // Killed by SIGKILL.
        assert_eq!(classify(ExitStatus::from_raw(9)), Verdict::Brok);
    }

    #[test]
    fn summary_counts_per_verdict() {
        let now = Utc::now();
        let mk = |tag: &str, verdict| TestResult {
            tag: tag.into(),
            cmdline: tag.into(),
            verdict,
            exit_code: Some(0),
            signal: None,
            duration_secs: 0.1,
            started_at: now,
            finished_at: now,
        };
        let report = Report::new(
            now,
            vec![
                mk("a", Verdict::Pass),
                mk("b", Verdict::Fail),
                mk("c", Verdict::Conf),
                mk("d", Verdict::Pass),
            ],
        );
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!(!report.all_good());
    }
}
