//! Check report generation.
//!
//! Records the verdict of every rule in catalog order and renders them with
//! box-drawing display.

use chrono::{DateTime, Utc};
use provcert_types::{CheckOutcome, CheckResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of one rule, with the rule's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: Option<String>,
    pub name: String,
    pub documentation_ref: Option<String>,
    pub result: CheckResult,
}

impl CheckRecord {
    pub fn outcome(&self) -> CheckOutcome {
        self.result.outcome
    }
}

impl fmt::Display for CheckRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} {}: {}", id, self.name, self.result),
            None => write!(f, "{}: {}", self.name, self.result),
        }
    }
}

/// Counts over a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Result of running a catalog against one summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Records in catalog order.
    pub records: Vec<CheckRecord>,
    pub summary: CheckSummary,
}

impl CheckReport {
    pub fn from_records(
        records: Vec<CheckRecord>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let count = |outcome: CheckOutcome| records.iter().filter(|r| r.outcome() == outcome).count();
        let summary = CheckSummary {
            total: records.len(),
            passed: count(CheckOutcome::Pass),
            failed: count(CheckOutcome::Fail),
            skipped: count(CheckOutcome::Skip),
            started_at,
            completed_at,
        };
        Self { records, summary }
    }

    fn with_outcome(&self, outcome: CheckOutcome) -> Vec<&CheckRecord> {
        self.records.iter().filter(|r| r.outcome() == outcome).collect()
    }

    pub fn passed(&self) -> Vec<&CheckRecord> {
        self.with_outcome(CheckOutcome::Pass)
    }

    pub fn failed(&self) -> Vec<&CheckRecord> {
        self.with_outcome(CheckOutcome::Fail)
    }

    pub fn skipped(&self) -> Vec<&CheckRecord> {
        self.with_outcome(CheckOutcome::Skip)
    }

    /// Accepted when no rule failed.
    pub fn is_accepted(&self) -> bool {
        self.summary.failed == 0
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f, "|   Provider Certification Checks                 |")?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(
            f,
            "| Total: {:3}  Passed: {:3}  Failed: {:3}  Skip: {:2} |",
            self.summary.total, self.summary.passed, self.summary.failed, self.summary.skipped,
        )?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f)?;

        for record in &self.records {
            let mark = match record.outcome() {
                CheckOutcome::Pass => "+",
                CheckOutcome::Fail => "x",
                CheckOutcome::Skip => "-",
            };
            writeln!(f, "  [{}] {}", mark, record)?;
            if record.outcome() == CheckOutcome::Fail {
                if let Some(doc) = &record.documentation_ref {
                    writeln!(f, "      see {}", doc)?;
                }
            }
        }

        writeln!(f)?;
        if self.is_accepted() {
            writeln!(f, "  ALL {} CHECKS ACCEPTED", self.summary.total)?;
        } else {
            writeln!(f, "  {} CHECK(S) FAILED, REVIEW REQUIRED", self.summary.failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: Option<&str>, result: CheckResult) -> CheckRecord {
        CheckRecord {
            id: id.map(str::to_string),
            name: "rule".into(),
            documentation_ref: id.map(|id| format!("https://docs/review/rules/#{id}")),
            result,
        }
    }

    #[test]
    fn test_projections() {
        let now = Utc::now();
        let report = CheckReport::from_records(
            vec![
                record(Some("OPCT-001"), CheckResult::fail("0").pass()),
                record(Some("OPCT-004"), CheckResult::fail("<=1.5").with_actual("2.00")),
                record(None, CheckResult::fail("True").skip("not applicable")),
            ],
            now,
            now,
        );
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.passed().len(), 1);
        assert_eq!(report.failed()[0].id.as_deref(), Some("OPCT-004"));
        assert_eq!(report.skipped().len(), 1);
        assert!(!report.is_accepted());
    }

    #[test]
    fn test_report_display() {
        let now = Utc::now();
        let report = CheckReport::from_records(
            vec![record(
                Some("OPCT-004"),
                CheckResult::fail("<=1.5").with_actual("2.00"),
            )],
            now,
            now,
        );
        let text = report.to_string();
        assert!(text.contains("[x] OPCT-004 rule: fail (want=<=1.5 got=2.00)"));
        assert!(text.contains("see https://docs/review/rules/#OPCT-004"));
        assert!(text.contains("1 CHECK(S) FAILED"));
    }

    #[test]
    fn test_empty_report_is_accepted() {
        let now = Utc::now();
        let report = CheckReport::from_records(Vec::new(), now, now);
        assert!(report.is_accepted());
        assert!(report.to_string().contains("ALL 0 CHECKS ACCEPTED"));
    }
}
