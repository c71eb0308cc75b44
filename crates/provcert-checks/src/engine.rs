//! Runs a catalog against a consolidated summary.

use chrono::Utc;
use provcert_summary::ConsolidatedSummary;
use tracing::{info, instrument, warn};

use crate::catalog::CheckCatalog;
use crate::report::{CheckRecord, CheckReport};

/// Evaluates every rule of a catalog, in catalog order.
#[derive(Debug, Default)]
pub struct CheckEngine {
    catalog: CheckCatalog,
}

impl CheckEngine {
    pub fn new(catalog: CheckCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CheckCatalog {
        &self.catalog
    }

    /// Evaluate all rules. Rules never error; missing data is a failure.
    #[instrument(skip_all, fields(checks = self.catalog.len()))]
    pub fn run(&self, summary: &ConsolidatedSummary) -> CheckReport {
        if !summary.is_filtered() {
            warn!(state = %summary.state(), "Evaluating checks on a summary that was not filtered");
        }

        let started_at = Utc::now();
        let records = self
            .catalog
            .iter()
            .map(|check| CheckRecord {
                id: check.id().map(str::to_string),
                name: check.name().to_string(),
                documentation_ref: check.documentation_ref().map(str::to_string),
                result: check.evaluate(summary),
            })
            .collect();
        let report = CheckReport::from_records(records, started_at, Utc::now());

        info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            accepted = report.is_accepted(),
            "Checks evaluated"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Check, RuleMeta};
    use provcert_types::CheckResult;

    #[derive(Debug)]
    struct Fixed(RuleMeta, bool);

    impl Check for Fixed {
        fn meta(&self) -> &RuleMeta {
            &self.0
        }

        fn evaluate(&self, _summary: &ConsolidatedSummary) -> CheckResult {
            let res = CheckResult::fail("ok");
            if self.1 {
                res.pass()
            } else {
                res
            }
        }
    }

    #[test]
    fn test_run_preserves_catalog_order() {
        let engine = CheckEngine::new(CheckCatalog::from_checks(vec![
            Box::new(Fixed(RuleMeta::with_id("B", "second"), true)),
            Box::new(Fixed(RuleMeta::with_id("A", "first"), false)),
        ]));
        let report = engine.run(&ConsolidatedSummary::new());

        let ids: Vec<_> = report.records.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, [Some("B"), Some("A")]);
        assert_eq!(report.passed().len(), 1);
        assert!(!report.is_accepted());
    }

    #[test]
    fn test_default_catalog_fails_closed_on_empty_summary() {
        let report = CheckEngine::default().run(&ConsolidatedSummary::new());
        assert_eq!(report.summary.total, 18);
        assert_eq!(report.summary.failed, 18);
        assert!(report
            .records
            .iter()
            .all(|r| r.result.message == "provider results are not loaded"));
    }
}
