//! Per-plugin statistics and filter-stage outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::flake::FlakeRecord;
use crate::result::TestStatus;

/// Leaf count per observed status token.
///
/// Not limited to the four known statuses: unrecognized tokens get their own
/// bucket so that `total` always equals the number of leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCounts(BTreeMap<String, u64>);

impl StatusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the bucket for `status` and return the new count.
    pub fn increment(&mut self, status: &TestStatus) -> u64 {
        let slot = self.0.entry(status.as_str().to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Count for a status.
    pub fn get(&self, status: &TestStatus) -> u64 {
        self.0.get(status.as_str()).copied().unwrap_or(0)
    }

    /// Sum over every bucket.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

/// A failed or timed-out test with its captured diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Full test name.
    pub name: String,
    /// Failure text, empty when the runner reported none.
    #[serde(default)]
    pub failure_message: String,
    /// Captured standard output, empty when absent.
    #[serde(default)]
    pub system_out: String,
    /// 1-based rank among leaves with the same status.
    pub offset: u64,
    /// Flake corpus record, set only after an enrichment attempt found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flake_info: Option<FlakeRecord>,
}

impl FailedItem {
    pub fn new(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            ..Default::default()
        }
    }
}

/// Identifies one stage of the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStage {
    /// Intersection with the authoritative suite.
    Suite,
    /// Exclusion of failures also seen on the baseline.
    Baseline,
    /// Exclusion of tests currently flaking upstream.
    Flake,
}

impl FilterStage {
    /// Stages in pipeline order.
    pub fn all() -> &'static [FilterStage] {
        &[Self::Suite, Self::Baseline, Self::Flake]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Suite => "suite",
            Self::Baseline => "baseline",
            Self::Flake => "flake",
        }
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sorted outputs of each filter stage. Each is written at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_filter_suite: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_filter_baseline: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_filter_flake: Option<Vec<String>>,
}

impl FilterOutputs {
    /// Output of a stage, if it has run.
    pub fn get(&self, stage: FilterStage) -> Option<&[String]> {
        match stage {
            FilterStage::Suite => self.failed_filter_suite.as_deref(),
            FilterStage::Baseline => self.failed_filter_baseline.as_deref(),
            FilterStage::Flake => self.failed_filter_flake.as_deref(),
        }
    }

    fn slot(&mut self, stage: FilterStage) -> &mut Option<Vec<String>> {
        match stage {
            FilterStage::Suite => &mut self.failed_filter_suite,
            FilterStage::Baseline => &mut self.failed_filter_baseline,
            FilterStage::Flake => &mut self.failed_filter_flake,
        }
    }
}

/// Reduced statistics of one plugin's result tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin identifier.
    pub name: String,
    /// Verdict reported by the runner for the whole plugin.
    pub status: String,
    pub total: u64,
    pub passed: u64,
    /// Failed plus timed-out leaves.
    pub failed: u64,
    pub timeout: u64,
    pub skipped: u64,
    /// Every observed status bucket.
    pub status_counts: StatusCounts,
    /// Failing test names in traversal order.
    pub failed_list: Vec<String>,
    /// Failure details keyed by test name.
    pub failed_items: BTreeMap<String, FailedItem>,
    /// Filter pipeline outputs.
    #[serde(default)]
    pub filters: FilterOutputs,
}

impl PluginSummary {
    /// Empty summary for a plugin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Write a stage output once. The list is stored sorted.
    pub fn set_filter(&mut self, stage: FilterStage, mut tests: Vec<String>) -> ModelResult<()> {
        let name = self.name.clone();
        let slot = self.filters.slot(stage);
        if slot.is_some() {
            return Err(ModelError::FilterAlreadyApplied {
                plugin: name,
                stage,
            });
        }
        tests.sort();
        *slot = Some(tests);
        Ok(())
    }

    /// Output of a stage, if it has run.
    pub fn filter(&self, stage: FilterStage) -> Option<&[String]> {
        self.filters.get(stage)
    }

    /// The most advanced stage output that exists.
    ///
    /// Falls back to the raw failure list when no stage has run.
    pub fn final_failures(&self) -> &[String] {
        FilterStage::all()
            .iter()
            .rev()
            .find_map(|stage| self.filters.get(*stage))
            .unwrap_or(self.failed_list.as_slice())
    }

    /// Whether every stage has been written.
    pub fn is_fully_filtered(&self) -> bool {
        FilterStage::all().iter().all(|s| self.filters.get(*s).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_include_unknown_buckets() {
        let mut counts = StatusCounts::new();
        counts.increment(&TestStatus::Passed);
        counts.increment(&TestStatus::Passed);
        assert_eq!(counts.increment(&TestStatus::Other("weird".into())), 1);
        assert_eq!(counts.get(&TestStatus::Passed), 2);
        assert_eq!(counts.get(&TestStatus::Failed), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_set_filter_sorts_and_is_write_once() {
        let mut summary = PluginSummary::new("p");
        summary
            .set_filter(FilterStage::Suite, vec!["b".into(), "a".into()])
            .unwrap();
        assert_eq!(summary.filter(FilterStage::Suite).unwrap(), ["a", "b"]);

        let err = summary
            .set_filter(FilterStage::Suite, vec![])
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::FilterAlreadyApplied {
                plugin: "p".into(),
                stage: FilterStage::Suite,
            }
        );
        assert_eq!(summary.filter(FilterStage::Suite).unwrap().len(), 2);
    }

    #[test]
    fn test_final_failures_uses_latest_stage() {
        let mut summary = PluginSummary::new("p");
        summary.failed_list = vec!["x".into(), "y".into(), "z".into()];
        assert_eq!(summary.final_failures().len(), 3);

        summary
            .set_filter(FilterStage::Suite, vec!["x".into(), "y".into()])
            .unwrap();
        assert_eq!(summary.final_failures(), ["x", "y"]);

        summary
            .set_filter(FilterStage::Baseline, vec!["y".into()])
            .unwrap();
        assert_eq!(summary.final_failures(), ["y"]);
        assert!(!summary.is_fully_filtered());

        summary.set_filter(FilterStage::Flake, vec![]).unwrap();
        assert!(summary.final_failures().is_empty());
        assert!(summary.is_fully_filtered());
    }

    #[test]
    fn test_filter_stage_serde_lowercase() {
        let json = serde_json::to_string(&FilterStage::Baseline).unwrap();
        assert_eq!(json, "\"baseline\"");
    }
}
