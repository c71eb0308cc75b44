//! Filter pipeline isolating failures attributable to the provider.
//!
//! Stages run in order, each consuming the previous stage's output:
//!
//! 1. **Suite**: keep failures that belong to the authoritative suite
//! 2. **Baseline**: drop failures also seen on the reference run
//! 3. **Flake**: drop failures that are currently flaking upstream
//!
//! Every stage output is deduplicated and sorted, so identical inputs and a
//! frozen corpus always give identical lists.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use provcert_flake::pool::QueryOutcomes;
use provcert_flake::FlakeQueryPool;
use provcert_types::{FailedItem, FilterStage, FlakeRecord, PluginSummary, SuiteDefinition};
use tracing::{info, instrument, warn};

use crate::error::SummaryResult;

/// Stage A: `{ t in raw : t in suite }`, deduplicated and sorted.
pub fn stage_suite(raw: &[String], suite: &SuiteDefinition) -> Vec<String> {
    raw.iter()
        .filter(|t| suite.contains(t))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Stage B: `input \ baseline_raw`, sorted.
///
/// `None` means no baseline is available and passes `input` through.
pub fn stage_baseline(input: &[String], baseline_raw: Option<&[String]>) -> Vec<String> {
    let excluded: HashSet<&str> = baseline_raw
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    input
        .iter()
        .filter(|t| !excluded.contains(t.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Outcome of stage C for one plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlakeClassification {
    /// Tests kept as provider failures, sorted.
    pub retained: Vec<String>,
    /// Tests excluded as currently flaking, sorted.
    pub flaking: Vec<String>,
    /// First record returned for each test that had one.
    pub records: BTreeMap<String, FlakeRecord>,
    /// Tests whose query failed and were kept.
    pub errors: Vec<String>,
}

/// Stage C: split `input` by corpus outcome.
///
/// A test is flaking when any returned record reports current flakes. Query
/// errors and tests unknown to the corpus are retained.
pub fn classify_flakes(input: &[String], outcomes: &QueryOutcomes) -> FlakeClassification {
    let mut out = FlakeClassification::default();
    let unique: BTreeSet<&String> = input.iter().collect();

    for test in unique {
        match outcomes.get(test) {
            Some(Ok(records)) => {
                if let Some(first) = records.first() {
                    out.records.insert(test.clone(), first.clone());
                }
                if records.iter().any(FlakeRecord::is_flaking) {
                    out.flaking.push(test.clone());
                } else {
                    out.retained.push(test.clone());
                }
            }
            Some(Err(_)) | None => {
                out.errors.push(test.clone());
                out.retained.push(test.clone());
            }
        }
    }
    out
}

/// Per-plugin inputs to the pipeline.
#[derive(Debug)]
pub struct FilterTarget<'a> {
    pub provider: &'a mut PluginSummary,
    /// Same plugin on the baseline run, if a baseline was loaded and ran it.
    pub baseline: Option<&'a PluginSummary>,
    pub suite: &'a SuiteDefinition,
}

/// Aggregate counters of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FilterReport {
    /// Plugins the pipeline ran on.
    pub plugins: Vec<String>,
    /// Whether a baseline run was loaded.
    pub baseline_loaded: bool,
    /// Whether stage B had baseline data for every plugin.
    pub baseline_processed: bool,
    /// Plugins whose stage B passed through although a baseline run was loaded.
    pub baseline_skipped: Vec<String>,
    /// Whether stage C queried a corpus.
    pub flake_enriched: bool,
    /// Release the corpus was queried for.
    pub release: Option<String>,
    /// Distinct tests queried.
    pub flake_queries: usize,
    /// Queries that failed; those tests were retained.
    pub flake_errors: usize,
    /// Tests excluded as flaking, across plugins.
    pub flaking_excluded: usize,
}

impl FilterReport {
    /// Whether stage B of `plugin` excluded against baseline data.
    pub fn baseline_applied(&self, plugin: &str) -> bool {
        self.baseline_loaded
            && self.plugins.iter().any(|p| p == plugin)
            && !self.baseline_skipped.iter().any(|p| p == plugin)
    }
}

/// Applies the three stages to every target plugin.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    pool: Option<FlakeQueryPool>,
    release: Option<String>,
}

impl FilterPipeline {
    /// Pipeline whose flake stage passes its input through.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Pipeline that enriches through `pool`.
    pub fn with_pool(pool: FlakeQueryPool) -> Self {
        Self {
            pool: Some(pool),
            release: None,
        }
    }

    /// Fix the corpus release instead of deriving it from the cluster version.
    pub fn with_release(mut self, release: Option<String>) -> Self {
        self.release = release;
        self
    }

    /// Run all stages.
    ///
    /// `baseline_available` tells whether a baseline run was loaded at all;
    /// `release_hint` is used when no release was configured.
    #[instrument(skip(self, targets), fields(plugins = targets.len()))]
    pub async fn run(
        &self,
        mut targets: Vec<FilterTarget<'_>>,
        baseline_available: bool,
        release_hint: Option<&str>,
    ) -> SummaryResult<FilterReport> {
        let mut report = FilterReport {
            baseline_loaded: baseline_available,
            baseline_processed: baseline_available,
            ..Default::default()
        };

        for target in targets.iter_mut() {
            let plugin = target.provider.name.clone();
            report.plugins.push(plugin.clone());

            let suite_out = stage_suite(&target.provider.failed_list, target.suite);
            let baseline_raw = if baseline_available {
                if target.baseline.is_none() {
                    warn!(plugin = %plugin, "Plugin missing from baseline run, baseline stage passes through");
                    report.baseline_skipped.push(plugin.clone());
                    report.baseline_processed = false;
                }
                target.baseline.map(|b| b.failed_list.as_slice())
            } else {
                None
            };
            let baseline_out = stage_baseline(&suite_out, baseline_raw);

            info!(
                plugin = %plugin,
                raw = target.provider.failed_list.len(),
                suite = suite_out.len(),
                baseline = baseline_out.len(),
                "Applied suite and baseline filters"
            );

            target.provider.set_filter(FilterStage::Suite, suite_out)?;
            target.provider.set_filter(FilterStage::Baseline, baseline_out)?;
        }

        let release = self.release.clone().or_else(|| release_hint.map(str::to_string));
        let outcomes = match (&self.pool, &release) {
            (Some(pool), Some(release)) => {
                let pending: Vec<String> = targets
                    .iter()
                    .flat_map(|t| t.provider.filter(FilterStage::Baseline).unwrap_or_default())
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                report.flake_enriched = true;
                report.release = Some(release.clone());
                report.flake_queries = pending.len();
                Some(pool.query_all(&pending, release).await)
            }
            (Some(_), None) => {
                warn!("No release known for flake corpus queries, flake stage passes through");
                None
            }
            (None, _) => {
                info!("Flake enrichment disabled, flake stage passes through");
                None
            }
        };

        for target in targets.iter_mut() {
            let input = target
                .provider
                .filter(FilterStage::Baseline)
                .unwrap_or_default()
                .to_vec();

            let retained = match &outcomes {
                Some(outcomes) => {
                    let classified = classify_flakes(&input, outcomes);
                    for (test, record) in classified.records {
                        target
                            .provider
                            .failed_items
                            .entry(test.clone())
                            .or_insert_with(|| FailedItem::new(test, 0))
                            .flake_info = Some(record);
                    }
                    report.flake_errors += classified.errors.len();
                    report.flaking_excluded += classified.flaking.len();
                    info!(
                        plugin = %target.provider.name,
                        retained = classified.retained.len(),
                        flaking = classified.flaking.len(),
                        errors = classified.errors.len(),
                        "Applied flake filter"
                    );
                    classified.retained
                }
                None => input,
            };

            target.provider.set_filter(FilterStage::Flake, retained)?;
        }

        Ok(report)
    }
}

/// Corpus release (`major.minor`) for a cluster version such as `4.14.3`.
pub fn release_from_version(version: &str) -> Option<String> {
    let mut parts = version.trim().split('.');
    let major = parts.next().filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))?;
    let minor = parts.next().filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))?;
    Some(format!("{major}.{minor}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use provcert_flake::{FlakeError, StaticCorpus};
    use std::sync::Arc;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn summary(name: &str, failed: &[&str]) -> PluginSummary {
        let mut s = PluginSummary::new(name);
        s.failed_list = names(failed);
        for (i, t) in failed.iter().enumerate() {
            s.failed_items
                .insert(t.to_string(), FailedItem::new(*t, i as u64 + 1));
        }
        s
    }

    #[test]
    fn test_stage_suite_intersection() {
        let suite = SuiteDefinition::new("s", ["A", "B", "C"]);
        assert_eq!(stage_suite(&names(&["A", "D"]), &suite), names(&["A"]));
        assert_eq!(stage_suite(&names(&["C", "A", "C"]), &suite), names(&["A", "C"]));
    }

    #[test]
    fn test_stage_baseline_exclusion() {
        let baseline = names(&["B"]);
        assert_eq!(
            stage_baseline(&names(&["A", "B"]), Some(baseline.as_slice())),
            names(&["A"])
        );
        assert_eq!(stage_baseline(&names(&["B", "A"]), None), names(&["A", "B"]));
    }

    #[test]
    fn test_classify_flakes() {
        let mut outcomes = QueryOutcomes::new();
        outcomes.insert("flaky".into(), Ok(vec![FlakeRecord::with_flakes("flaky", 3)]));
        outcomes.insert("stable".into(), Ok(vec![FlakeRecord::with_flakes("stable", 0)]));
        outcomes.insert("unknown".into(), Ok(vec![]));
        outcomes.insert("broken".into(), Err(FlakeError::DeadlineExceeded));

        let out = classify_flakes(&names(&["stable", "flaky", "unknown", "broken"]), &outcomes);
        assert_eq!(out.retained, names(&["broken", "stable", "unknown"]));
        assert_eq!(out.flaking, names(&["flaky"]));
        assert_eq!(out.errors, names(&["broken"]));
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records["stable"].current_flakes, 0);
    }

    #[test]
    fn test_release_from_version() {
        assert_eq!(release_from_version("4.14.3"), Some("4.14".into()));
        assert_eq!(release_from_version("4.15"), Some("4.15".into()));
        assert_eq!(release_from_version("4.16.0-rc.1"), Some("4.16".into()));
        assert_eq!(release_from_version(""), None);
        assert_eq!(release_from_version("latest"), None);
    }

    #[tokio::test]
    async fn test_pipeline_offline_passes_flake_stage_through() {
        let suite = SuiteDefinition::new("s", ["A", "B", "C"]);
        let mut provider = summary("p", &["A", "B", "D"]);
        let baseline = summary("p", &["B"]);

        let report = FilterPipeline::offline()
            .run(
                vec![FilterTarget {
                    provider: &mut provider,
                    baseline: Some(&baseline),
                    suite: &suite,
                }],
                true,
                Some("4.14"),
            )
            .await
            .unwrap();

        assert!(report.baseline_processed);
        assert!(report.baseline_applied("p"));
        assert!(!report.flake_enriched);
        assert_eq!(provider.filter(FilterStage::Suite).unwrap(), ["A", "B"]);
        assert_eq!(provider.filter(FilterStage::Baseline).unwrap(), ["A"]);
        assert_eq!(provider.filter(FilterStage::Flake).unwrap(), ["A"]);
    }

    #[tokio::test]
    async fn test_pipeline_records_plugin_missing_from_baseline() {
        let suite = SuiteDefinition::new("s", ["A", "B"]);
        let mut provider = summary("p", &["A", "B"]);
        let mut other = summary("q", &["A"]);
        let other_baseline = summary("q", &["A"]);

        let report = FilterPipeline::offline()
            .run(
                vec![
                    FilterTarget {
                        provider: &mut provider,
                        baseline: None,
                        suite: &suite,
                    },
                    FilterTarget {
                        provider: &mut other,
                        baseline: Some(&other_baseline),
                        suite: &suite,
                    },
                ],
                true,
                None,
            )
            .await
            .unwrap();

        assert!(report.baseline_loaded);
        assert!(!report.baseline_processed);
        assert_eq!(report.baseline_skipped, names(&["p"]));
        assert!(!report.baseline_applied("p"));
        assert!(report.baseline_applied("q"));
        assert!(!report.baseline_applied("absent"));
        assert_eq!(provider.filter(FilterStage::Baseline).unwrap(), ["A", "B"]);
        assert!(other.filter(FilterStage::Baseline).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_attaches_flake_records() {
        let corpus = StaticCorpus::new()
            .with_record(FlakeRecord::with_flakes("A", 3))
            .with_record(FlakeRecord::with_flakes("C", 0));
        let pool = FlakeQueryPool::new(Arc::new(corpus));
        let suite = SuiteDefinition::new("s", ["A", "B", "C"]);
        let mut provider = summary("p", &["A", "B", "C"]);

        let report = FilterPipeline::with_pool(pool)
            .with_release(Some("4.14".into()))
            .run(
                vec![FilterTarget {
                    provider: &mut provider,
                    baseline: None,
                    suite: &suite,
                }],
                false,
                None,
            )
            .await
            .unwrap();

        assert!(!report.baseline_processed);
        assert_eq!(report.release.as_deref(), Some("4.14"));
        assert_eq!(report.flake_queries, 3);
        assert_eq!(report.flaking_excluded, 1);
        assert_eq!(provider.filter(FilterStage::Flake).unwrap(), ["B", "C"]);
        assert_eq!(
            provider.failed_items["A"].flake_info.as_ref().unwrap().current_flakes,
            3
        );
        assert!(provider.failed_items["B"].flake_info.is_none());
        assert!(provider.failed_items["C"].flake_info.is_some());
    }

    #[tokio::test]
    async fn test_pipeline_without_release_passes_through() {
        let corpus = StaticCorpus::new().with_record(FlakeRecord::with_flakes("A", 3));
        let pool = FlakeQueryPool::new(Arc::new(corpus));
        let suite = SuiteDefinition::new("s", ["A"]);
        let mut provider = summary("p", &["A"]);

        let report = FilterPipeline::with_pool(pool)
            .run(
                vec![FilterTarget {
                    provider: &mut provider,
                    baseline: None,
                    suite: &suite,
                }],
                false,
                None,
            )
            .await
            .unwrap();

        assert!(!report.flake_enriched);
        assert_eq!(provider.filter(FilterStage::Flake).unwrap(), ["A"]);
    }

    #[tokio::test]
    async fn test_pipeline_second_run_is_rejected() {
        let suite = SuiteDefinition::new("s", ["A"]);
        let mut provider = summary("p", &["A"]);
        let pipeline = FilterPipeline::offline();

        pipeline
            .run(
                vec![FilterTarget {
                    provider: &mut provider,
                    baseline: None,
                    suite: &suite,
                }],
                false,
                None,
            )
            .await
            .unwrap();
        let err = pipeline
            .run(
                vec![FilterTarget {
                    provider: &mut provider,
                    baseline: None,
                    suite: &suite,
                }],
                false,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::SummaryError::FilterAlreadyApplied { .. }
        ));
    }
}
