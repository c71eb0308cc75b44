//! Consolidation of a provider run, an optional baseline run and the
//! authoritative suites into one filtered summary.

use std::collections::BTreeMap;
use std::fmt;

use provcert_types::{ExtractedStatistics, InfraSnapshot, PluginSummary, SuiteDefinition};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::archive::ArchiveReader;
use crate::error::{SummaryError, SummaryResult};
use crate::filter::{release_from_version, FilterPipeline, FilterReport, FilterTarget};
use crate::flatten::build_plugin_summary;
use crate::suite::SuiteSource;

/// Lifecycle of a [`ConsolidatedSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryState {
    Empty,
    ProviderPopulated,
    BaselinePopulated,
    SuitesLoaded,
    Filtered,
}

impl SummaryState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ProviderPopulated => "provider_populated",
            Self::BaselinePopulated => "baseline_populated",
            Self::SuitesLoaded => "suites_loaded",
            Self::Filtered => "filtered",
        }
    }
}

impl fmt::Display for SummaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything read from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Where the run was read from.
    pub source: String,
    /// Plugin summaries keyed by plugin identifier.
    pub plugins: BTreeMap<String, PluginSummary>,
    pub infra: Option<InfraSnapshot>,
    pub statistics: ExtractedStatistics,
    /// Plugins that could not be processed, with the reason.
    pub plugin_errors: BTreeMap<String, String>,
}

impl ResultSummary {
    /// Read and flatten every plugin of a run.
    ///
    /// An unreadable plugin list or an empty one is fatal. A plugin that
    /// fails on its own is recorded in `plugin_errors` and skipped.
    #[instrument(skip(reader), fields(source = %reader.source()))]
    pub fn populate(reader: &dyn ArchiveReader) -> SummaryResult<Self> {
        let source = reader.source();
        let plugin_names = reader.plugins()?;
        if plugin_names.is_empty() {
            return Err(SummaryError::NoPlugins(source));
        }

        let mut summary = ResultSummary {
            source,
            ..Default::default()
        };

        for name in plugin_names {
            match reader.plugin_result(&name) {
                Ok(root) => {
                    let plugin = build_plugin_summary(&root, &name);
                    info!(
                        plugin = %name,
                        status = %plugin.status,
                        total = plugin.total,
                        passed = plugin.passed,
                        failed = plugin.failed,
                        "Processed plugin"
                    );
                    summary.plugins.insert(name, plugin);
                }
                Err(e) => {
                    error!(plugin = %name, error = %e, "Failed to process plugin");
                    summary.plugin_errors.insert(name, e.to_string());
                }
            }
        }

        summary.infra = match reader.infra() {
            Ok(infra) => infra,
            Err(e) => {
                warn!(error = %e, "Failed to read cluster objects");
                None
            }
        };
        summary.statistics = match reader.statistics() {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to read extracted statistics");
                ExtractedStatistics::default()
            }
        };

        Ok(summary)
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginSummary> {
        self.plugins.get(name)
    }

    /// Desired cluster version, when the cluster objects were read.
    pub fn cluster_version(&self) -> Option<&str> {
        self.infra
            .as_ref()?
            .cluster_version
            .as_ref()
            .map(|cv| cv.desired_version.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// Inputs for [`ConsolidatedSummary::process`].
pub struct ProcessInputs<'a> {
    pub provider: &'a dyn ArchiveReader,
    pub baseline: Option<&'a dyn ArchiveReader>,
    pub suites: Vec<SuiteSource>,
}

/// Provider and baseline runs consolidated against the suites.
///
/// Single use: each lifecycle step runs once and in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedSummary {
    state: SummaryState,
    provider: Option<ResultSummary>,
    baseline: Option<ResultSummary>,
    /// Suite definitions keyed by plugin identifier.
    suites: BTreeMap<String, SuiteDefinition>,
    baseline_processed: bool,
    filter_report: Option<FilterReport>,
}

impl Default for ConsolidatedSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolidatedSummary {
    pub fn new() -> Self {
        Self {
            state: SummaryState::Empty,
            provider: None,
            baseline: None,
            suites: BTreeMap::new(),
            baseline_processed: false,
            filter_report: None,
        }
    }

    pub fn state(&self) -> SummaryState {
        self.state
    }

    fn ensure(&self, allowed: &[SummaryState], to: SummaryState) -> SummaryResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SummaryError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    /// Read the provider run.
    pub fn populate_provider(&mut self, reader: &dyn ArchiveReader) -> SummaryResult<()> {
        self.ensure(&[SummaryState::Empty], SummaryState::ProviderPopulated)?;
        self.provider = Some(ResultSummary::populate(reader)?);
        self.state = SummaryState::ProviderPopulated;
        Ok(())
    }

    /// Read the baseline run.
    pub fn populate_baseline(&mut self, reader: &dyn ArchiveReader) -> SummaryResult<()> {
        self.ensure(&[SummaryState::ProviderPopulated], SummaryState::BaselinePopulated)?;
        self.baseline = Some(ResultSummary::populate(reader)?);
        self.state = SummaryState::BaselinePopulated;
        Ok(())
    }

    /// Register suite definitions keyed by plugin identifier.
    pub fn load_suites(&mut self, suites: BTreeMap<String, SuiteDefinition>) -> SummaryResult<()> {
        self.ensure(
            &[SummaryState::ProviderPopulated, SummaryState::BaselinePopulated],
            SummaryState::SuitesLoaded,
        )?;
        self.suites = suites;
        self.state = SummaryState::SuitesLoaded;
        Ok(())
    }

    /// Read suite files and register them.
    pub fn load_suite_files(&mut self, sources: &[SuiteSource]) -> SummaryResult<()> {
        self.ensure(
            &[SummaryState::ProviderPopulated, SummaryState::BaselinePopulated],
            SummaryState::SuitesLoaded,
        )?;
        let mut suites = BTreeMap::new();
        for source in sources {
            suites.insert(source.plugin.clone(), source.load()?);
        }
        self.load_suites(suites)
    }

    /// Run the filter pipeline over every plugin that has a suite.
    pub async fn apply_filters(&mut self, pipeline: &FilterPipeline) -> SummaryResult<()> {
        self.ensure(&[SummaryState::SuitesLoaded], SummaryState::Filtered)?;

        let baseline_available = self.baseline.is_some();
        let Some(provider) = self.provider.as_mut() else {
            return Err(SummaryError::InvalidTransition {
                from: self.state,
                to: SummaryState::Filtered,
            });
        };
        let release_hint = provider.cluster_version().and_then(release_from_version);

        for plugin in self.suites.keys() {
            if !provider.plugins.contains_key(plugin) {
                warn!(plugin = %plugin, "Suite registered for a plugin missing from the provider run");
            }
        }

        let baseline = self.baseline.as_ref();
        let suites = &self.suites;
        let targets: Vec<FilterTarget<'_>> = provider
            .plugins
            .iter_mut()
            .filter_map(|(id, summary)| {
                suites.get(id).map(|suite| FilterTarget {
                    provider: summary,
                    baseline: baseline.and_then(|b| b.plugins.get(id)),
                    suite,
                })
            })
            .collect();

        let report = pipeline
            .run(targets, baseline_available, release_hint.as_deref())
            .await?;

        if !report.baseline_loaded {
            warn!("No baseline run loaded, baseline filter was skipped");
        } else if !report.baseline_skipped.is_empty() {
            warn!(plugins = ?report.baseline_skipped, "Baseline filter skipped for plugins missing from the baseline run");
        }
        self.baseline_processed = report.baseline_processed;
        self.filter_report = Some(report);
        self.state = SummaryState::Filtered;
        Ok(())
    }

    /// Drive the whole lifecycle.
    #[instrument(skip(self, inputs, pipeline))]
    pub async fn process(
        &mut self,
        inputs: ProcessInputs<'_>,
        pipeline: &FilterPipeline,
    ) -> SummaryResult<()> {
        self.populate_provider(inputs.provider)?;
        if let Some(baseline) = inputs.baseline {
            self.populate_baseline(baseline)?;
        }
        self.load_suite_files(&inputs.suites)?;
        self.apply_filters(pipeline).await
    }

    pub fn provider(&self) -> Option<&ResultSummary> {
        self.provider.as_ref()
    }

    pub fn baseline(&self) -> Option<&ResultSummary> {
        self.baseline.as_ref()
    }

    /// Provider summary of one plugin.
    pub fn provider_plugin(&self, name: &str) -> Option<&PluginSummary> {
        self.provider.as_ref()?.plugin(name)
    }

    /// Baseline summary of one plugin.
    pub fn baseline_plugin(&self, name: &str) -> Option<&PluginSummary> {
        self.baseline.as_ref()?.plugin(name)
    }

    pub fn suites(&self) -> &BTreeMap<String, SuiteDefinition> {
        &self.suites
    }

    pub fn suite(&self, plugin: &str) -> Option<&SuiteDefinition> {
        self.suites.get(plugin)
    }

    /// Whether the baseline stage had baseline data to exclude against.
    /// True only when every filtered plugin was excluded against the baseline.
    pub fn baseline_processed(&self) -> bool {
        self.baseline_processed
    }

    /// Whether the baseline stage of `plugin` used baseline data.
    pub fn baseline_processed_for(&self, plugin: &str) -> bool {
        self.filter_report
            .as_ref()
            .is_some_and(|r| r.baseline_applied(plugin))
    }

    pub fn filter_report(&self) -> Option<&FilterReport> {
        self.filter_report.as_ref()
    }

    pub fn is_filtered(&self) -> bool {
        self.state == SummaryState::Filtered
    }
}
