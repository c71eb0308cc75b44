//! Loading of authoritative test suites.

use std::fs;
use std::path::{Path, PathBuf};

use provcert_types::names::{
    PLUGIN_KUBE_CONFORMANCE, PLUGIN_OPENSHIFT_CONFORMANCE, SUITE_KUBERNETES_CONFORMANCE,
    SUITE_OPENSHIFT_CONFORMANCE,
};
use provcert_types::SuiteDefinition;
use tracing::debug;

use crate::error::{SummaryError, SummaryResult};

/// A suite file bound to the plugin it filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSource {
    /// Plugin identifier the suite applies to.
    pub plugin: String,
    /// Suite name.
    pub suite: String,
    /// Newline-delimited list of test names.
    pub path: PathBuf,
}

impl SuiteSource {
    pub fn new(plugin: impl Into<String>, suite: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            plugin: plugin.into(),
            suite: suite.into(),
            path: path.into(),
        }
    }

    /// Kubernetes conformance suite for the kube conformance plugin.
    pub fn kubernetes_conformance(path: impl Into<PathBuf>) -> Self {
        Self::new(PLUGIN_KUBE_CONFORMANCE, SUITE_KUBERNETES_CONFORMANCE, path)
    }

    /// OpenShift conformance suite for the validated conformance plugin.
    pub fn openshift_conformance(path: impl Into<PathBuf>) -> Self {
        Self::new(PLUGIN_OPENSHIFT_CONFORMANCE, SUITE_OPENSHIFT_CONFORMANCE, path)
    }

    pub fn load(&self) -> SummaryResult<SuiteDefinition> {
        load_suite_file(&self.suite, &self.path)
    }
}

/// Parse newline-delimited test names. Lines are trimmed and blank lines dropped.
pub fn parse_suite(name: &str, content: &str) -> SuiteDefinition {
    SuiteDefinition::new(
        name,
        content.lines().map(str::trim).filter(|line| !line.is_empty()),
    )
}

/// Read a suite file.
pub fn load_suite_file(name: &str, path: &Path) -> SummaryResult<SuiteDefinition> {
    let content = fs::read_to_string(path).map_err(|source| SummaryError::SuiteFile {
        path: path.display().to_string(),
        source,
    })?;
    let suite = parse_suite(name, &content);
    debug!(suite = %name, tests = suite.len(), "Loaded suite");
    Ok(suite)
}
