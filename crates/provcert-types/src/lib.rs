//! # Provcert Types
//!
//! Core data model shared by every provcert crate.
//!
//! A certification run produces one hierarchical result tree per plugin
//! ([`ResultNode`]). Those trees are reduced to [`PluginSummary`] values, then
//! narrowed by the filter pipeline into the list of failures that are
//! actually attributable to the provider under test. Acceptance rules report
//! their verdicts as [`CheckResult`] values.
//!
//! ## Modules
//!
//! - [`result`]: raw result tree and status tokens
//! - [`plugin`]: per-plugin statistics and filter-stage outputs
//! - [`flake`]: records returned by the external flake corpus
//! - [`suite`]: authoritative test suites
//! - [`cluster`]: infrastructure snapshot and already-extracted statistics
//! - [`check`]: acceptance rule outcomes

#![deny(unsafe_code)]

pub mod check;
pub mod cluster;
pub mod error;
pub mod flake;
pub mod plugin;
pub mod result;
pub mod suite;

pub use check::{CheckOutcome, CheckResult};
pub use cluster::{
    ClusterHealth, ClusterVersionStatus, EtcdSlowRequests, ExtractedStatistics, InfraSnapshot,
    InfrastructureStatus, MustGatherInfo, OperatorConditionCounts,
};
pub use error::{ModelError, ModelResult};
pub use flake::FlakeRecord;
pub use plugin::{FailedItem, FilterOutputs, FilterStage, PluginSummary, StatusCounts};
pub use result::{ResultNode, TestStatus};
pub use suite::SuiteDefinition;

/// Well-known plugin and suite identifiers of a certification run.
pub mod names {
    /// Cluster upgrade plugin.
    pub const PLUGIN_UPGRADE: &str = "05-openshift-cluster-upgrade";
    /// Kubernetes conformance plugin.
    pub const PLUGIN_KUBE_CONFORMANCE: &str = "10-openshift-kube-conformance";
    /// OpenShift validated conformance plugin.
    pub const PLUGIN_OPENSHIFT_CONFORMANCE: &str = "20-openshift-conformance-validated";
    /// Artifacts collector plugin.
    pub const PLUGIN_ARTIFACTS_COLLECTOR: &str = "99-openshift-artifacts-collector";

    /// Authoritative suite for the Kubernetes conformance plugin.
    pub const SUITE_KUBERNETES_CONFORMANCE: &str = "kubernetes/conformance";
    /// Authoritative suite for the OpenShift conformance plugin.
    pub const SUITE_OPENSHIFT_CONFORMANCE: &str = "openshift/conformance";
}
