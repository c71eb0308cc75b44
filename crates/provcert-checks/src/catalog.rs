//! The default acceptance catalog.

use provcert_summary::ConsolidatedSummary;
use provcert_types::names::{
    PLUGIN_ARTIFACTS_COLLECTOR, PLUGIN_KUBE_CONFORMANCE, PLUGIN_OPENSHIFT_CONFORMANCE,
    PLUGIN_UPGRADE,
};

use crate::check::{Check, RuleMeta};
use crate::lookup::{self, Lookup};
use crate::rules::{
    AllowedValueRule, EmptyListRule, LatencyRule, MinimumRule, Numerator, StatusRule,
    ThresholdRule, ZeroSentinelRule,
};

/// Published rule documentation.
pub const DEFAULT_DOCS_BASE_URL: &str =
    "https://redhat-openshift-ecosystem.github.io/provider-certification-tool";

/// Platforms accepted for certification.
pub const ALLOWED_PLATFORM_TYPES: &[&str] = &["None", "External", "AWS", "Azure"];

const HIGHLY_AVAILABLE: &str = "HighlyAvailable";
const CONDITION_TRUE: &str = "True";
const CONDITION_FALSE: &str = "False";
const STATUS_PASSED: &str = "passed";

/// Ordered, immutable collection of rules.
#[derive(Debug)]
pub struct CheckCatalog {
    checks: Vec<Box<dyn Check>>,
}

impl CheckCatalog {
    /// Catalog with caller-provided rules, evaluated in the given order.
    pub fn from_checks(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// The certification rules, with documentation links under `docs_base_url`.
    pub fn default_catalog(docs_base_url: &str) -> Self {
        let doc = |meta: RuleMeta| meta.documented_at(docs_base_url);

        let checks: Vec<Box<dyn Check>> = vec![
            // Infrastructure and cluster version
            Box::new(AllowedValueRule::new(
                doc(RuleMeta::new("Platform Type should be None or External")),
                ALLOWED_PLATFORM_TYPES,
                platform_type,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new("Cluster Version Operator must be Available")),
                CONDITION_TRUE,
                cv_available,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new("Cluster condition Failing must be False")),
                CONDITION_FALSE,
                cv_failing,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new("Cluster upgrade must not be Progressing")),
                CONDITION_FALSE,
                cv_progressing,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new("Cluster ReleaseAccepted must be True")),
                CONDITION_TRUE,
                cv_release_accepted,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new(
                    "Infrastructure status must have Topology=HighlyAvailable",
                )),
                HIGHLY_AVAILABLE,
                topology,
            )),
            Box::new(AllowedValueRule::equals(
                doc(RuleMeta::new(
                    "Infrastructure status must have ControlPlaneTopology=HighlyAvailable",
                )),
                HIGHLY_AVAILABLE,
                control_plane_topology,
            )),
            // Cluster health
            Box::new(MinimumRule::new(
                doc(RuleMeta::with_id("OPCT-008", "All nodes must be healthy")),
                "100",
                100.0,
                node_health,
            )),
            Box::new(MinimumRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-009",
                    "Pods Healthy must report higher than 98%",
                )),
                ">=98%",
                98.0,
                pod_health,
            )),
            // Plugins
            Box::new(EmptyListRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-001",
                    format!(
                        "Plugin Conformance Kubernetes [{PLUGIN_KUBE_CONFORMANCE}] must pass (after filters)"
                    ),
                )),
                PLUGIN_KUBE_CONFORMANCE,
            )),
            Box::new(ThresholdRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-004",
                    format!(
                        "OpenShift Conformance [{PLUGIN_OPENSHIFT_CONFORMANCE}]: Failed tests must report less than 1.5%"
                    ),
                )),
                PLUGIN_OPENSHIFT_CONFORMANCE,
                Numerator::Failed,
                1.5,
            )),
            Box::new(ThresholdRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-005",
                    format!(
                        "OpenShift Conformance [{PLUGIN_OPENSHIFT_CONFORMANCE}]: Priority must report less than 0.5%"
                    ),
                )),
                PLUGIN_OPENSHIFT_CONFORMANCE,
                Numerator::FinalFailures,
                0.5,
            )),
            // Log error counters
            Box::new(ZeroSentinelRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-006",
                    "Suite Errors must report a lower number of log errors",
                )),
                150,
                lookup::suite_error_total,
            )),
            Box::new(ZeroSentinelRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-007",
                    "Workloads must report a lower number of errors in the logs",
                )),
                30_000,
                lookup::workload_error_total,
            )),
            Box::new(
                StatusRule::new(
                    doc(RuleMeta::with_id(
                        "OPCT-003",
                        format!("Plugin Collector [{PLUGIN_ARTIFACTS_COLLECTOR}] must pass"),
                    )),
                    PLUGIN_ARTIFACTS_COLLECTOR,
                    STATUS_PASSED,
                )
                .with_runtime_guard(),
            ),
            Box::new(StatusRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-002",
                    format!("Plugin Conformance Upgrade [{PLUGIN_UPGRADE}] must pass"),
                )),
                PLUGIN_UPGRADE,
                STATUS_PASSED,
            )),
            // etcd
            Box::new(LatencyRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-010",
                    "etcd logs: slow requests: average should be under 500ms",
                )),
                500.0,
                etcd_mean,
            )),
            Box::new(LatencyRule::new(
                doc(RuleMeta::with_id(
                    "OPCT-011",
                    "etcd logs: slow requests: maximum should be under 1000ms",
                )),
                1000.0,
                etcd_max,
            )),
        ];

        Self { checks }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    /// Look up a rule by its stable identifier.
    pub fn get(&self, id: &str) -> Option<&dyn Check> {
        self.iter().find(|c| c.id() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckCatalog {
    fn default() -> Self {
        Self::default_catalog(DEFAULT_DOCS_BASE_URL)
    }
}

// Extractors

fn platform_type(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::infrastructure(summary)?.platform_type.clone())
}

fn topology(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::infrastructure(summary)?.topology.clone())
}

fn control_plane_topology(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::infrastructure(summary)?.control_plane_topology.clone())
}

fn cv_available(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::cluster_version(summary)?.cond_available.clone())
}

fn cv_failing(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::cluster_version(summary)?.cond_failing.clone())
}

fn cv_progressing(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::cluster_version(summary)?.cond_progressing.clone())
}

fn cv_release_accepted(summary: &ConsolidatedSummary) -> Lookup<String> {
    Ok(lookup::cluster_version(summary)?.cond_release_accepted.clone())
}

fn node_health(summary: &ConsolidatedSummary) -> Lookup<f64> {
    Ok(lookup::cluster_health(summary)?.node_health_perc)
}

fn pod_health(summary: &ConsolidatedSummary) -> Lookup<f64> {
    Ok(lookup::cluster_health(summary)?.pod_health_perc)
}

fn etcd_mean(summary: &ConsolidatedSummary) -> Lookup<f64> {
    let stats = lookup::etcd_slow_requests(summary)?;
    stats
        .mean_ms()
        .ok_or_else(|| format!("unable to parse slow request mean: {:?}", stats.mean))
}

fn etcd_max(summary: &ConsolidatedSummary) -> Lookup<f64> {
    let stats = lookup::etcd_slow_requests(summary)?;
    stats
        .max_ms()
        .ok_or_else(|| format!("unable to parse slow request max: {:?}", stats.max))
}
