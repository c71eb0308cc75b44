//! Cluster snapshot and statistics extracted out-of-band from a run.
//!
//! These values are produced by collaborators (CR dumps, log parsers) and
//! consumed by acceptance rules as-is. Nothing here parses raw logs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counter key holding the aggregate of all error counters.
pub const COUNTER_TOTAL: &str = "total";

/// Status block of the cluster `Infrastructure` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureStatus {
    pub platform_type: String,
    pub api_server_url: String,
    pub api_server_internal_url: String,
    pub infrastructure_name: String,
    pub topology: String,
    pub control_plane_topology: String,
}

/// Desired version and condition statuses of the cluster version operator.
///
/// Condition values hold the raw `"True"` / `"False"` / `"Unknown"` token,
/// or an empty string when the condition is not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterVersionStatus {
    pub desired_version: String,
    pub cond_available: String,
    pub cond_failing: String,
    pub cond_progressing: String,
    pub cond_progressing_message: String,
    pub cond_release_accepted: String,
}

/// Number of cluster operators reporting each condition as `True`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConditionCounts {
    pub available: u64,
    pub progressing: u64,
    pub degraded: u64,
}

/// Node and pod health percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterHealth {
    pub node_health_perc: f64,
    pub pod_health_perc: f64,
}

/// Everything known about the cluster the run executed on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraSnapshot {
    pub infrastructure: Option<InfrastructureStatus>,
    pub cluster_version: Option<ClusterVersionStatus>,
    pub operators: OperatorConditionCounts,
    pub health: Option<ClusterHealth>,
}

/// Slow-request latency statistics from etcd logs, as rendered strings
/// like `"412.5 ms"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtcdSlowRequests {
    pub mean: String,
    pub max: String,
}

impl EtcdSlowRequests {
    /// Mean latency in milliseconds, if it parses.
    pub fn mean_ms(&self) -> Option<f64> {
        parse_leading_number(&self.mean)
    }

    /// Maximum latency in milliseconds, if it parses.
    pub fn max_ms(&self) -> Option<f64> {
        parse_leading_number(&self.max)
    }
}

fn parse_leading_number(value: &str) -> Option<f64> {
    value.split_whitespace().next()?.parse().ok()
}

/// Statistics from the must-gather bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MustGatherInfo {
    pub error_counters: BTreeMap<String, u64>,
    pub etcd_slow_requests: Option<EtcdSlowRequests>,
}

/// Statistics already extracted from logs by an external parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedStatistics {
    /// Error counters from the conformance suite logs.
    pub error_counters: Option<BTreeMap<String, u64>>,
    pub must_gather: Option<MustGatherInfo>,
}
