//! Fail-closed access to the consolidated summary.
//!
//! Each lookup returns the reason the data is unavailable instead of a
//! default value, and rules report that reason as their failure message.

use provcert_summary::{ConsolidatedSummary, ResultSummary};
use provcert_types::cluster::COUNTER_TOTAL;
use provcert_types::{
    ClusterHealth, ClusterVersionStatus, EtcdSlowRequests, InfrastructureStatus, MustGatherInfo,
    PluginSummary,
};

/// Outcome of reading one value out of the summary.
pub type Lookup<T> = Result<T, String>;

pub fn provider(summary: &ConsolidatedSummary) -> Lookup<&ResultSummary> {
    summary
        .provider()
        .ok_or_else(|| "provider results are not loaded".to_string())
}

pub fn plugin<'a>(summary: &'a ConsolidatedSummary, name: &str) -> Lookup<&'a PluginSummary> {
    provider(summary)?
        .plugin(name)
        .ok_or_else(|| format!("processed plugin data not found: {name}"))
}

pub fn infrastructure(summary: &ConsolidatedSummary) -> Lookup<&InfrastructureStatus> {
    provider(summary)?
        .infra
        .as_ref()
        .and_then(|infra| infra.infrastructure.as_ref())
        .ok_or_else(|| "unable to read the infrastructure object".to_string())
}

pub fn cluster_version(summary: &ConsolidatedSummary) -> Lookup<&ClusterVersionStatus> {
    provider(summary)?
        .infra
        .as_ref()
        .and_then(|infra| infra.cluster_version.as_ref())
        .ok_or_else(|| "unable to read provider version".to_string())
}

pub fn cluster_health(summary: &ConsolidatedSummary) -> Lookup<&ClusterHealth> {
    provider(summary)?
        .infra
        .as_ref()
        .and_then(|infra| infra.health.as_ref())
        .ok_or_else(|| "unable to read cluster health".to_string())
}

pub fn must_gather(summary: &ConsolidatedSummary) -> Lookup<&MustGatherInfo> {
    provider(summary)?
        .statistics
        .must_gather
        .as_ref()
        .ok_or_else(|| "must-gather information is not available".to_string())
}

/// `total` of the suite log error counters.
pub fn suite_error_total(summary: &ConsolidatedSummary) -> Lookup<u64> {
    let counters = provider(summary)?
        .statistics
        .error_counters
        .as_ref()
        .ok_or_else(|| "suite error counters are not available".to_string())?;
    counters
        .get(COUNTER_TOTAL)
        .copied()
        .ok_or_else(|| "Unable to load Total Counter".to_string())
}

/// `total` of the must-gather workload error counters.
pub fn workload_error_total(summary: &ConsolidatedSummary) -> Lookup<u64> {
    must_gather(summary)?
        .error_counters
        .get(COUNTER_TOTAL)
        .copied()
        .ok_or_else(|| "Unable to load Total Counter".to_string())
}

pub fn etcd_slow_requests(summary: &ConsolidatedSummary) -> Lookup<&EtcdSlowRequests> {
    must_gather(summary)?
        .etcd_slow_requests
        .as_ref()
        .ok_or_else(|| "unable to read statistics from parsed etcd logs".to_string())
}
