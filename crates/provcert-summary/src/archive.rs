//! Access to the contents of a certification run archive.
//!
//! Decoding packed archives is out of scope; [`DirectoryArchiveReader`]
//! reads a run that has already been extracted to disk, and
//! [`MemoryArchive`] serves runs assembled in memory.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use provcert_types::{
    ClusterHealth, ClusterVersionStatus, ExtractedStatistics, InfraSnapshot,
    InfrastructureStatus, MustGatherInfo, OperatorConditionCounts, ResultNode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{SummaryError, SummaryResult};

/// Run metadata listing the executed plugins.
pub const RUN_META_PATH: &str = "meta/run.json";
/// Cluster health summary.
pub const CLUSTER_HEALTH_PATH: &str = "meta/cluster-health.json";
/// Conformance suite error counters.
pub const ERROR_COUNTERS_PATH: &str = "meta/error-counters.json";
/// Must-gather statistics.
pub const MUST_GATHER_PATH: &str = "meta/must-gather.json";
/// `Infrastructure` objects dump.
pub const INFRASTRUCTURES_PATH: &str =
    "resources/cluster/config.openshift.io_v1_infrastructures.json";
/// `ClusterVersion` objects dump.
pub const CLUSTER_VERSIONS_PATH: &str =
    "resources/cluster/config.openshift.io_v1_clusterversions.json";
/// `ClusterOperator` objects dump.
pub const CLUSTER_OPERATORS_PATH: &str =
    "resources/cluster/config.openshift.io_v1_clusteroperators.json";

const CONDITION_TRUE: &str = "True";

/// Read access to one run.
pub trait ArchiveReader: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn source(&self) -> String;

    /// Names of the plugins that ran.
    fn plugins(&self) -> SummaryResult<Vec<String>>;

    /// Result tree of one plugin.
    fn plugin_result(&self, name: &str) -> SummaryResult<ResultNode>;

    /// Cluster snapshot, `None` when the run carries no cluster objects.
    fn infra(&self) -> SummaryResult<Option<InfraSnapshot>>;

    /// Statistics extracted from logs by an external parser.
    fn statistics(&self) -> SummaryResult<ExtractedStatistics>;
}

/// Reader over an extracted run directory.
#[derive(Debug, Clone)]
pub struct DirectoryArchiveReader {
    root: PathBuf,
}

impl DirectoryArchiveReader {
    /// Open an extracted run. Packed archive files are rejected.
    pub fn open(path: impl AsRef<Path>) -> SummaryResult<Self> {
        let root = path.as_ref().to_path_buf();
        let meta = fs::metadata(&root).map_err(|e| SummaryError::UnreadableArchive {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        if meta.is_file() {
            return Err(SummaryError::UnsupportedArchive(root.display().to_string()));
        }
        if !meta.is_dir() {
            return Err(SummaryError::UnreadableArchive {
                path: root.display().to_string(),
                reason: "not a directory".into(),
            });
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn plugin_result_candidates(&self, name: &str) -> [PathBuf; 2] {
        let plugin_dir = self.root.join("plugins").join(name);
        [
            plugin_dir.join("results").join("global").join("result.yaml"),
            plugin_dir.join("sonobuoy_results.yaml"),
        ]
    }

    /// Decode an optional JSON file relative to the root.
    fn read_json<T: DeserializeOwned>(&self, relative: &str) -> SummaryResult<Option<T>> {
        let path = self.root.join(relative);
        if !path.is_file() {
            debug!(path = %path.display(), "Optional archive file absent");
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Like `read_json`, but a file that cannot be decoded is logged and
    /// treated as absent so the other files of a snapshot still load.
    fn read_json_lenient<T: DeserializeOwned>(&self, relative: &str) -> Option<T> {
        match self.read_json(relative) {
            Ok(value) => value,
            Err(e) => {
                warn!(file = relative, error = %e, "Skipping unreadable cluster object dump");
                None
            }
        }
    }

    fn list_plugin_dirs(&self) -> SummaryResult<Vec<String>> {
        let dir = self.root.join("plugins");
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
struct RunMeta {
    #[serde(default)]
    plugins: Vec<String>,
}

impl ArchiveReader for DirectoryArchiveReader {
    fn source(&self) -> String {
        self.root.display().to_string()
    }

    fn plugins(&self) -> SummaryResult<Vec<String>> {
        match self.read_json::<RunMeta>(RUN_META_PATH)? {
            Some(meta) => Ok(meta.plugins),
            None => self.list_plugin_dirs(),
        }
    }

    fn plugin_result(&self, name: &str) -> SummaryResult<ResultNode> {
        let path = self
            .plugin_result_candidates(name)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| SummaryError::PluginNotFound(name.to_string()))?;

        debug!(plugin = %name, path = %path.display(), "Reading plugin result tree");
        let content = fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn infra(&self) -> SummaryResult<Option<InfraSnapshot>> {
        let infrastructures =
            self.read_json_lenient::<CrList<InfrastructureCr>>(INFRASTRUCTURES_PATH);
        let versions = self.read_json_lenient::<CrList<ClusterVersionCr>>(CLUSTER_VERSIONS_PATH);
        let operators = self.read_json_lenient::<CrList<ClusterOperatorCr>>(CLUSTER_OPERATORS_PATH);
        let health = self.read_json_lenient::<HealthSummary>(CLUSTER_HEALTH_PATH);

        if infrastructures.is_none() && versions.is_none() && operators.is_none() && health.is_none()
        {
            return Ok(None);
        }

        Ok(Some(InfraSnapshot {
            infrastructure: infrastructures.and_then(|l| l.items.into_iter().next()).map(Into::into),
            cluster_version: versions.and_then(|l| l.items.into_iter().next()).map(Into::into),
            operators: operators.map(|l| count_operator_conditions(&l.items)).unwrap_or_default(),
            health: health.map(Into::into),
        }))
    }

    fn statistics(&self) -> SummaryResult<ExtractedStatistics> {
        Ok(ExtractedStatistics {
            error_counters: self.read_json(ERROR_COUNTERS_PATH)?,
            must_gather: self.read_json::<MustGatherInfo>(MUST_GATHER_PATH)?,
        })
    }
}

// Cluster object shapes, trimmed to the fields the summary keeps.

#[derive(Debug, Deserialize)]
struct CrList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InfrastructureCr {
    status: InfrastructureCrStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InfrastructureCrStatus {
    platform: String,
    platform_status: Option<PlatformStatus>,
    #[serde(rename = "apiServerURL")]
    api_server_url: String,
    #[serde(rename = "apiServerInternalURI")]
    api_server_internal_url: String,
    infrastructure_name: String,
    infrastructure_topology: String,
    control_plane_topology: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlatformStatus {
    #[serde(rename = "type")]
    kind: String,
}

impl From<InfrastructureCr> for InfrastructureStatus {
    fn from(cr: InfrastructureCr) -> Self {
        let status = cr.status;
        let platform_type = if status.platform.is_empty() {
            status.platform_status.map(|p| p.kind).unwrap_or_default()
        } else {
            status.platform
        };
        Self {
            platform_type,
            api_server_url: status.api_server_url,
            api_server_internal_url: status.api_server_internal_url,
            infrastructure_name: status.infrastructure_name,
            topology: status.infrastructure_topology,
            control_plane_topology: status.control_plane_topology,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterVersionCr {
    status: ClusterVersionCrStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterVersionCrStatus {
    desired: DesiredVersion,
    conditions: Vec<Condition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DesiredVersion {
    version: String,
}

impl From<ClusterVersionCr> for ClusterVersionStatus {
    fn from(cr: ClusterVersionCr) -> Self {
        let mut out = ClusterVersionStatus {
            desired_version: cr.status.desired.version,
            ..Default::default()
        };
        for cond in cr.status.conditions {
            match cond.kind.as_str() {
                "Available" => out.cond_available = cond.status,
                "Failing" => out.cond_failing = cond.status,
                "Progressing" => {
                    out.cond_progressing = cond.status;
                    out.cond_progressing_message = cond.message;
                }
                "ReleaseAccepted" => out.cond_release_accepted = cond.status,
                _ => {}
            }
        }
        out
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterOperatorCr {
    status: ClusterOperatorCrStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterOperatorCrStatus {
    conditions: Vec<Condition>,
}

fn count_operator_conditions(operators: &[ClusterOperatorCr]) -> OperatorConditionCounts {
    let mut counts = OperatorConditionCounts::default();
    for cond in operators.iter().flat_map(|o| &o.status.conditions) {
        if cond.status != CONDITION_TRUE {
            continue;
        }
        match cond.kind.as_str() {
            "Available" => counts.available += 1,
            "Progressing" => counts.progressing += 1,
            "Degraded" => counts.degraded += 1,
            _ => {}
        }
    }
    counts
}

/// Runner cluster health summary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthSummary {
    node_health: NodeHealth,
    pod_health: PodHealth,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeHealth {
    total_nodes: u64,
    healthy_nodes: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodHealth {
    total_pods: u64,
    healthy_pods: u64,
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

impl From<HealthSummary> for ClusterHealth {
    fn from(h: HealthSummary) -> Self {
        Self {
            node_health_perc: percentage(h.node_health.healthy_nodes, h.node_health.total_nodes),
            pod_health_perc: percentage(h.pod_health.healthy_pods, h.pod_health.total_pods),
        }
    }
}

/// In-memory run, for programmatic callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    name: String,
    plugins: Vec<String>,
    results: HashMap<String, ResultNode>,
    infra: Option<InfraSnapshot>,
    statistics: ExtractedStatistics,
}

impl MemoryArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a plugin with its result tree.
    pub fn with_plugin(mut self, name: impl Into<String>, root: ResultNode) -> Self {
        let name = name.into();
        self.plugins.push(name.clone());
        self.results.insert(name, root);
        self
    }

    /// List a plugin whose result tree is missing.
    pub fn with_missing_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(name.into());
        self
    }

    pub fn with_infra(mut self, infra: InfraSnapshot) -> Self {
        self.infra = Some(infra);
        self
    }

    pub fn with_error_counters(mut self, counters: BTreeMap<String, u64>) -> Self {
        self.statistics.error_counters = Some(counters);
        self
    }

    pub fn with_must_gather(mut self, info: MustGatherInfo) -> Self {
        self.statistics.must_gather = Some(info);
        self
    }
}

impl ArchiveReader for MemoryArchive {
    fn source(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn plugins(&self) -> SummaryResult<Vec<String>> {
        Ok(self.plugins.clone())
    }

    fn plugin_result(&self, name: &str) -> SummaryResult<ResultNode> {
        self.results
            .get(name)
            .cloned()
            .ok_or_else(|| SummaryError::PluginNotFound(name.to_string()))
    }

    fn infra(&self) -> SummaryResult<Option<InfraSnapshot>> {
        Ok(self.infra.clone())
    }

    fn statistics(&self) -> SummaryResult<ExtractedStatistics> {
        Ok(self.statistics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_open_rejects_packed_file() {
        let dir = TempDir::new().unwrap();
        let packed = dir.path().join("results.tar.gz");
        fs::write(&packed, b"\x1f\x8b").unwrap();

        let err = DirectoryArchiveReader::open(&packed).unwrap_err();
        assert!(matches!(err, SummaryError::UnsupportedArchive(_)));
    }

    #[test]
    fn test_open_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryArchiveReader::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SummaryError::UnreadableArchive { .. }));
    }

    #[test]
    fn test_plugins_from_run_meta_and_fallback() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plugins/b/sonobuoy_results.yaml", "name: b\n");
        write(dir.path(), "plugins/a/sonobuoy_results.yaml", "name: a\n");

        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        assert_eq!(reader.plugins().unwrap(), vec!["a", "b"]);

        write(dir.path(), RUN_META_PATH, r#"{"plugins": ["b"]}"#);
        assert_eq!(reader.plugins().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_plugin_result_paths() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "plugins/p1/results/global/result.yaml",
            "name: p1\nstatus: passed\nitems:\n  - name: t\n    status: passed\n",
        );
        write(dir.path(), "plugins/p2/sonobuoy_results.yaml", "name: p2\nstatus: failed\n");

        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        assert_eq!(reader.plugin_result("p1").unwrap().children.len(), 1);
        assert_eq!(reader.plugin_result("p2").unwrap().status, "failed");
        assert!(matches!(
            reader.plugin_result("p3").unwrap_err(),
            SummaryError::PluginNotFound(_)
        ));
    }

    #[test]
    fn test_infra_from_cluster_objects() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            INFRASTRUCTURES_PATH,
            r#"{"items": [{"status": {
                "platform": "",
                "platformStatus": {"type": "External"},
                "apiServerURL": "https://api.example:6443",
                "apiServerInternalURI": "https://api-int.example:6443",
                "infrastructureName": "example-x7k2",
                "infrastructureTopology": "HighlyAvailable",
                "controlPlaneTopology": "HighlyAvailable"
            }}]}"#,
        );
        write(
            dir.path(),
            CLUSTER_VERSIONS_PATH,
            r#"{"items": [{"status": {
                "desired": {"version": "4.14.3"},
                "conditions": [
                    {"type": "Available", "status": "True"},
                    {"type": "Failing", "status": "False"},
                    {"type": "Progressing", "status": "False", "message": "Cluster version is 4.14.3"},
                    {"type": "ReleaseAccepted", "status": "True"}
                ]
            }}]}"#,
        );
        write(
            dir.path(),
            CLUSTER_OPERATORS_PATH,
            r#"{"items": [
                {"status": {"conditions": [
                    {"type": "Available", "status": "True"},
                    {"type": "Degraded", "status": "False"}
                ]}},
                {"status": {"conditions": [
                    {"type": "Available", "status": "True"},
                    {"type": "Progressing", "status": "True"},
                    {"type": "Degraded", "status": "True"}
                ]}}
            ]}"#,
        );
        write(
            dir.path(),
            CLUSTER_HEALTH_PATH,
            r#"{"node_health": {"total_nodes": 4, "healthy_nodes": 4},
                "pod_health": {"total_pods": 200, "healthy_pods": 197}}"#,
        );

        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        let infra = reader.infra().unwrap().unwrap();

        let status = infra.infrastructure.unwrap();
        assert_eq!(status.platform_type, "External");
        assert_eq!(status.topology, "HighlyAvailable");
        assert_eq!(status.api_server_internal_url, "https://api-int.example:6443");

        let cv = infra.cluster_version.unwrap();
        assert_eq!(cv.desired_version, "4.14.3");
        assert_eq!(cv.cond_available, "True");
        assert_eq!(cv.cond_failing, "False");
        assert_eq!(cv.cond_progressing_message, "Cluster version is 4.14.3");
        assert_eq!(cv.cond_release_accepted, "True");

        assert_eq!(infra.operators.available, 2);
        assert_eq!(infra.operators.progressing, 1);
        assert_eq!(infra.operators.degraded, 1);

        let health = infra.health.unwrap();
        assert_eq!(health.node_health_perc, 100.0);
        assert!((health.pod_health_perc - 98.5).abs() < 1e-9);
    }

    #[test]
    fn test_infra_keeps_files_that_decode() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            INFRASTRUCTURES_PATH,
            r#"{"items": [{"status": {"platformStatus": {"type": "AWS"}}}]}"#,
        );
        write(
            dir.path(),
            CLUSTER_VERSIONS_PATH,
            r#"{"items": [{"status": {"desired": {"version": "4.15.2"}}}]}"#,
        );
        write(dir.path(), CLUSTER_OPERATORS_PATH, "{\"items\": [truncated");
        write(dir.path(), CLUSTER_HEALTH_PATH, "not json");

        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        let infra = reader.infra().unwrap().unwrap();

        assert_eq!(infra.infrastructure.unwrap().platform_type, "AWS");
        assert_eq!(infra.cluster_version.unwrap().desired_version, "4.15.2");
        assert_eq!(infra.operators, OperatorConditionCounts::default());
        assert!(infra.health.is_none());
    }

    #[test]
    fn test_infra_absent() {
        let dir = TempDir::new().unwrap();
        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        assert!(reader.infra().unwrap().is_none());
    }

    #[test]
    fn test_statistics_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ERROR_COUNTERS_PATH, r#"{"total": 42, "timeout": 3}"#);
        write(
            dir.path(),
            MUST_GATHER_PATH,
            r#"{"error_counters": {"total": 1200},
                "etcd_slow_requests": {"mean": "210.1 ms", "max": "880 ms"}}"#,
        );

        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        let stats = reader.statistics().unwrap();
        assert_eq!(stats.error_counters.unwrap()["total"], 42);
        let mg = stats.must_gather.unwrap();
        assert_eq!(mg.error_counters["total"], 1200);
        assert_eq!(mg.etcd_slow_requests.unwrap().max_ms(), Some(880.0));
    }

    #[test]
    fn test_malformed_optional_file_is_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ERROR_COUNTERS_PATH, "not json");
        let reader = DirectoryArchiveReader::open(dir.path()).unwrap();
        assert!(matches!(reader.statistics(), Err(SummaryError::Json(_))));
    }

    #[test]
    fn test_memory_archive_missing_plugin() {
        let archive = MemoryArchive::new("m")
            .with_plugin("a", ResultNode::leaf("t", "passed"))
            .with_missing_plugin("b");
        assert_eq!(archive.plugins().unwrap(), vec!["a", "b"]);
        assert!(archive.plugin_result("a").is_ok());
        assert!(archive.plugin_result("b").is_err());
        assert_eq!(archive.source(), "memory:m");
    }
}
