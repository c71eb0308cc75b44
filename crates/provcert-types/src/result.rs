//! Raw hierarchical result tree produced by a conformance plugin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Detail key carrying the failure message of a failed leaf.
pub const DETAIL_FAILURE: &str = "failure";
/// Detail key carrying the captured output of a failed leaf.
pub const DETAIL_SYSTEM_OUT: &str = "system-out";

/// One node of a plugin's result tree.
///
/// Only leaves (nodes without children) carry a meaningful status. The
/// serialized shape matches the runner's result item format, where children
/// live under `items`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultNode {
    /// Node name; for leaves this is the full test name.
    #[serde(default)]
    pub name: String,
    /// Status token reported by the runner.
    #[serde(default)]
    pub status: String,
    /// Child nodes in runner order.
    #[serde(default, rename = "items", alias = "children", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultNode>,
    /// Free-form per-node details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, serde_json::Value>>,
}

impl ResultNode {
    /// Create a leaf node with a status.
    pub fn leaf(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            children: Vec::new(),
            details: None,
        }
    }

    /// Create an internal node grouping `children`.
    pub fn group(name: impl Into<String>, children: Vec<ResultNode>) -> Self {
        Self {
            name: name.into(),
            status: String::new(),
            children,
            details: None,
        }
    }

    /// Attach a string detail.
    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), serde_json::Value::String(value.into()));
        self
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Parsed status of this node.
    pub fn test_status(&self) -> TestStatus {
        TestStatus::parse(&self.status)
    }

    /// String value of a detail key. Non-string values read as absent.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.as_ref()?.get(key)?.as_str()
    }
}

/// Status of a single test leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
    Timeout,
    Skipped,
    /// Any token the runner emitted that is not one of the above.
    Other(String),
}

impl TestStatus {
    /// Parse a runner status token.
    pub fn parse(token: &str) -> Self {
        match token {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "timeout" => Self::Timeout,
            "skipped" => Self::Skipped,
            other => Self::Other(other.to_string()),
        }
    }

    /// Runner token for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Skipped => "skipped",
            Self::Other(s) => s,
        }
    }

    /// Failed and timed-out tests both count as failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
