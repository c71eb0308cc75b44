//! Reduction of a plugin result tree to counts and failures.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use provcert_types::result::{DETAIL_FAILURE, DETAIL_SYSTEM_OUT};
use provcert_types::{FailedItem, PluginSummary, ResultNode, StatusCounts, TestStatus};

/// Plugin status used when the runner reported none.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Leaf statistics of one result tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub counts: StatusCounts,
    /// Failed and timed-out test names in traversal order.
    pub failed_list: Vec<String>,
    /// First occurrence of each failing test.
    pub failed_items: BTreeMap<String, FailedItem>,
}

/// Walk `root` depth-first in child order, counting leaves by status.
///
/// Each failing leaf gets an offset equal to the running count of leaves
/// with its status. A root without children and without status is an empty
/// tree.
pub fn flatten(root: &ResultNode) -> Flattened {
    let mut out = Flattened::default();
    if root.is_leaf() && root.status.is_empty() {
        return out;
    }

    let mut stack: Vec<&ResultNode> = vec![root];
    while let Some(node) = stack.pop() {
        if !node.is_leaf() {
            stack.extend(node.children.iter().rev());
            continue;
        }

        let status = node.test_status();
        let offset = out.counts.increment(&status);
        if !status.is_failure() {
            continue;
        }

        out.failed_list.push(node.name.clone());
        if let Entry::Vacant(slot) = out.failed_items.entry(node.name.clone()) {
            slot.insert(FailedItem {
                name: node.name.clone(),
                failure_message: node.detail_str(DETAIL_FAILURE).unwrap_or_default().to_string(),
                system_out: node.detail_str(DETAIL_SYSTEM_OUT).unwrap_or_default().to_string(),
                offset,
                flake_info: None,
            });
        }
    }
    out
}

/// Build the summary of one plugin from its result tree.
pub fn build_plugin_summary(root: &ResultNode, plugin_name: &str) -> PluginSummary {
    let Flattened {
        counts,
        failed_list,
        failed_items,
    } = flatten(root);

    let timeout = counts.get(&TestStatus::Timeout);
    PluginSummary {
        name: plugin_name.to_string(),
        status: if root.status.is_empty() {
            UNKNOWN_STATUS.to_string()
        } else {
            root.status.clone()
        },
        total: counts.total(),
        passed: counts.get(&TestStatus::Passed),
        failed: counts.get(&TestStatus::Failed) + timeout,
        timeout,
        skipped: counts.get(&TestStatus::Skipped),
        status_counts: counts,
        failed_list,
        failed_items,
        filters: Default::default(),
    }
}
