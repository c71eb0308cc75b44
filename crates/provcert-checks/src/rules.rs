//! Rule shapes.
//!
//! Every rule starts from [`CheckResult::fail`] with its target and flips to
//! pass only when the observed value satisfies the condition.

use std::fmt;

use provcert_summary::ConsolidatedSummary;
use provcert_types::{CheckResult, PluginSummary};
use tracing::debug;

use crate::check::{Check, RuleMeta};
use crate::lookup::{self, Lookup};

/// Reads the observed value out of a summary.
pub type Extractor<T> = fn(&ConsolidatedSummary) -> Lookup<T>;

/// Reported when a plugin failed every test it ran.
pub const RUNTIME_FAILURE: &str = "Potential Runtime Failure. Check the Plugin logs.";

const NOT_MATCHING: &str = "value does not match the acceptance criteria";

fn unavailable(meta: &RuleMeta, res: CheckResult, reason: String) -> CheckResult {
    debug!(check = %meta.name, reason = %reason, "Check failed on missing data");
    res.with_message(reason)
}

fn rejected(meta: &RuleMeta, res: CheckResult, message: impl Into<String>) -> CheckResult {
    let res = res.with_message(message);
    debug!(
        check = %meta.name,
        want = %res.target,
        got = %res.actual,
        "Check failed acceptance criteria"
    );
    res
}

/// Shared guard for plugin rules: a plugin with no tests, or with every test
/// failed, did not run properly.
fn runtime_guard(plugin: &PluginSummary) -> Option<&'static str> {
    if plugin.total == 0 {
        Some("plugin reported no tests")
    } else if plugin.total == plugin.failed {
        Some(RUNTIME_FAILURE)
    } else {
        None
    }
}

// ── Equality ───────────────────────────────────────────────────────────

/// Observed value must be one of an allowed set.
#[derive(Clone)]
pub struct AllowedValueRule {
    meta: RuleMeta,
    allowed: Vec<String>,
    extract: Extractor<String>,
}

impl AllowedValueRule {
    pub fn new(meta: RuleMeta, allowed: &[&str], extract: Extractor<String>) -> Self {
        Self {
            meta,
            allowed: allowed.iter().map(|v| v.to_string()).collect(),
            extract,
        }
    }

    /// Single accepted value.
    pub fn equals(meta: RuleMeta, expected: &str, extract: Extractor<String>) -> Self {
        Self::new(meta, &[expected], extract)
    }
}

impl fmt::Debug for AllowedValueRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedValueRule")
            .field("meta", &self.meta)
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

impl Check for AllowedValueRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(self.allowed.join("|"));
        let value = match (self.extract)(summary) {
            Ok(value) => value,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        let accepted = self.allowed.contains(&value);
        let res = res.with_actual(value);
        if accepted {
            res.pass()
        } else {
            rejected(&self.meta, res, NOT_MATCHING)
        }
    }
}

// ── Percentages ────────────────────────────────────────────────────────

/// Which count a [`ThresholdRule`] divides by the plugin total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numerator {
    /// Raw failed and timed out tests.
    Failed,
    /// Failures left after every filter stage.
    FinalFailures,
}

/// `numerator / total * 100` must not exceed a ceiling.
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    meta: RuleMeta,
    plugin: String,
    numerator: Numerator,
    ceiling: f64,
}

impl ThresholdRule {
    pub fn new(meta: RuleMeta, plugin: impl Into<String>, numerator: Numerator, ceiling: f64) -> Self {
        Self {
            meta,
            plugin: plugin.into(),
            numerator,
            ceiling,
        }
    }
}

impl Check for ThresholdRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(format!("<={}", self.ceiling));
        let plugin = match lookup::plugin(summary, &self.plugin) {
            Ok(plugin) => plugin,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        if let Some(reason) = runtime_guard(plugin) {
            return rejected(&self.meta, res, reason);
        }

        let numerator = match self.numerator {
            Numerator::Failed => plugin.failed,
            Numerator::FinalFailures => {
                if !plugin.is_fully_filtered() {
                    return unavailable(&self.meta, res, "filters were not applied".to_string());
                }
                plugin.final_failures().len() as u64
            }
        };
        let perc = numerator as f64 * 100.0 / plugin.total as f64;
        let res = res.with_actual(format!("{perc:.2}"));
        if perc > self.ceiling {
            rejected(
                &self.meta,
                res,
                format!("{numerator} of {} tests failed", plugin.total),
            )
        } else {
            res.pass()
        }
    }
}

// ── Counters ───────────────────────────────────────────────────────────

/// Counter must not exceed a ceiling, and exactly zero means it was never
/// collected.
#[derive(Clone)]
pub struct ZeroSentinelRule {
    meta: RuleMeta,
    ceiling: u64,
    extract: Extractor<u64>,
}

impl ZeroSentinelRule {
    pub fn new(meta: RuleMeta, ceiling: u64, extract: Extractor<u64>) -> Self {
        Self {
            meta,
            ceiling,
            extract,
        }
    }
}

impl fmt::Debug for ZeroSentinelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroSentinelRule")
            .field("meta", &self.meta)
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}

impl Check for ZeroSentinelRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(format!("<={}", self.ceiling));
        let value = match (self.extract)(summary) {
            Ok(value) => value,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        let res = res.with_actual(value.to_string());
        if value > self.ceiling {
            rejected(&self.meta, res, NOT_MATCHING)
        } else if value == 0 {
            rejected(&self.meta, res, "counter is zero, errors were not collected")
        } else {
            res.pass()
        }
    }
}

// ── Plugin status ──────────────────────────────────────────────────────

/// Runner-reported plugin status must equal an exact token.
#[derive(Debug, Clone)]
pub struct StatusRule {
    meta: RuleMeta,
    plugin: String,
    expected: String,
    guard_runtime: bool,
}

impl StatusRule {
    pub fn new(meta: RuleMeta, plugin: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            meta,
            plugin: plugin.into(),
            expected: expected.into(),
            guard_runtime: false,
        }
    }

    /// Also fail when every test of the plugin failed.
    pub fn with_runtime_guard(mut self) -> Self {
        self.guard_runtime = true;
        self
    }
}

impl Check for StatusRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(self.expected.clone());
        let plugin = match lookup::plugin(summary, &self.plugin) {
            Ok(plugin) => plugin,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        let res = res.with_actual(plugin.status.clone());
        if self.guard_runtime {
            if let Some(reason) = runtime_guard(plugin) {
                return rejected(&self.meta, res, reason);
            }
        }
        if plugin.status == self.expected {
            res.pass()
        } else {
            rejected(&self.meta, res, NOT_MATCHING)
        }
    }
}

/// The plugin's final actionable failure list must be empty.
#[derive(Debug, Clone)]
pub struct EmptyListRule {
    meta: RuleMeta,
    plugin: String,
}

impl EmptyListRule {
    pub fn new(meta: RuleMeta, plugin: impl Into<String>) -> Self {
        Self {
            meta,
            plugin: plugin.into(),
        }
    }
}

impl Check for EmptyListRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail("0");
        let plugin = match lookup::plugin(summary, &self.plugin) {
            Ok(plugin) => plugin,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        if let Some(reason) = runtime_guard(plugin) {
            return rejected(&self.meta, res, reason);
        }
        if !plugin.is_fully_filtered() {
            return unavailable(&self.meta, res, "filters were not applied".to_string());
        }

        let remaining = plugin.final_failures();
        let res = res.with_actual(remaining.len().to_string());
        if remaining.is_empty() {
            res.pass()
        } else {
            rejected(
                &self.meta,
                res,
                format!("{} failures remain after filters", remaining.len()),
            )
        }
    }
}

// ── Numeric bounds ─────────────────────────────────────────────────────

/// Observed value must be at least a floor.
#[derive(Clone)]
pub struct MinimumRule {
    meta: RuleMeta,
    target: String,
    floor: f64,
    extract: Extractor<f64>,
}

impl MinimumRule {
    pub fn new(meta: RuleMeta, target: impl Into<String>, floor: f64, extract: Extractor<f64>) -> Self {
        Self {
            meta,
            target: target.into(),
            floor,
            extract,
        }
    }
}

impl fmt::Debug for MinimumRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinimumRule")
            .field("meta", &self.meta)
            .field("floor", &self.floor)
            .finish_non_exhaustive()
    }
}

impl Check for MinimumRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(self.target.clone());
        let value = match (self.extract)(summary) {
            Ok(value) => value,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        let res = res.with_actual(value.to_string());
        if value >= self.floor {
            res.pass()
        } else {
            rejected(&self.meta, res, NOT_MATCHING)
        }
    }
}

/// Latency in milliseconds must be strictly under a limit.
#[derive(Clone)]
pub struct LatencyRule {
    meta: RuleMeta,
    limit_ms: f64,
    extract: Extractor<f64>,
}

impl LatencyRule {
    pub fn new(meta: RuleMeta, limit_ms: f64, extract: Extractor<f64>) -> Self {
        Self {
            meta,
            limit_ms,
            extract,
        }
    }
}

impl fmt::Debug for LatencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyRule")
            .field("meta", &self.meta)
            .field("limit_ms", &self.limit_ms)
            .finish_non_exhaustive()
    }
}

impl Check for LatencyRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult {
        let res = CheckResult::fail(format!("<{} ms", self.limit_ms));
        let value = match (self.extract)(summary) {
            Ok(value) => value,
            Err(reason) => return unavailable(&self.meta, res, reason),
        };
        let res = res.with_actual(format!("{value} ms"));
        if value < self.limit_ms {
            res.pass()
        } else {
            rejected(&self.meta, res, NOT_MATCHING)
        }
    }
}
