//! Acceptance rule trait.

use provcert_summary::ConsolidatedSummary;
use provcert_types::CheckResult;
use serde::{Deserialize, Serialize};

/// Documentation path appended to the base URL.
pub const DOCS_RULES_PATH: &str = "/review/rules";

/// Identity and documentation of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    /// Stable identifier such as `OPCT-004`; older rules have none.
    pub id: Option<String>,
    /// Short descriptive name reported with the verdict.
    pub name: String,
    /// Documentation URL, set only for rules with an identifier.
    pub documentation_ref: Option<String>,
}

impl RuleMeta {
    /// Rule without a stable identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            documentation_ref: None,
        }
    }

    /// Rule with a stable identifier.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(name)
        }
    }

    /// Resolve `documentation_ref` against a documentation base URL.
    pub fn documented_at(mut self, docs_base_url: &str) -> Self {
        self.documentation_ref = self.id.as_ref().map(|id| {
            format!(
                "{}{}/#{}",
                docs_base_url.trim_end_matches('/'),
                DOCS_RULES_PATH,
                id
            )
        });
        self
    }
}

/// A single acceptance rule.
///
/// Rules are pure functions of a filtered [`ConsolidatedSummary`]. They
/// start from a failing result and only pass when their condition holds, so
/// missing data is always reported as a failure.
pub trait Check: Send + Sync + std::fmt::Debug {
    /// Identity of this rule
    fn meta(&self) -> &RuleMeta;

    /// Evaluate the rule
    fn evaluate(&self, summary: &ConsolidatedSummary) -> CheckResult;

    fn id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn documentation_ref(&self) -> Option<&str> {
        self.meta().documentation_ref.as_deref()
    }
}
