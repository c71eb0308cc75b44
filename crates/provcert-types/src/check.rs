//! Outcomes of acceptance rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a single acceptance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Skip,
}

impl CheckOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub outcome: CheckOutcome,
    /// Description of the expected condition.
    pub target: String,
    /// Observed value, empty when it could not be read.
    #[serde(default)]
    pub actual: String,
    #[serde(default)]
    pub message: String,
}

impl CheckResult {
    /// A failing result with the given target. Rules start from this.
    pub fn fail(target: impl Into<String>) -> Self {
        Self {
            outcome: CheckOutcome::Fail,
            target: target.into(),
            actual: String::new(),
            message: String::new(),
        }
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = actual.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Flip to pass.
    pub fn pass(mut self) -> Self {
        self.outcome = CheckOutcome::Pass;
        self.message = CheckOutcome::Pass.label().to_string();
        self
    }

    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.outcome = CheckOutcome::Skip;
        self.message = reason.into();
        self
    }

    pub fn is_pass(&self) -> bool {
        self.outcome == CheckOutcome::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.outcome == CheckOutcome::Fail
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (want={} got={})",
            self.outcome, self.target, self.actual
        )?;
        if !self.message.is_empty() && self.outcome != CheckOutcome::Pass {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
