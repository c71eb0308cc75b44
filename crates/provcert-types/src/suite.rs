//! Authoritative test suites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The list of tests a plugin is required to run. Only membership matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    pub name: String,
    pub tests: BTreeSet<String>,
}

impl SuiteDefinition {
    pub fn new<I, S>(name: impl Into<String>, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tests: tests.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, test: &str) -> bool {
        self.tests.contains(test)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
