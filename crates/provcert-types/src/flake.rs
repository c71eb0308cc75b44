//! Flake corpus records.

use serde::{Deserialize, Serialize};

/// Historical execution statistics for one test, as reported by the flake
/// corpus. Field names follow the corpus API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlakeRecord {
    #[serde(rename = "name")]
    pub test_name: String,
    pub current_failures: i64,
    pub current_flakes: i64,
    pub current_runs: i64,
    pub current_pass_percentage: f64,
    pub current_flake_percentage: f64,
    pub current_working_percentage: f64,
    pub previous_failures: i64,
    pub previous_flakes: i64,
}

impl FlakeRecord {
    /// Record with only a name and a current flake count.
    pub fn with_flakes(test_name: impl Into<String>, current_flakes: i64) -> Self {
        Self {
            test_name: test_name.into(),
            current_flakes,
            ..Default::default()
        }
    }

    /// A test is currently flaking when it flaked at least once in the current window.
    pub fn is_flaking(&self) -> bool {
        self.current_flakes > 0
    }
}
