//! # Provcert Checks
//!
//! Acceptance rules evaluated against a filtered
//! [`ConsolidatedSummary`](provcert_summary::ConsolidatedSummary).
//!
//! Every rule is fail-closed: it starts from a failing verdict and passes
//! only when its condition holds on data that was actually collected.
//!
//! ```rust,no_run
//! use provcert_checks::{CheckCatalog, CheckEngine, DEFAULT_DOCS_BASE_URL};
//! use provcert_summary::ConsolidatedSummary;
//!
//! # fn example(summary: &ConsolidatedSummary) {
//! let engine = CheckEngine::new(CheckCatalog::default_catalog(DEFAULT_DOCS_BASE_URL));
//! let report = engine.run(summary);
//! println!("{report}");
//! # }
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod check;
pub mod engine;
pub mod lookup;
pub mod report;
pub mod rules;

pub use catalog::{CheckCatalog, ALLOWED_PLATFORM_TYPES, DEFAULT_DOCS_BASE_URL};
pub use check::{Check, RuleMeta, DOCS_RULES_PATH};
pub use engine::CheckEngine;
pub use report::{CheckRecord, CheckReport, CheckSummary};
pub use rules::{
    AllowedValueRule, EmptyListRule, Extractor, LatencyRule, MinimumRule, Numerator, StatusRule,
    ThresholdRule, ZeroSentinelRule, RUNTIME_FAILURE,
};
