//! # Provcert Flake
//!
//! Enrichment of failing tests with historical CI statistics from an external
//! flake corpus.
//!
//! - [`FlakeCorpus`]: the query seam, one call per test name
//! - [`SippyClient`]: HTTP implementation against the Sippy `/tests` API
//! - [`StaticCorpus`]: frozen in-memory snapshot for tests and offline runs
//! - [`FlakeQueryPool`]: bounded fan-out with per-request timeout and an
//!   optional global deadline
//!
//! Every query failure is isolated to its own test name. The pool never
//! returns an error for the batch as a whole.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod pool;

pub use client::{FlakeCorpus, SippyClient, StaticCorpus};
pub use config::FlakeConfig;
pub use error::{FlakeError, FlakeResult};
pub use pool::FlakeQueryPool;
