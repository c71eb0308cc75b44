//! # Provcert Summary
//!
//! Consolidates a provider certification run with an optional baseline run
//! and narrows the provider's failures down to the ones it is accountable for.
//!
//! ## Flow
//!
//! ```text
//! ArchiveReader ──► flatten ──► ResultSummary ─┐
//!                                              ├─► FilterPipeline ──► ConsolidatedSummary
//! SuiteLoader ─────────────────────────────────┘    (suite, baseline, flake)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use provcert_summary::{
//!     ConsolidatedSummary, DirectoryArchiveReader, FilterPipeline, ProcessInputs, SuiteSource,
//! };
//!
//! # async fn example() -> provcert_summary::SummaryResult<()> {
//! let provider = DirectoryArchiveReader::open("./provider-results")?;
//! let mut summary = ConsolidatedSummary::new();
//! summary
//!     .process(
//!         ProcessInputs {
//!             provider: &provider,
//!             baseline: None,
//!             suites: vec![
//!                 SuiteSource::kubernetes_conformance("./suites/kube.txt"),
//!                 SuiteSource::openshift_conformance("./suites/openshift.txt"),
//!             ],
//!         },
//!         &FilterPipeline::offline(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod archive;
pub mod artifacts;
pub mod consolidated;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod suite;

pub use archive::{ArchiveReader, DirectoryArchiveReader, MemoryArchive};
pub use artifacts::{ArtifactManifest, ArtifactWriter};
pub use consolidated::{ConsolidatedSummary, ProcessInputs, ResultSummary, SummaryState};
pub use error::{SummaryError, SummaryResult};
pub use filter::{
    classify_flakes, stage_baseline, stage_suite, FilterPipeline, FilterReport, FilterTarget,
    FlakeClassification,
};
pub use flatten::{build_plugin_summary, flatten, Flattened};
pub use suite::{load_suite_file, parse_suite, SuiteSource};
