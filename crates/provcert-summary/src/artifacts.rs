//! Persistence of filter-stage lists and per-test failure output.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use provcert_types::{FailedItem, FilterStage, PluginSummary};
use tracing::{error, info};

use crate::consolidated::{ConsolidatedSummary, SummaryState};
use crate::error::{SummaryError, SummaryResult};

/// Failure output of the final filtered list.
pub const DIR_PROVIDER_FILTERED: &str = "failures-provider-filtered";
/// Failure output of every raw provider failure.
pub const DIR_PROVIDER: &str = "failures-provider";
/// Failure output of every raw baseline failure.
pub const DIR_BASELINE: &str = "failures-baseline";
/// Serialized consolidated summary.
pub const SUMMARY_FILE: &str = "summary.json";

const PREFIX: &str = "tests";

/// What [`ArtifactWriter::save`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactManifest {
    pub root: PathBuf,
    /// Files written, relative to `root`, in write order.
    pub files: Vec<PathBuf>,
}

/// Writes a filtered summary to a fresh directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactWriter;

impl ArtifactWriter {
    pub fn new() -> Self {
        Self
    }

    /// Save all artifacts of a filtered summary under `dir`.
    ///
    /// `dir` must not exist yet.
    pub fn save(&self, summary: &ConsolidatedSummary, dir: &Path) -> SummaryResult<ArtifactManifest> {
        if summary.state() != SummaryState::Filtered {
            return Err(SummaryError::InvalidTransition {
                from: summary.state(),
                to: SummaryState::Filtered,
            });
        }
        if dir.exists() {
            return Err(SummaryError::ArtifactDirExists(dir.display().to_string()));
        }
        fs::create_dir_all(dir)?;

        let mut manifest = ArtifactManifest {
            root: dir.to_path_buf(),
            files: Vec::new(),
        };
        for sub in [DIR_PROVIDER_FILTERED, DIR_PROVIDER, DIR_BASELINE] {
            fs::create_dir(dir.join(sub))?;
        }

        for (plugin, suite) in summary.suites() {
            let Some(provider) = summary.provider_plugin(plugin) else {
                continue;
            };

            let stage_lists: [(&str, &[String]); 5] = [
                ("provider_failures-1-ini", provider.failed_list.as_slice()),
                (
                    "provider_failures-2-filter1_suite",
                    provider.filter(FilterStage::Suite).unwrap_or_default(),
                ),
                (
                    "provider_failures-3-filter2_baseline",
                    provider.filter(FilterStage::Baseline).unwrap_or_default(),
                ),
                (
                    "provider_failures-4-filter3_without_flakes",
                    provider.filter(FilterStage::Flake).unwrap_or_default(),
                ),
                ("provider_failures", provider.final_failures()),
            ];
            for (suffix, list) in stage_lists {
                let name = format!("{PREFIX}_{plugin}_{suffix}.txt");
                write_list(dir, &name, list.iter(), &mut manifest)?;
            }

            let suite_name = format!("{PREFIX}_{plugin}_suite_full.txt");
            write_list(dir, &suite_name, suite.tests.iter(), &mut manifest)?;

            write_failures(dir, DIR_PROVIDER_FILTERED, provider, provider.final_failures(), &mut manifest);
            write_failures(dir, DIR_PROVIDER, provider, &provider.failed_list, &mut manifest);

            if summary.baseline_processed_for(plugin) {
                if let Some(baseline) = summary.baseline_plugin(plugin) {
                    let name = format!("{PREFIX}_{plugin}_baseline_failures.txt");
                    write_list(dir, &name, baseline.failed_list.iter(), &mut manifest)?;
                    write_failures(dir, DIR_BASELINE, baseline, &baseline.failed_list, &mut manifest);
                }
            }
        }

        let json = serde_json::to_string_pretty(summary)?;
        fs::write(dir.join(SUMMARY_FILE), json)?;
        manifest.files.push(PathBuf::from(SUMMARY_FILE));

        info!(dir = %dir.display(), files = manifest.files.len(), "Saved artifacts");
        Ok(manifest)
    }
}

fn write_list<'a>(
    dir: &Path,
    name: &str,
    lines: impl Iterator<Item = &'a String>,
    manifest: &mut ArtifactManifest,
) -> SummaryResult<()> {
    let mut file = fs::File::create(dir.join(name))?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    manifest.files.push(PathBuf::from(name));
    Ok(())
}

/// Write one failure/stdout pair per failing test, named by offset.
///
/// Failed and timed-out tests rank separately, so two tests may share an
/// offset; later ones get a `.<n>` suffix. Write errors are logged and the
/// remaining tests are still written.
fn write_failures(
    dir: &Path,
    sub: &str,
    plugin: &PluginSummary,
    tests: &[String],
    manifest: &mut ArtifactManifest,
) {
    let mut used: BTreeMap<u64, usize> = BTreeMap::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for test in tests {
        if !seen.insert(test.as_str()) {
            continue;
        }
        let Some(item) = plugin.failed_items.get(test) else {
            continue;
        };

        let stem = file_stem(&plugin.name, item, &mut used);
        for (suffix, body) in [
            ("failure", item.failure_message.as_str()),
            ("systemOut", item.system_out.as_str()),
        ] {
            let relative = Path::new(sub).join(format!("{stem}-{suffix}.txt"));
            match fs::write(dir.join(&relative), body) {
                Ok(()) => manifest.files.push(relative),
                Err(e) => error!(test = %test, error = %e, "Failed to write failure output"),
            }
        }
    }
}

fn file_stem(plugin: &str, item: &FailedItem, used: &mut BTreeMap<u64, usize>) -> String {
    let count = used.entry(item.offset).or_insert(0);
    *count += 1;
    if *count == 1 {
        format!("{plugin}_{}", item.offset)
    } else {
        format!("{plugin}_{}.{}", item.offset, *count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::filter::FilterPipeline;
    use provcert_types::result::DETAIL_FAILURE;
    use provcert_types::{ResultNode, SuiteDefinition};
    use tempfile::TempDir;

    async fn filtered_summary(with_baseline: bool) -> ConsolidatedSummary {
        let provider = MemoryArchive::new("provider").with_plugin(
            "p",
            ResultNode::group(
                "p",
                vec![
                    ResultNode::leaf("A", "failed").with_detail(DETAIL_FAILURE, "A broke"),
                    ResultNode::leaf("B", "timeout"),
                    ResultNode::leaf("C", "failed"),
                    ResultNode::leaf("OK", "passed"),
                ],
            ),
        );
        let baseline = MemoryArchive::new("baseline")
            .with_plugin("p", ResultNode::group("p", vec![ResultNode::leaf("C", "failed")]));

        let mut cs = ConsolidatedSummary::new();
        cs.populate_provider(&provider).unwrap();
        if with_baseline {
            cs.populate_baseline(&baseline).unwrap();
        }
        let mut suites = BTreeMap::new();
        suites.insert("p".to_string(), SuiteDefinition::new("s", ["A", "B", "C"]));
        cs.load_suites(suites).unwrap();
        cs.apply_filters(&FilterPipeline::offline()).await.unwrap();
        cs
    }

    #[tokio::test]
    async fn test_save_writes_stage_lists_and_failures() {
        let cs = filtered_summary(true).await;
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("artifacts");

        let manifest = ArtifactWriter::new().save(&cs, &out).unwrap();

        let ini = fs::read_to_string(out.join("tests_p_provider_failures-1-ini.txt")).unwrap();
        assert_eq!(ini, "A\nB\nC\n");
        let baseline =
            fs::read_to_string(out.join("tests_p_provider_failures-3-filter2_baseline.txt")).unwrap();
        assert_eq!(baseline, "A\nB\n");
        let suite = fs::read_to_string(out.join("tests_p_suite_full.txt")).unwrap();
        assert_eq!(suite, "A\nB\nC\n");
        assert!(out.join("tests_p_baseline_failures.txt").is_file());

        // A is failed #1 and B is timeout #1.
        let a = fs::read_to_string(out.join(DIR_PROVIDER_FILTERED).join("p_1-failure.txt")).unwrap();
        assert_eq!(a, "A broke");
        assert!(out.join(DIR_PROVIDER_FILTERED).join("p_1.1-systemOut.txt").is_file());
        assert!(out.join(DIR_BASELINE).join("p_1-failure.txt").is_file());
        assert!(out.join(SUMMARY_FILE).is_file());
        assert!(manifest.files.contains(&PathBuf::from(SUMMARY_FILE)));
    }

    #[tokio::test]
    async fn test_save_without_baseline_skips_baseline_lists() {
        let cs = filtered_summary(false).await;
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("artifacts");

        ArtifactWriter::new().save(&cs, &out).unwrap();
        assert!(!out.join("tests_p_baseline_failures.txt").exists());
        assert!(fs::read_dir(out.join(DIR_BASELINE)).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_save_refuses_existing_dir() {
        let cs = filtered_summary(false).await;
        let tmp = TempDir::new().unwrap();
        let err = ArtifactWriter::new().save(&cs, tmp.path()).unwrap_err();
        assert!(matches!(err, SummaryError::ArtifactDirExists(_)));
    }

    #[test]
    fn test_save_requires_filtered_summary() {
        let tmp = TempDir::new().unwrap();
        let err = ArtifactWriter::new()
            .save(&ConsolidatedSummary::new(), &tmp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidTransition { .. }));
    }
}
