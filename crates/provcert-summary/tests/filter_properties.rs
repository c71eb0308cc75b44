//! Property tests: set algebra of the filter stages.

use std::collections::BTreeSet;

use provcert_flake::pool::QueryOutcomes;
use provcert_summary::{classify_flakes, stage_baseline, stage_suite};
use provcert_types::{FlakeRecord, SuiteDefinition};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// Test names drawn from a small alphabet so that sets overlap often.
fn arb_test_name() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_test_name(), 0..max)
}

/// Corpus outcomes for a list of names: some flaking, some stable, some unknown.
fn arb_outcomes() -> impl Strategy<Value = Vec<(String, Option<i64>)>> {
    prop::collection::vec((arb_test_name(), prop::option::of(0i64..4)), 0..20)
}

fn is_sorted_unique(v: &[String]) -> bool {
    v.windows(2).all(|w| w[0] < w[1])
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Stage A output is a subset of both the suite and the raw failures.
    #[test]
    fn suite_stage_is_intersection(raw in arb_names(30), suite in arb_names(30)) {
        let suite = SuiteDefinition::new("s", suite);
        let out = stage_suite(&raw, &suite);
        let raw_set: BTreeSet<&String> = raw.iter().collect();

        prop_assert!(is_sorted_unique(&out));
        for t in &out {
            prop_assert!(suite.contains(t));
            prop_assert!(raw_set.contains(t));
        }
        for t in &raw {
            prop_assert_eq!(suite.contains(t), out.contains(t));
        }
    }

    /// Applying stage A twice changes nothing.
    #[test]
    fn suite_stage_is_idempotent(raw in arb_names(30), suite in arb_names(30)) {
        let suite = SuiteDefinition::new("s", suite);
        let once = stage_suite(&raw, &suite);
        let twice = stage_suite(&once, &suite);
        prop_assert_eq!(once, twice);
    }

    /// Stage B is set difference, and an empty baseline is the identity on sorted input.
    #[test]
    fn baseline_stage_is_difference(input in arb_names(30), baseline in arb_names(30)) {
        let out = stage_baseline(&input, Some(baseline.as_slice()));
        prop_assert!(is_sorted_unique(&out));

        let expected: Vec<String> = input
            .iter()
            .filter(|t| !baseline.contains(t))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(&out, &expected);

        let sorted_input: Vec<String> = input.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        prop_assert_eq!(stage_baseline(&sorted_input, Some(&[][..])), sorted_input.clone());
        prop_assert_eq!(stage_baseline(&sorted_input, None), sorted_input);
    }

    /// Stage C never grows its input and partitions it.
    #[test]
    fn flake_stage_is_non_increasing(input in arb_names(30), corpus in arb_outcomes()) {
        let mut outcomes = QueryOutcomes::new();
        for (name, flakes) in corpus {
            let records: Vec<FlakeRecord> = flakes.map(|f| FlakeRecord::with_flakes(name.clone(), f)).into_iter().collect();
            outcomes.insert(name, Ok(records));
        }

        let unique: BTreeSet<&String> = input.iter().collect();
        let out = classify_flakes(&input, &outcomes);

        prop_assert!(out.retained.len() <= input.len());
        prop_assert_eq!(out.retained.len() + out.flaking.len(), unique.len());
        prop_assert!(is_sorted_unique(&out.retained));
        for t in &out.flaking {
            prop_assert!(out.records[t].is_flaking());
        }
    }

    /// The same inputs give byte-identical stage outputs.
    #[test]
    fn stages_are_deterministic(raw in arb_names(30), suite in arb_names(30), baseline in arb_names(30)) {
        let suite = SuiteDefinition::new("s", suite);
        let run = || {
            let a = stage_suite(&raw, &suite);
            let b = stage_baseline(&a, Some(baseline.as_slice()));
            (a, b)
        };
        prop_assert_eq!(run(), run());
    }
}
