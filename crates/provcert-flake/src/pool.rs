//! Bounded concurrent fan-out of flake corpus queries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use provcert_types::FlakeRecord;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::client::FlakeCorpus;
use crate::config::FlakeConfig;
use crate::error::{FlakeError, FlakeResult};

/// Per-test query outcomes keyed by test name.
pub type QueryOutcomes = BTreeMap<String, FlakeResult<Vec<FlakeRecord>>>;

/// Runs one corpus query per test on a bounded number of tasks.
///
/// Every test passed to [`FlakeQueryPool::query_all`] gets exactly one entry
/// in the returned map. Failures never cross from one test to another.
#[derive(Clone)]
pub struct FlakeQueryPool {
    corpus: Arc<dyn FlakeCorpus>,
    concurrency: usize,
    request_timeout: Duration,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for FlakeQueryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakeQueryPool")
            .field("concurrency", &self.concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl FlakeQueryPool {
    /// Create a pool with default limits.
    pub fn new(corpus: Arc<dyn FlakeCorpus>) -> Self {
        Self::from_config(corpus, &FlakeConfig::default())
    }

    /// Create a pool with limits taken from configuration.
    pub fn from_config(corpus: Arc<dyn FlakeCorpus>, config: &FlakeConfig) -> Self {
        Self {
            corpus,
            concurrency: config.concurrency.max(1),
            request_timeout: config.request_timeout(),
            deadline: config.deadline(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Query every distinct test name in `tests` for `release`.
    #[instrument(skip(self, tests), fields(tests = tests.len(), concurrency = self.concurrency))]
    pub async fn query_all(&self, tests: &[String], release: &str) -> QueryOutcomes {
        let unique: BTreeSet<&String> = tests.iter().collect();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let results: Arc<DashMap<String, FlakeResult<Vec<FlakeRecord>>>> =
            Arc::new(DashMap::new());
        let deadline = self.deadline.map(|d| Instant::now() + d);

        let mut names = Vec::with_capacity(unique.len());
        let mut handles = Vec::with_capacity(unique.len());

        for test in unique {
            let corpus = Arc::clone(&self.corpus);
            let semaphore = Arc::clone(&semaphore);
            let results = Arc::clone(&results);
            let test_name = test.clone();
            let release = release.to_string();
            let request_timeout = self.request_timeout;

            names.push(test.clone());
            handles.push(tokio::spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        if deadline.is_some_and(|d| Instant::now() >= d) {
                            Err(FlakeError::DeadlineExceeded)
                        } else {
                            match tokio::time::timeout(
                                request_timeout,
                                corpus.query_tests(&test_name, &release),
                            )
                            .await
                            {
                                Ok(result) => result,
                                Err(_) => Err(FlakeError::Timeout(request_timeout)),
                            }
                        }
                    }
                    Err(e) => Err(FlakeError::TaskFailed(e.to_string())),
                };
                results.insert(test_name, outcome);
            }));
        }

        let joined = futures::future::join_all(handles).await;

        let mut outcomes = QueryOutcomes::new();
        for (name, join) in names.into_iter().zip(joined) {
            let outcome = match results.remove(&name) {
                Some((_, outcome)) => outcome,
                None => {
                    let reason = match join {
                        Err(e) => e.to_string(),
                        Ok(()) => "no result recorded".to_string(),
                    };
                    Err(FlakeError::TaskFailed(reason))
                }
            };
            if let Err(e) = &outcome {
                warn!(test = %name, error = %e, "Flake query failed");
            }
            outcomes.insert(name, outcome);
        }

        debug!(queried = outcomes.len(), "Flake queries complete");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StaticCorpus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Corpus that tracks peak concurrency and fails or stalls on chosen names.
    #[derive(Default)]
    struct ScriptedCorpus {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FlakeCorpus for ScriptedCorpus {
        async fn query_tests(
            &self,
            test_name: &str,
            _release: &str,
        ) -> FlakeResult<Vec<FlakeRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let result = match test_name {
                "panic" => panic!("corpus blew up"),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(vec![])
                }
                "error" => Err(FlakeError::Api {
                    status: 500,
                    message: "boom".into(),
                }),
                other => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(vec![FlakeRecord::with_flakes(other, 1)])
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[tokio::test]
    async fn test_query_all_every_test_gets_an_entry() {
        let corpus = StaticCorpus::new().with_record(FlakeRecord::with_flakes("a", 3));
        let pool = FlakeQueryPool::new(Arc::new(corpus));

        let outcomes = pool.query_all(&names(&["b", "a", "a"]), "4.14").await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes["a"].as_ref().unwrap()[0].current_flakes, 3);
        assert!(outcomes["b"].as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let corpus = Arc::new(ScriptedCorpus::default());
        let pool = FlakeQueryPool::new(corpus.clone()).with_concurrency(2);

        let tests: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let outcomes = pool.query_all(&tests, "4.14").await;

        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.values().all(|o| o.is_ok()));
        assert!(corpus.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(corpus.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_errors_are_isolated_per_test() {
        let pool = FlakeQueryPool::new(Arc::new(ScriptedCorpus::default()));
        let outcomes = pool.query_all(&names(&["error", "ok"]), "4.14").await;

        assert!(matches!(outcomes["error"], Err(FlakeError::Api { status: 500, .. })));
        assert!(outcomes["ok"].is_ok());
    }

    #[tokio::test]
    async fn test_panicking_query_is_task_failure() {
        let pool = FlakeQueryPool::new(Arc::new(ScriptedCorpus::default()));
        let outcomes = pool.query_all(&names(&["panic", "ok"]), "4.14").await;

        assert!(matches!(outcomes["panic"], Err(FlakeError::TaskFailed(_))));
        assert!(outcomes["ok"].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let pool = FlakeQueryPool::new(Arc::new(ScriptedCorpus::default()))
            .with_request_timeout(Duration::from_secs(10));
        let outcomes = pool.query_all(&names(&["slow", "ok"]), "4.14").await;

        assert!(matches!(outcomes["slow"], Err(FlakeError::Timeout(_))));
        assert!(outcomes["ok"].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_new_queries() {
        let corpus = Arc::new(ScriptedCorpus::default());
        let pool = FlakeQueryPool::new(corpus.clone())
            .with_concurrency(1)
            .with_request_timeout(Duration::from_secs(10))
            .with_deadline(Some(Duration::from_secs(5)));

        // "slow" sorts after "a" so "a" runs first, then "slow" burns the deadline.
        let outcomes = pool.query_all(&names(&["a", "slow", "z"]), "4.14").await;

        assert!(outcomes["a"].is_ok());
        assert!(matches!(outcomes["slow"], Err(FlakeError::Timeout(_))));
        assert!(matches!(outcomes["z"], Err(FlakeError::DeadlineExceeded)));
        assert_eq!(corpus.calls.load(Ordering::SeqCst), 2);
    }
}
