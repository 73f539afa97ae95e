use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error, warn};

use super::deriver::FileHandle;
use super::error::{ClientError, Result};
use super::progress::{ProgressReporter, ProgressStore};
use super::transport::UploadTransport;
use crate::features::assets::models::FileMetadata;

/// Undo the metadata of an upload that will never complete
#[async_trait]
pub trait Compensator: Send + Sync {
    async fn compensate(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Total transfer attempts per file, first one included
    pub max_attempts: u32,
    /// Wait before attempt `n + 1` is `n * backoff`
    pub backoff: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Everything needed to move one file's bytes to storage
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub file: FileHandle,
    pub checksum: String,
    pub upload_url: String,
    pub metadata: FileMetadata,
}

impl UploadJob {
    pub fn key(&self) -> &str {
        &self.metadata.key
    }
}

/// Settled state of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub progress: ProgressStore,
    /// Metadata of the files storage acknowledged
    pub completed: Vec<FileMetadata>,
}

/// Runs every upload of a batch concurrently, each with its own retry budget
pub struct UploadExecutor {
    transport: Arc<dyn UploadTransport>,
    compensator: Option<Arc<dyn Compensator>>,
    config: ExecutorConfig,
}

impl UploadExecutor {
    pub fn new(transport: Arc<dyn UploadTransport>, config: ExecutorConfig) -> Self {
        Self {
            transport,
            compensator: None,
            config,
        }
    }

    pub fn with_compensator(mut self, compensator: Arc<dyn Compensator>) -> Self {
        self.compensator = Some(compensator);
        self
    }

    /// Register every job as pending, then transfer all of them
    pub async fn execute(&self, jobs: Vec<UploadJob>) -> BatchOutcome {
        let mut progress = ProgressStore::new();
        let tasks: Vec<(UploadJob, ProgressReporter)> = jobs
            .into_iter()
            .map(|job| {
                let reporter = progress.register(job.key(), job.file.clone());
                (job, reporter)
            })
            .collect();

        self.execute_registered(tasks, progress).await
    }

    /// Transfer jobs whose progress entries already exist in `progress`
    pub async fn execute_registered(
        &self,
        tasks: Vec<(UploadJob, ProgressReporter)>,
        progress: ProgressStore,
    ) -> BatchOutcome {
        let results = join_all(
            tasks
                .into_iter()
                .map(|(job, reporter)| self.run_one(job, reporter)),
        )
        .await;

        BatchOutcome {
            progress,
            completed: results.into_iter().flatten().collect(),
        }
    }

    async fn run_one(&self, job: UploadJob, reporter: ProgressReporter) -> Option<FileMetadata> {
        let total = job.file.size();
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            reporter.begin_attempt(attempt);

            let on_progress = {
                let reporter = reporter.clone();
                Arc::new(move |sent: u64| reporter.advance(sent, total))
            };

            match self
                .transport
                .put(&job.upload_url, &job.file, &job.checksum, on_progress)
                .await
            {
                Ok(()) => {
                    reporter.complete();
                    debug!("Uploaded key={} after {} attempt(s)", job.key(), attempt);
                    return Some(job.metadata);
                }
                Err(e) => {
                    warn!(
                        "Upload attempt {}/{} failed for key={}: {}",
                        attempt,
                        max_attempts,
                        job.key(),
                        e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.backoff * attempt).await;
            }
        }

        reporter.fail(last_error);
        self.compensate(job.key()).await;
        None
    }

    async fn compensate(&self, key: &str) {
        let Some(compensator) = &self.compensator else {
            return;
        };
        if let Err(e) = compensator.compensate(key).await {
            let err = ClientError::Cleanup {
                key: key.to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::progress::UploadStatus;
    use crate::client::transport::ProgressFn;
    use crate::shared::test_helpers::sample_file;
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Transport that plays back a script of outcomes per URL
    #[derive(Default)]
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, VecDeque<bool>>>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedTransport {
        fn script(self, url: &str, outcomes: &[bool]) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), outcomes.iter().copied().collect());
            self
        }

        fn calls(&self, url: &str) -> u32 {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl UploadTransport for ScriptedTransport {
        async fn put(
            &self,
            url: &str,
            file: &FileHandle,
            _checksum: &str,
            on_progress: ProgressFn,
        ) -> Result<()> {
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
            let succeed = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(|s| s.pop_front())
                .unwrap_or(true);

            let total = file.size();
            on_progress(total / 4);
            on_progress(total / 2);
            if succeed {
                on_progress(total);
                Ok(())
            } else {
                Err(ClientError::Transfer("storage responded with 500".to_string()))
            }
        }
    }

    #[derive(Default)]
    struct RecordingCompensator {
        keys: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Compensator for RecordingCompensator {
        async fn compensate(&self, key: &str) -> Result<()> {
            self.keys.lock().unwrap().push(key.to_string());
            if self.fail {
                return Err(ClientError::Transfer("server unreachable".to_string()));
            }
            Ok(())
        }
    }

    fn job(key: &str) -> UploadJob {
        UploadJob {
            file: FileHandle::new("f.bin", "application/octet-stream", vec![1u8; 400]),
            checksum: "c".repeat(64),
            upload_url: format!("https://storage.test/{}", key),
            metadata: sample_file("alice", key, Utc::now()),
        }
    }

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_success_ends_at_100_percent() {
        let transport = Arc::new(ScriptedTransport::default());
        let executor = UploadExecutor::new(transport.clone(), config());

        let outcome = executor.execute(vec![job("a")]).await;

        let entry = outcome.progress.get("a").unwrap();
        assert_eq!(entry.status, UploadStatus::Completed);
        assert_eq!(entry.progress_percent, 100);
        assert_eq!(entry.attempts, 1);
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].key, "a");
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let transport = Arc::new(ScriptedTransport::default().script(
            "https://storage.test/a",
            &[false, false, false, true],
        ));
        let executor = UploadExecutor::new(transport.clone(), config());

        let outcome = executor.execute(vec![job("a")]).await;

        assert_eq!(transport.calls("https://storage.test/a"), 3);
        let entry = outcome.progress.get("a").unwrap();
        assert_eq!(entry.status, UploadStatus::Error);
        assert_eq!(entry.attempts, 3);
        assert!(entry.progress_percent <= 98);
        assert_eq!(
            entry.error_message.as_deref(),
            Some("Transfer failed: storage responded with 500")
        );
        assert!(outcome.completed.is_empty());
    }

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let transport = Arc::new(
            ScriptedTransport::default().script("https://storage.test/a", &[false, false, true]),
        );
        let compensator = Arc::new(RecordingCompensator::default());
        let executor =
            UploadExecutor::new(transport.clone(), config()).with_compensator(compensator.clone());

        let outcome = executor.execute(vec![job("a")]).await;

        assert_eq!(transport.calls("https://storage.test/a"), 3);
        assert_eq!(
            outcome.progress.get("a").unwrap().status,
            UploadStatus::Completed
        );
        assert!(compensator.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let transport = Arc::new(
            ScriptedTransport::default().script("https://storage.test/b", &[false, false, false]),
        );
        let executor = UploadExecutor::new(transport.clone(), config());

        let outcome = executor
            .execute(vec![job("a"), job("b"), job("c")])
            .await;

        let snapshot = outcome.progress.snapshot();
        assert_eq!(snapshot["a"].status, UploadStatus::Completed);
        assert_eq!(snapshot["b"].status, UploadStatus::Error);
        assert_eq!(snapshot["c"].status, UploadStatus::Completed);
        let mut keys: Vec<&str> = outcome.completed.iter().map(|m| m.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_terminal_failure_compensates_exactly_once() {
        let transport = Arc::new(
            ScriptedTransport::default().script("https://storage.test/a", &[false, false, false]),
        );
        let compensator = Arc::new(RecordingCompensator::default());
        let executor =
            UploadExecutor::new(transport, config()).with_compensator(compensator.clone());

        executor.execute(vec![job("a"), job("b")]).await;

        assert_eq!(*compensator.keys.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_compensation_keeps_error_entry() {
        let transport = Arc::new(
            ScriptedTransport::default().script("https://storage.test/a", &[false, false, false]),
        );
        let compensator = Arc::new(RecordingCompensator {
            keys: Mutex::new(Vec::new()),
            fail: true,
        });
        let executor =
            UploadExecutor::new(transport, config()).with_compensator(compensator.clone());

        let outcome = executor.execute(vec![job("a")]).await;

        assert_eq!(compensator.keys.lock().unwrap().len(), 1);
        assert_eq!(
            outcome.progress.get("a").unwrap().status,
            UploadStatus::Error
        );
    }

    #[tokio::test]
    async fn test_progress_observed_is_monotonic_and_capped() {
        use tokio_stream::StreamExt;

        let transport = Arc::new(
            ScriptedTransport::default().script("https://storage.test/a", &[false, true]),
        );
        let executor = UploadExecutor::new(transport, config());

        let mut progress = ProgressStore::new();
        let job = job("a");
        let reporter = progress.register(job.key(), job.file.clone());
        let mut updates = progress.subscribe("a").unwrap();

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(entry) = updates.next().await {
                let done = entry.status == UploadStatus::Completed;
                seen.push((entry.status, entry.progress_percent));
                if done {
                    break;
                }
            }
            seen
        });

        let outcome = executor
            .execute_registered(vec![(job, reporter)], progress)
            .await;
        drop(outcome);
        let seen = observer.await.unwrap();

        let uploading: Vec<u8> = seen
            .iter()
            .filter(|(s, _)| *s == UploadStatus::Uploading)
            .map(|(_, p)| *p)
            .collect();
        assert!(uploading.windows(2).all(|w| w[0] <= w[1]));
        assert!(uploading.iter().all(|p| *p <= 98));
        assert_eq!(seen.last(), Some(&(UploadStatus::Completed, 100)));
    }
}
