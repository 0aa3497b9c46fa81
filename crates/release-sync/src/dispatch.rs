use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::batch::Batch;
use crate::catalog::Category;
use crate::feedback::{self, Feedback, FeedbackSink};
use crate::fetch::{FetchError, FetchFailure, FetchOutcome, Fetcher, RunningFetch};

/// Per-item time bound when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A fetch could not be started at all. Fatal for the run.
#[derive(Debug, thiserror::Error)]
#[error("could not start fetch for {} ({category}): {source}", .target_path.display())]
pub struct DispatchError {
    pub category: Category,
    pub target_path: PathBuf,
    #[source]
    pub source: FetchError,
}

/// Runs one batch of fetches concurrently and collects their outcomes.
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    feedback: FeedbackSink,
}

impl Dispatcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            feedback: feedback::discard(),
        }
    }

    pub fn with_feedback(mut self, sink: FeedbackSink) -> Self {
        self.feedback = sink;
        self
    }

    /// Start every fetch in `batch`, then wait for all of them.
    ///
    /// Outcomes line up with `batch.items()`. If a fetch cannot be spawned no
    /// further fetches are started, the ones already running are still waited
    /// for, and the spawn failure is returned.
    pub async fn dispatch(&self, batch: &Batch) -> Result<Vec<FetchOutcome>, DispatchError> {
        let mut running: Vec<Box<dyn RunningFetch>> = Vec::with_capacity(batch.len());
        let mut spawn_error = None;

        for item in batch.items() {
            (self.feedback)(Feedback::command(self.fetcher.command_line(item)));

            match self.fetcher.start(item) {
                Ok(fetch) => {
                    tracing::debug!(
                        batch = batch.index(),
                        repo = %item.record.repo,
                        target = %item.record.target_path.display(),
                        "fetch started"
                    );
                    running.push(fetch);
                }
                Err(source) => {
                    tracing::error!(
                        repo = %item.record.repo,
                        error = %source,
                        "fetch could not be started"
                    );
                    spawn_error = Some(DispatchError {
                        category: item.record.category.clone(),
                        target_path: item.record.target_path.clone(),
                        source,
                    });
                    break;
                }
            }
        }

        let outcomes = join_all(running.into_iter().map(|fetch| self.finish(fetch))).await;

        match spawn_error {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }

    async fn finish(&self, mut fetch: Box<dyn RunningFetch>) -> FetchOutcome {
        let waited = tokio::time::timeout(self.timeout, fetch.wait()).await;
        match waited {
            Ok(outcome) => outcome,
            Err(_) => {
                fetch.kill().await;
                FetchOutcome::Failed(FetchFailure::TimedOut {
                    after: self.timeout,
                })
            }
        }
    }
}
