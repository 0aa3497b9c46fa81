use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::batch::{Batch, DEFAULT_BATCH_SIZE, into_batches};
use crate::catalog::{CatalogFormatError, CatalogRecord};
use crate::dispatch::{DEFAULT_TIMEOUT, DispatchError, Dispatcher};
use crate::feedback::{self, Feedback, FeedbackSink};
use crate::fetch::Fetcher;
use crate::pending::{resolve_all, resolve_pending};
use crate::report::{BatchFailure, check_batch};

/// How a run treats its work list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fetch every pending asset.
    Build,
    /// Print the commands a build would issue without running them.
    Dry,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "build" => Some(Self::Build),
            "dry" => Some(Self::Dry),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Dry => "dry",
        }
    }
}

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogFormatError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    BatchFailed(BatchFailure),
}

/// Everything a run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub asset_root: PathBuf,
    pub batch_size: NonZeroUsize,
    pub timeout: Duration,
    pub mode: Mode,
    /// Treat every record as pending, overwriting files already present.
    pub force: bool,
}

impl SyncOptions {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
            mode: Mode::Build,
            force: false,
        }
    }
}

/// Counts describing a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub mode: Mode,
    /// Records in the catalog.
    pub cataloged: usize,
    /// Records scheduled for fetching.
    pub pending: usize,
    /// Batches dispatched (or previewed).
    pub batches: usize,
    /// Assets fetched, or commands previewed in dry mode.
    pub fetched: usize,
}

impl SyncSummary {
    fn new(mode: Mode, cataloged: usize, pending: usize) -> Self {
        Self {
            mode,
            cataloged,
            pending,
            batches: 0,
            fetched: 0,
        }
    }
}

/// Brings the asset tree in line with a catalog, one batch at a time.
pub struct Synchronizer {
    options: SyncOptions,
    fetcher: Arc<dyn Fetcher>,
    feedback: FeedbackSink,
}

impl Synchronizer {
    pub fn new(options: SyncOptions, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            options,
            fetcher,
            feedback: feedback::discard(),
        }
    }

    pub fn with_feedback(mut self, sink: FeedbackSink) -> Self {
        self.feedback = sink;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Resolve the work list for `records` and split it into batches.
    pub fn plan(&self, records: Vec<CatalogRecord>) -> Vec<Batch> {
        let items = if self.options.force {
            resolve_all(records)
        } else {
            resolve_pending(records, &self.options.asset_root)
        };
        into_batches(items, self.options.batch_size)
    }

    /// Run every batch in order, stopping at the first batch with a failure.
    pub async fn run(&self, records: Vec<CatalogRecord>) -> Result<SyncSummary, SyncError> {
        let span = tracing::info_span!(
            "sync",
            mode = self.options.mode.as_str(),
            fetcher = self.fetcher.label()
        );
        self.run_batches(records).instrument(span).await
    }

    async fn run_batches(&self, records: Vec<CatalogRecord>) -> Result<SyncSummary, SyncError> {
        let cataloged = records.len();
        let batches = self.plan(records);
        let pending = batches.iter().map(Batch::len).sum();
        let mut summary = SyncSummary::new(self.options.mode, cataloged, pending);

        tracing::info!(cataloged, pending, batches = batches.len(), "resolved work list");

        if pending == 0 {
            self.emit(Feedback::info(format!(
                "All {cataloged} assets already present."
            )));
            return Ok(summary);
        }

        let total = batches.len();
        let dispatcher = Dispatcher::new(Arc::clone(&self.fetcher), self.options.timeout)
            .with_feedback(Arc::clone(&self.feedback));

        for batch in &batches {
            match self.options.mode {
                Mode::Dry => {
                    for item in batch.items() {
                        self.emit(Feedback::command(self.fetcher.command_line(item)));
                    }
                    summary.fetched += batch.len();
                }
                Mode::Build => {
                    tracing::info!(
                        batch = batch.index(),
                        size = batch.len(),
                        categories = ?batch.categories(),
                        "dispatching batch"
                    );
                    self.emit(Feedback::info(format!(
                        "Fetching batch {}/{total} ({} files)...",
                        batch.index(),
                        batch.len()
                    )));
                    let outcomes = dispatcher.dispatch(batch).await?;
                    summary.fetched +=
                        check_batch(batch, &outcomes).map_err(SyncError::BatchFailed)?;
                }
            }
            summary.batches += 1;
        }

        Ok(summary)
    }

    fn emit(&self, item: Feedback) {
        (self.feedback)(item);
    }
}
