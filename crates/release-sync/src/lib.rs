pub mod batch;
pub mod catalog;
pub mod dispatch;
pub mod feedback;
pub mod fetch;
pub mod pending;
pub mod report;
pub mod sync;

pub use batch::{Batch, DEFAULT_BATCH_SIZE, into_batches};
pub use catalog::{
    CatalogFormatError, CatalogReader, CatalogRecord, CatalogSource, Category, RepoId, sources_in,
};
pub use dispatch::{DEFAULT_TIMEOUT, DispatchError, Dispatcher};
pub use feedback::{Feedback, FeedbackSink};
pub use fetch::{FetchError, FetchFailure, FetchOutcome, Fetcher, RunningFetch};
pub use pending::{WorkItem, resolve_all, resolve_pending};
pub use report::{BatchFailure, ItemFailure, check_batch};
pub use sync::{Mode, SyncError, SyncOptions, SyncSummary, Synchronizer};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
