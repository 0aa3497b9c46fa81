use std::fmt;
use std::path::PathBuf;

use crate::batch::Batch;
use crate::catalog::{Category, RepoId, distinct_categories};
use crate::fetch::{FetchFailure, FetchOutcome};

/// One item of a batch that did not fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub category: Category,
    pub target_path: PathBuf,
    pub repo: RepoId,
    pub reason: FetchFailure,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {}: {}",
            self.target_path.display(),
            self.repo,
            self.reason
        )
    }
}

/// A batch in which at least one fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchFailure {
    /// Categories with at least one failing item, in first-seen order.
    pub fn categories(&self) -> Vec<&Category> {
        distinct_categories(self.failures.iter().map(|failure| &failure.category))
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories: Vec<String> = self
            .categories()
            .iter()
            .map(|c| format!("'{c}'"))
            .collect();
        write!(
            f,
            "could not download files for {} ({} failed in batch {})",
            categories.join(", "),
            self.failures.len(),
            self.batch
        )
    }
}

/// Decide whether a run may continue past `batch`.
///
/// Returns the number of fetched items when every outcome succeeded, or the
/// failing items otherwise. `outcomes` must line up with `batch.items()`.
pub fn check_batch(batch: &Batch, outcomes: &[FetchOutcome]) -> Result<usize, BatchFailure> {
    debug_assert_eq!(batch.len(), outcomes.len());

    let failures: Vec<ItemFailure> = batch
        .items()
        .iter()
        .zip(outcomes)
        .filter_map(|(item, outcome)| {
            outcome.failure().map(|reason| ItemFailure {
                category: item.record.category.clone(),
                target_path: item.record.target_path.clone(),
                repo: item.record.repo.clone(),
                reason: reason.clone(),
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(outcomes.len())
    } else {
        for failure in &failures {
            tracing::warn!(batch = batch.index(), "fetch failed: {failure}");
        }
        Err(BatchFailure {
            batch: batch.index(),
            failures,
        })
    }
}
