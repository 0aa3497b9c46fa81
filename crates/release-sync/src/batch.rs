use std::num::NonZeroUsize;

use crate::catalog::{Category, distinct_categories};
use crate::pending::WorkItem;

/// Upper bound on concurrent fetches when none is configured.
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(8) {
    Some(size) => size,
    None => panic!("default batch size must be non-zero"),
};

/// A contiguous group of work items fetched concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    items: Vec<WorkItem>,
}

impl Batch {
    /// 1-based position of this batch in the run.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct categories in this batch, in first-seen order.
    pub fn categories(&self) -> Vec<&Category> {
        distinct_categories(self.items.iter().map(|item| &item.record.category))
    }
}

/// Split `items` into batches of at most `size`, preserving order.
/// Yields `ceil(items.len() / size)` batches; the last one may be short.
pub fn into_batches(items: Vec<WorkItem>, size: NonZeroUsize) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(size.get()));
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<WorkItem> = items.by_ref().take(size.get()).collect();
        batches.push(Batch {
            index: batches.len() + 1,
            items: chunk,
        });
    }

    batches
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::catalog::{CatalogRecord, RepoId};

    use super::*;

    fn items(count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| {
                let category = if i % 2 == 0 { "papers" } else { "notes" };
                WorkItem {
                    position: i,
                    record: CatalogRecord {
                        category: Category::new(category),
                        title: None,
                        target_path: PathBuf::from(format!("{category}/item-{i}.pdf")),
                        repo: RepoId::new(format!("item-{i}")),
                    },
                }
            })
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn batch_count_is_ceiling_and_sizes_are_bounded() {
        for (n, b) in [(0, 8), (1, 8), (3, 8), (8, 8), (9, 8), (20, 8), (20, 1), (7, 3)] {
            let batches = into_batches(items(n), size(b));
            assert_eq!(batches.len(), n.div_ceil(b), "n={n} b={b}");
            assert!(batches.iter().all(|batch| batch.len() <= b && !batch.is_empty()));
            assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), n);
        }
    }

    #[test]
    fn twenty_items_split_eight_eight_four() {
        let batches = into_batches(items(20), DEFAULT_BATCH_SIZE);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![8, 8, 4]);
        let indices: Vec<usize> = batches.iter().map(Batch::index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn order_is_preserved_across_batches() {
        let batches = into_batches(items(10), size(4));
        let positions: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.items().iter().map(|item| item.position))
            .collect();
        assert_eq!(positions, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn categories_are_deduplicated_in_order() {
        let batches = into_batches(items(4), size(4));
        let names: Vec<&str> = batches[0]
            .categories()
            .into_iter()
            .map(Category::as_str)
            .collect();
        assert_eq!(names, vec!["papers", "notes"]);
    }
}
