use std::path::Path;

use crate::catalog::CatalogRecord;

/// A catalog record scheduled for fetching in the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position of the record in the flattened catalog.
    pub position: usize,
    pub record: CatalogRecord,
}

/// Keep the records whose target file is absent under `asset_root`, in
/// catalog order.
///
/// Presence is an existence check only. A zero-byte or truncated file counts
/// as synchronized and will not be fetched again; delete it to force a
/// refetch.
pub fn resolve_pending(records: Vec<CatalogRecord>, asset_root: &Path) -> Vec<WorkItem> {
    records
        .into_iter()
        .enumerate()
        .filter(|(_, record)| !record.local_path(asset_root).exists())
        .map(|(position, record)| WorkItem { position, record })
        .collect()
}

/// Schedule every record, present or not.
pub fn resolve_all(records: Vec<CatalogRecord>) -> Vec<WorkItem> {
    records
        .into_iter()
        .enumerate()
        .map(|(position, record)| WorkItem { position, record })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::catalog::{Category, RepoId};

    use super::*;

    fn record(path: &str) -> CatalogRecord {
        let target_path = PathBuf::from(path);
        let stem = target_path.file_stem().unwrap().to_str().unwrap().to_owned();
        CatalogRecord {
            category: Category::new(path.split('/').next().unwrap()),
            title: None,
            target_path,
            repo: RepoId::new(stem),
        }
    }

    #[test]
    fn keeps_only_absent_records_in_order() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("papers")).unwrap();
        std::fs::write(root.path().join("papers/b.pdf"), b"%PDF").unwrap();

        let pending = resolve_pending(
            vec![
                record("papers/a.pdf"),
                record("papers/b.pdf"),
                record("notes/c.pdf"),
            ],
            root.path(),
        );

        let paths: Vec<_> = pending
            .iter()
            .map(|item| item.record.target_path.clone())
            .collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("papers/a.pdf"), PathBuf::from("notes/c.pdf")]
        );
        assert_eq!(pending[0].position, 0);
        assert_eq!(pending[1].position, 2);
    }

    #[test]
    fn zero_byte_stub_counts_as_present() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("papers")).unwrap();
        std::fs::write(root.path().join("papers/stub.pdf"), b"").unwrap();

        let pending = resolve_pending(vec![record("papers/stub.pdf")], root.path());
        assert!(pending.is_empty());
    }

    #[test]
    fn resolve_all_ignores_local_state() {
        let items = resolve_all(vec![record("papers/a.pdf"), record("notes/b.pdf")]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].position, 1);
    }
}
