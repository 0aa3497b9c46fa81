use release_sync::{BatchFailure, Mode, SyncSummary};

pub fn summary_line(summary: &SyncSummary) -> String {
    match summary.mode {
        Mode::Build => format!(
            "Fetched {} of {} cataloged assets in {} {}.",
            summary.fetched,
            summary.cataloged,
            summary.batches,
            plural(summary.batches, "batch", "batches")
        ),
        Mode::Dry => format!(
            "Dry run: {} {} in {} {} would be issued ({} cataloged).",
            summary.fetched,
            plural(summary.fetched, "download", "downloads"),
            summary.batches,
            plural(summary.batches, "batch", "batches"),
            summary.cataloged
        ),
    }
}

/// One line per failing item, tagged with its category.
pub fn failure_lines(failure: &BatchFailure) -> Vec<String> {
    failure
        .failures
        .iter()
        .map(|item| format!("[{}] {item}", item.category))
        .collect()
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
