use std::sync::Arc;

use anyhow::Result;
use release_sync::{
    CatalogReader, CatalogRecord, Feedback, FeedbackSink, Fetcher, Mode, SyncError, SyncOptions,
    SyncSummary, Synchronizer, sources_in,
};
use release_sync_gh::{GhReleaseConfig, GhReleaseFetcher};

use super::format;
use crate::config::Settings;

/// Print a feedback item: commands and progress to stdout, problems to stderr.
pub fn print_feedback(item: &Feedback) {
    match item {
        Feedback::Command(_) | Feedback::Info(_) => println!("{item}"),
        Feedback::Warning(_) | Feedback::Error(_) => eprintln!("{item}"),
    }
}

pub fn terminal_sink() -> FeedbackSink {
    Arc::new(|item: Feedback| print_feedback(&item))
}

/// Load the catalogs and synchronize them with `gh release download`.
pub async fn run(settings: &Settings, mode: Mode) -> Result<SyncSummary> {
    let sources = sources_in(&settings.data_dir, &settings.categories);
    let records = CatalogReader::new(settings.owner.clone()).read(&sources)?;

    let fetcher = GhReleaseFetcher::new(GhReleaseConfig {
        program: settings.fetch.program.clone(),
        pattern: settings.fetch.pattern.clone(),
        asset_root: settings.asset_root.clone(),
        clobber: settings.fetch.clobber,
    });

    run_with(settings, mode, records, Arc::new(fetcher), terminal_sink()).await
}

/// Synchronize `records` using `fetcher`, reporting through `sink`.
pub async fn run_with(
    settings: &Settings,
    mode: Mode,
    records: Vec<CatalogRecord>,
    fetcher: Arc<dyn Fetcher>,
    sink: FeedbackSink,
) -> Result<SyncSummary> {
    let options = SyncOptions {
        asset_root: settings.asset_root.clone(),
        batch_size: settings.batch_size,
        timeout: settings.timeout,
        mode,
        force: settings.force,
    };
    let synchronizer = Synchronizer::new(options, fetcher).with_feedback(Arc::clone(&sink));

    match synchronizer.run(records).await {
        Ok(summary) => {
            if summary.pending > 0 {
                sink(Feedback::info(format::summary_line(&summary)));
            }
            Ok(summary)
        }
        Err(SyncError::BatchFailed(failure)) => {
            for line in format::failure_lines(&failure) {
                sink(Feedback::error(line));
            }
            Err(anyhow::anyhow!("{failure}"))
        }
        Err(e) => Err(e.into()),
    }
}
