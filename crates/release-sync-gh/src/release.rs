use std::path::PathBuf;
use std::process::Stdio;

use release_sync::{
    FetchError, FetchFailure, FetchOutcome, Fetcher, RepoId, RunningFetch, WorkItem,
};
use tokio::process::{Child, Command};

/// Asset pattern downloaded from each release when none is configured.
pub const DEFAULT_PATTERN: &str = "*.pdf";

/// Configuration for `gh release download` fetches.
#[derive(Debug, Clone)]
pub struct GhReleaseConfig {
    /// The `gh` executable; anything accepting the same arguments works.
    pub program: PathBuf,
    /// Glob selecting which release assets to download.
    pub pattern: String,
    /// Root of the local asset tree; assets land in `<asset_root>/<category>`.
    pub asset_root: PathBuf,
    /// Overwrite same-named files left behind by an earlier attempt.
    pub clobber: bool,
}

impl GhReleaseConfig {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("gh"),
            pattern: DEFAULT_PATTERN.to_owned(),
            asset_root: asset_root.into(),
            clobber: true,
        }
    }
}

/// Downloads release assets by running one `gh` child process per item.
pub struct GhReleaseFetcher {
    config: GhReleaseConfig,
}

impl GhReleaseFetcher {
    pub fn new(config: GhReleaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GhReleaseConfig {
        &self.config
    }

    /// Arguments passed to the program for `item`.
    pub fn args(&self, item: &WorkItem) -> Vec<String> {
        let dir = item.record.category_dir(&self.config.asset_root);
        let mut args = vec![
            "release".to_owned(),
            "download".to_owned(),
            "--repo".to_owned(),
            item.record.repo.to_string(),
            "--pattern".to_owned(),
            self.config.pattern.clone(),
            "--dir".to_owned(),
            dir.to_string_lossy().into_owned(),
        ];
        if self.config.clobber {
            args.push("--clobber".to_owned());
        }
        args
    }
}

impl Fetcher for GhReleaseFetcher {
    fn label(&self) -> &str {
        "gh"
    }

    fn command_line(&self, item: &WorkItem) -> String {
        let mut words = vec![self.config.program.to_string_lossy().into_owned()];
        words.extend(self.args(item));
        shell_words::join(words)
    }

    fn start(&self, item: &WorkItem) -> Result<Box<dyn RunningFetch>, FetchError> {
        let dir = item.record.category_dir(&self.config.asset_root);
        std::fs::create_dir_all(&dir).map_err(|source| FetchError::Prepare {
            path: dir.display().to_string(),
            source,
        })?;

        let child = Command::new(&self.config.program)
            .args(self.args(item))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                program: self.config.program.display().to_string(),
                source,
            })?;

        tracing::debug!(repo = %item.record.repo, pid = ?child.id(), "spawned gh");

        Ok(Box::new(GhDownload {
            child,
            repo: item.record.repo.clone(),
            target: item.record.local_path(&self.config.asset_root),
        }))
    }
}

struct GhDownload {
    child: Child,
    repo: RepoId,
    /// `gh` exits 0 when the pattern matches assets under other names, so
    /// success also requires this file to exist.
    target: PathBuf,
}

#[async_trait::async_trait]
impl RunningFetch for GhDownload {
    async fn wait(&mut self) -> FetchOutcome {
        match self.child.wait().await {
            Ok(status) if status.success() && self.target.exists() => {
                tracing::debug!(repo = %self.repo, "download finished");
                FetchOutcome::Succeeded
            }
            Ok(status) if status.success() => {
                tracing::warn!(
                    repo = %self.repo,
                    target = %self.target.display(),
                    "download finished without writing the target"
                );
                FetchOutcome::Failed(FetchFailure::Missing {
                    path: self.target.clone(),
                })
            }
            Ok(status) => {
                tracing::warn!(repo = %self.repo, %status, "download failed");
                FetchOutcome::Failed(FetchFailure::Exited {
                    code: status.code(),
                })
            }
            Err(e) => FetchOutcome::Failed(FetchFailure::Wait(e.to_string())),
        }
    }

    async fn kill(&mut self) {
        tracing::warn!(repo = %self.repo, "killing download after timeout");
        if let Err(e) = self.child.kill().await {
            tracing::warn!(repo = %self.repo, error = %e, "failed to kill download");
        }
    }
}

#[cfg(test)]
mod tests {
    use release_sync::{CatalogRecord, Category};

    use super::*;

    fn item(repo: &str, path: &str) -> WorkItem {
        WorkItem {
            position: 0,
            record: CatalogRecord {
                category: Category::new("papers"),
                title: None,
                target_path: PathBuf::from(path),
                repo: RepoId::new(repo),
            },
        }
    }

    #[test]
    fn args_follow_release_download_layout() {
        let fetcher = GhReleaseFetcher::new(GhReleaseConfig::new("static"));
        let args = fetcher.args(&item("rutar-academic/dimension", "papers/dimension.pdf"));
        assert_eq!(
            args,
            vec![
                "release",
                "download",
                "--repo",
                "rutar-academic/dimension",
                "--pattern",
                "*.pdf",
                "--dir",
                "static/papers",
                "--clobber",
            ]
        );
    }

    #[test]
    fn clobber_can_be_disabled() {
        let config = GhReleaseConfig {
            clobber: false,
            ..GhReleaseConfig::new("static")
        };
        let args = GhReleaseFetcher::new(config).args(&item("o/r", "papers/r.pdf"));
        assert!(!args.iter().any(|a| a == "--clobber"));
    }

    #[test]
    fn command_line_quotes_the_pattern() {
        let fetcher = GhReleaseFetcher::new(GhReleaseConfig::new("static"));
        let line =
            fetcher.command_line(&item("rutar-academic/dimension", "papers/dimension.pdf"));
        assert_eq!(
            line,
            "gh release download --repo rutar-academic/dimension --pattern '*.pdf' --dir static/papers --clobber"
        );
    }
}
