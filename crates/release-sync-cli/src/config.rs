use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use release_sync::Category;
use serde::{Deserialize, Serialize};

/// Project-level config file, looked up under the working root.
pub const CONFIG_FILE_NAME: &str = "release-sync.toml";

/// Owner of the per-paper repositories when none is configured.
pub const DEFAULT_OWNER: &str = "rutar-academic";

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding one `<category>.json` catalog per category.
    pub data_dir: PathBuf,
    /// Root of the local asset tree.
    pub asset_root: PathBuf,
    pub categories: Vec<String>,
    /// Owner prefixed to repository names that do not carry one. An empty
    /// string turns prefixing off.
    pub owner: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub fetch: FetchConfig,
}

/// How release assets are downloaded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub program: PathBuf,
    pub pattern: String,
    pub clobber: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            asset_root: PathBuf::from("static"),
            categories: vec!["papers".into(), "notes".into()],
            owner: Some(DEFAULT_OWNER.into()),
            batch_size: release_sync::DEFAULT_BATCH_SIZE.get(),
            timeout_secs: release_sync::DEFAULT_TIMEOUT.as_secs(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gh"),
            pattern: release_sync_gh::DEFAULT_PATTERN.into(),
            clobber: true,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub batch_size: Option<NonZeroUsize>,
    pub timeout_secs: Option<u64>,
    pub force: bool,
}

/// Fully resolved settings for one run. Paths are anchored at the working root.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub asset_root: PathBuf,
    pub categories: Vec<Category>,
    pub owner: Option<String>,
    pub batch_size: NonZeroUsize,
    pub timeout: Duration,
    pub fetch: FetchConfig,
    pub force: bool,
}

impl AppConfig {
    pub fn resolve(self, root: &Path, overrides: Overrides) -> Result<Settings> {
        let batch_size = match overrides.batch_size {
            Some(size) => size,
            None => NonZeroUsize::new(self.batch_size).context("batch_size must be at least 1")?,
        };

        let timeout_secs = overrides.timeout_secs.unwrap_or(self.timeout_secs);
        if timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }

        if self.categories.is_empty() {
            bail!("no categories configured");
        }

        Ok(Settings {
            data_dir: root.join(self.data_dir),
            asset_root: root.join(self.asset_root),
            categories: self.categories.into_iter().map(Category::new).collect(),
            owner: self.owner.filter(|o| !o.trim().is_empty()),
            batch_size,
            timeout: Duration::from_secs(timeout_secs),
            fetch: self.fetch,
            force: overrides.force,
        })
    }
}

/// User-level config path: `~/.config/release-sync/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("release-sync").join("config.toml"))
}

/// Load configuration.
///
/// An explicit path or a `release-sync.toml` under `root` must parse. The
/// user-level file falls back to defaults with a warning, and defaults apply
/// when no file exists at all.
pub fn load_config(explicit: Option<&Path>, root: &Path) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let project = root.join(CONFIG_FILE_NAME);
    if project.exists() {
        return read_config(&project);
    }

    if let Some(path) = user_config_path()
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => return Ok(config),
            Err(e) => eprintln!(
                "warning: failed to parse config at {}, using defaults: {e}",
                path.display()
            ),
        }
    }

    Ok(AppConfig::default())
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use release_sync::{CatalogReader, WorkItem};
    use release_sync_gh::{GhReleaseConfig, GhReleaseFetcher};

    use super::*;

    #[test]
    fn defaults_match_the_site_layout() {
        let config = AppConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.asset_root, PathBuf::from("static"));
        assert_eq!(config.categories, vec!["papers", "notes"]);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.fetch.program, PathBuf::from("gh"));
        assert_eq!(config.fetch.pattern, "*.pdf");
        assert!(config.fetch.clobber);
        assert_eq!(config.owner.as_deref(), Some(DEFAULT_OWNER));
    }

    #[test]
    fn default_settings_download_from_owner_qualified_repos() {
        let settings = AppConfig::default()
            .resolve(Path::new("/site"), Overrides::default())
            .unwrap();
        let records = CatalogReader::new(settings.owner.clone())
            .parse(
                &settings.categories[0],
                r#"[{"links": {"pdf": "papers/dimension.pdf"}}]"#,
            )
            .unwrap();
        let item = WorkItem {
            position: 0,
            record: records[0].clone(),
        };

        let fetcher = GhReleaseFetcher::new(GhReleaseConfig::new(&settings.asset_root));
        let args = fetcher.args(&item);
        let repo = args.iter().position(|a| a == "--repo").unwrap() + 1;
        assert_eq!(args[repo], "rutar-academic/dimension");
    }

    #[test]
    fn empty_owner_disables_prefixing() {
        let config: AppConfig = toml::from_str("owner = \"\"\n").unwrap();
        let settings = config.resolve(Path::new("."), Overrides::default()).unwrap();
        assert_eq!(settings.owner, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
owner = "rutar-academic"
batch_size = 4
"#,
        )
        .unwrap();
        assert_eq!(config.owner.as_deref(), Some("rutar-academic"));
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.categories, vec!["papers", "notes"]);
    }

    #[test]
    fn parse_fetch_table() {
        let config: AppConfig = toml::from_str(
            r#"
categories = ["papers", "notes", "talks"]

[fetch]
program = "/usr/local/bin/gh"
pattern = "*-final.pdf"
clobber = false
"#,
        )
        .unwrap();
        assert_eq!(config.categories.len(), 3);
        assert_eq!(config.fetch.program, PathBuf::from("/usr/local/bin/gh"));
        assert_eq!(config.fetch.pattern, "*-final.pdf");
        assert!(!config.fetch.clobber);
    }

    #[test]
    fn resolve_anchors_paths_and_applies_overrides() {
        let settings = AppConfig::default()
            .resolve(
                Path::new("/site"),
                Overrides {
                    batch_size: NonZeroUsize::new(2),
                    timeout_secs: Some(30),
                    force: true,
                },
            )
            .unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/site/data"));
        assert_eq!(settings.asset_root, PathBuf::from("/site/static"));
        assert_eq!(settings.batch_size.get(), 2);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.force);
        assert_eq!(settings.categories[1].as_str(), "notes");
    }

    #[test]
    fn resolve_rejects_zero_batch_size_and_timeout() {
        let config = AppConfig {
            batch_size: 0,
            ..AppConfig::default()
        };
        assert!(config.resolve(Path::new("."), Overrides::default()).is_err());

        let overrides = Overrides {
            timeout_secs: Some(0),
            ..Overrides::default()
        };
        assert!(
            AppConfig::default()
                .resolve(Path::new("."), overrides)
                .is_err()
        );
    }

    #[test]
    fn resolve_rejects_empty_categories() {
        let config = AppConfig {
            categories: vec![],
            ..AppConfig::default()
        };
        assert!(config.resolve(Path::new("."), Overrides::default()).is_err());
    }

    #[test]
    fn project_config_is_preferred_and_must_parse() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "batch_size = 3\n").unwrap();
        let config = load_config(None, root.path()).unwrap();
        assert_eq!(config.batch_size, 3);

        std::fs::write(root.path().join(CONFIG_FILE_NAME), "batch_size = \"many\"\n").unwrap();
        assert!(load_config(None, root.path()).is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing.toml");
        assert!(load_config(Some(&missing), root.path()).is_err());
    }
}
