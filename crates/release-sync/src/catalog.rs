use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

/// A named asset category, e.g. `papers` or `notes`.
///
/// Each category owns one catalog file and one directory under the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the remote repository holding a record's release asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId(String);

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Qualify a bare repository name with `owner`.
    /// Names that already carry an owner (`owner/name`) are kept as-is.
    pub fn qualified(name: &str, owner: Option<&str>) -> Self {
        match owner {
            Some(owner) if !name.contains('/') => Self(format!("{owner}/{name}")),
            _ => Self(name.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalog entry: a local asset and the repository its release lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub category: Category,
    pub title: Option<String>,
    /// Path relative to the asset root, always `<category>/<file>`.
    pub target_path: PathBuf,
    pub repo: RepoId,
}

impl CatalogRecord {
    /// Where the asset lives on disk.
    pub fn local_path(&self, asset_root: &Path) -> PathBuf {
        asset_root.join(&self.target_path)
    }

    /// The directory release assets for this record are downloaded into.
    pub fn category_dir(&self, asset_root: &Path) -> PathBuf {
        asset_root.join(self.category.as_str())
    }
}

/// Distinct categories in first-seen order.
pub fn distinct_categories<'a>(
    categories: impl IntoIterator<Item = &'a Category>,
) -> Vec<&'a Category> {
    let mut seen: Vec<&Category> = Vec::new();
    for category in categories {
        if !seen.contains(&category) {
            seen.push(category);
        }
    }
    seen
}

/// A catalog file for a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub category: Category,
    pub path: PathBuf,
}

/// Catalog sources laid out as `<data_dir>/<category>.json`, in category order.
pub fn sources_in(data_dir: &Path, categories: &[Category]) -> Vec<CatalogSource> {
    categories
        .iter()
        .map(|category| CatalogSource {
            category: category.clone(),
            path: data_dir.join(format!("{category}.json")),
        })
        .collect()
}

/// Errors raised while loading a catalog. Any of these aborts a run before a
/// single fetch is issued.
#[derive(Debug, thiserror::Error)]
pub enum CatalogFormatError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog for '{category}': {reason}")]
    Malformed { category: Category, reason: String },

    #[error("entry {index} in '{category}' is missing required field `{field}`")]
    MissingField {
        category: Category,
        index: usize,
        field: &'static str,
    },

    #[error("entry {index} in '{category}' has invalid pdf path '{path}': {reason}")]
    InvalidPath {
        category: Category,
        index: usize,
        path: String,
        reason: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    links: Option<RawLinks>,
    #[serde(default, alias = "database")]
    repo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLinks {
    #[serde(default)]
    pdf: Option<String>,
}

/// Loads catalog records, qualifying repository names with an optional owner.
#[derive(Debug, Clone, Default)]
pub struct CatalogReader {
    owner: Option<String>,
}

impl CatalogReader {
    pub fn new(owner: Option<String>) -> Self {
        Self { owner }
    }

    /// Read every source in order and flatten the records.
    pub fn read(&self, sources: &[CatalogSource]) -> Result<Vec<CatalogRecord>, CatalogFormatError> {
        let mut records = Vec::new();
        for source in sources {
            let contents =
                std::fs::read_to_string(&source.path).map_err(|e| CatalogFormatError::Read {
                    path: source.path.clone(),
                    source: e,
                })?;
            let parsed = self.parse(&source.category, &contents)?;
            tracing::debug!(
                category = %source.category,
                records = parsed.len(),
                path = %source.path.display(),
                "loaded catalog"
            );
            records.extend(parsed);
        }
        Ok(records)
    }

    /// Parse one category's catalog from its JSON text.
    pub fn parse(
        &self,
        category: &Category,
        contents: &str,
    ) -> Result<Vec<CatalogRecord>, CatalogFormatError> {
        let entries: Vec<RawEntry> =
            serde_json::from_str(contents).map_err(|e| CatalogFormatError::Malformed {
                category: category.clone(),
                reason: e.to_string(),
            })?;

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| self.build_record(category, index, entry))
            .collect()
    }

    fn build_record(
        &self,
        category: &Category,
        index: usize,
        entry: RawEntry,
    ) -> Result<CatalogRecord, CatalogFormatError> {
        let pdf = entry
            .links
            .and_then(|links| links.pdf)
            .filter(|pdf| !pdf.trim().is_empty())
            .ok_or_else(|| CatalogFormatError::MissingField {
                category: category.clone(),
                index,
                field: "links.pdf",
            })?;

        let invalid = |reason| CatalogFormatError::InvalidPath {
            category: category.clone(),
            index,
            path: pdf.clone(),
            reason,
        };

        let target_path = PathBuf::from(&pdf);
        if target_path.is_absolute() {
            return Err(invalid("path must be relative to the asset root"));
        }
        if !target_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid("path must not contain `.` or `..` segments"));
        }
        if target_path.parent() != Some(Path::new(category.as_str())) {
            return Err(invalid("parent directory must be the category"));
        }
        let stem = target_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("file name has no stem"))?;

        let repo_name = entry
            .repo
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(stem);

        Ok(CatalogRecord {
            category: category.clone(),
            title: entry.title,
            repo: RepoId::qualified(repo_name, self.owner.as_deref()),
            target_path,
        })
    }
}
