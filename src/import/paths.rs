//! Media path discovery and filename validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::OpenLabelError;

/// Strips the final extension from a name: `dir/img_01.png` -> `dir/img_01`.
pub fn to_stem(name: &str) -> String {
    Path::new(name)
        .with_extension("")
        .to_string_lossy()
        .into_owned()
}

fn basename(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

/// Maps extension-less media names to absolute media paths.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaPathMap {
    paths: BTreeMap<String, PathBuf>,
}

impl MediaPathMap {
    /// Loads a map from a media directory or a JSON manifest. A path that
    /// does not exist yields an empty map.
    pub fn load(data_path: &Path) -> Result<Self, OpenLabelError> {
        if data_path.is_dir() {
            Self::from_dir(data_path)
        } else if data_path.is_file() {
            Self::from_manifest(data_path)
        } else {
            log::debug!("no media found at {}", data_path.display());
            Ok(Self::default())
        }
    }

    /// Walks `dir` recursively; every file maps its relative path without
    /// extension to its absolute path.
    pub fn from_dir(dir: &Path) -> Result<Self, OpenLabelError> {
        let root = absolute(dir)?;
        let mut paths = BTreeMap::new();

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|source| OpenLabelError::Discovery {
                path: root.clone(),
                message: format!("failed while traversing directory: {source}"),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let key = to_stem(&relative.to_string_lossy());
            paths.insert(key, entry.path().to_path_buf());
        }

        Ok(Self { paths })
    }

    /// Reads a `{"name": "path"}` manifest. Keys lose their extension;
    /// relative paths resolve against the manifest's directory.
    pub fn from_manifest(manifest: &Path) -> Result<Self, OpenLabelError> {
        let text = fs::read_to_string(manifest)?;
        let value: Value =
            serde_json::from_str(&text).map_err(|source| OpenLabelError::ManifestParse {
                path: manifest.to_path_buf(),
                source,
            })?;
        let base = absolute(manifest.parent().unwrap_or_else(|| Path::new(".")))?;

        let Some(entries) = value.as_object() else {
            return Err(OpenLabelError::Discovery {
                path: manifest.to_path_buf(),
                message: "manifest must be a JSON object of name -> path".to_string(),
            });
        };

        let paths = entries
            .iter()
            .filter_map(|(name, path)| {
                let path = Path::new(path.as_str()?);
                Some((to_stem(name), base.join(path)))
            })
            .collect();

        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains_stem(&self, stem: &str) -> bool {
        self.paths.contains_key(stem)
    }

    /// True if `filename` is a file on disk or its stem (or its basename's
    /// stem) is a known media name.
    pub fn accepts(&self, filename: &str) -> bool {
        Path::new(filename).is_file()
            || self.contains_stem(&to_stem(filename))
            || self.contains_stem(&to_stem(basename(filename)))
    }

    /// Media path for a validated filename: the file itself if it exists,
    /// else the entry for its stem, else the entry for its basename's stem.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let direct = Path::new(filename);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        self.paths
            .get(&to_stem(filename))
            .or_else(|| self.paths.get(&to_stem(basename(filename))))
            .cloned()
    }
}

/// Keeps the potential filenames the path map accepts, deduplicated and
/// sorted.
pub fn validate_filenames<S: AsRef<str>>(potential: &[S], paths: &MediaPathMap) -> Vec<String> {
    let unique: BTreeSet<&str> = potential.iter().map(AsRef::as_ref).collect();
    unique
        .into_iter()
        .filter(|name| paths.accepts(name))
        .map(str::to_string)
        .collect()
}

fn absolute(path: &Path) -> Result<PathBuf, OpenLabelError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
