use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::timestamp_prefix;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to create asset directory {}: {source}", path.display())]
    DirectoryError { path: PathBuf, source: io::Error },
    #[error("Failed to write asset {}: {source}", path.display())]
    WriteError { path: PathBuf, source: io::Error },
    #[error("Failed to list asset directory {}: {source}", path.display())]
    ListError { path: PathBuf, source: io::Error },
}

/// Path of a stored asset, held by records as a weak reference.
///
/// Nothing ties the file's lifetime to the records pointing at it; a
/// reference may dangle, in which case resolving it yields `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// The asset's path if it still exists as a file
    pub fn resolve(&self) -> Option<&Path> {
        let path = self.path();
        path.is_file().then_some(path)
    }

    /// The asset's bytes, or `None` when missing or unreadable
    pub fn read(&self) -> Option<Vec<u8>> {
        match fs::read(self.path()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(asset = %self.0, error = %e, "asset not readable");
                None
            }
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binary uploads kept in a single content directory
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store `bytes` as `<YYYYmmddHHMMSS>_<original name>` using the local clock
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<AssetRef, AssetError> {
        self.save_at(Local::now().naive_local(), original_name, bytes)
    }

    /// Store `bytes` under a name stamped with `at`.
    ///
    /// Two saves of the same original name within one second map to the
    /// same file; the later write wins.
    pub fn save_at(
        &self,
        at: NaiveDateTime,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<AssetRef, AssetError> {
        fs::create_dir_all(&self.dir).map_err(|source| AssetError::DirectoryError {
            path: self.dir.clone(),
            source,
        })?;

        let name = format!("{}_{}", timestamp_prefix(at), sanitize_file_name(original_name));
        let path = self.dir.join(name);
        if path.exists() {
            warn!(path = %path.display(), "asset name collision, overwriting");
        }
        fs::write(&path, bytes).map_err(|source| AssetError::WriteError {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes = bytes.len(), "saved asset");
        Ok(AssetRef::new(path.to_string_lossy()))
    }

    /// Every file in the directory, most recently modified first
    pub fn list_all(&self) -> Result<Vec<PathBuf>, AssetError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(AssetError::ListError {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.path()))
            })
            .collect();

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Remove every entry in the directory, nested directories and links
    /// included. Failures are logged and skipped. Returns how many top-level
    /// entries were removed.
    pub fn delete_all(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "cannot read asset directory");
                }
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            // file_type does not follow symlinks, so a link is removed, not its target
            let result = match entry.file_type() {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                Ok(_) => fs::remove_file(&path),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete asset"),
            }
        }
        info!(dir = %self.dir.display(), removed, "deleted assets");
        removed
    }
}

/// Reduce an uploaded file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
