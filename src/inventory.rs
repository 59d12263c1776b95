use crate::artifact::ArtifactId;
use crate::error::FilesystemError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifacts present in a local directory, recognized by file extension.
///
/// Nothing is cached: every call lists the directory again, so the
/// filesystem stays the single source of truth.
#[derive(Debug, Clone)]
pub struct LocalInventory {
    dir: PathBuf,
    extension: String,
}

impl LocalInventory {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// IDs of every artifact currently on disk
    #[must_use]
    pub fn ids(&self) -> BTreeSet<ArtifactId> {
        self.files().into_iter().map(|(id, _)| id).collect()
    }

    /// Local path for an ID, whether or not the file exists
    #[must_use]
    pub fn path_for(&self, id: &ArtifactId) -> PathBuf {
        self.dir.join(id.file_name(&self.extension))
    }

    #[must_use]
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.path_for(id).is_file()
    }

    /// Matching files with their IDs. A missing or unreadable directory lists as empty.
    #[must_use]
    pub fn files(&self) -> Vec<(ArtifactId, PathBuf)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not list {}: {e}", self.dir.display());
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.is_empty() {
                    files.push((ArtifactId::from(stem), path));
                }
            }
        }

        files.sort();
        files
    }
}

/// Create a directory and its parents if absent
pub fn ensure_directory(path: &Path) -> Result<(), FilesystemError> {
    if path.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|e| {
        tracing::error!("Error creating directory {}: {e}", path.display());
        FilesystemError::from_io(path, e)
    })?;

    tracing::info!("Created '{}' directory", path.display());
    Ok(())
}
