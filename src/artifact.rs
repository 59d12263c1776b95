use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a paper (catalog-assigned) or a model file (name without extension).
///
/// The ID is the only key used for dedup and for naming the local file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this artifact under the given extension
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.0)
    }

    /// Check that the ID names a single file inside its directory.
    ///
    /// Rejects empty IDs, path separators and the `.`/`..` components.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let id = self.0.as_str();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(ValidationError::InvalidId { id: id.to_string() });
        }
        Ok(())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ArtifactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
