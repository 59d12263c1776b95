use crate::artifact::ArtifactId;
use crate::config::Config;
use crate::error::{DocshelfError, FilesystemError, Result, TransferError, ValidationError};
use crate::inventory::{ensure_directory, LocalInventory};
use crate::report::Report;
use crate::transfer::{self, format_bytes, Progress};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MODEL_EXTENSION: &str = "gguf";

/// Outcome of a model download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// A file with the same name was already present; nothing was transferred
    AlreadyPresent { path: PathBuf },
    Downloaded { path: PathBuf, bytes: u64 },
}

impl DownloadStatus {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::AlreadyPresent { path } | Self::Downloaded { path, .. } => path,
        }
    }

    #[must_use]
    pub fn report(&self) -> Report {
        match self {
            Self::AlreadyPresent { path } => Report::info(format!(
                "Selected model already downloaded: {}",
                path.display()
            )),
            Self::Downloaded { path, bytes } => Report::info(format!(
                "Downloaded {} to {}",
                format_bytes(*bytes),
                path.display()
            )),
        }
    }
}

/// Local store of GGUF model weights fetched from a model hub
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    inventory: LocalInventory,
    http: reqwest::Client,
    hub_host: String,
    probe_timeout: Duration,
}

impl ModelRegistry {
    /// Create new registry from config.
    ///
    /// Fails if the models directory cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let dir = &config.storage.models_dir;
        ensure_directory(dir)?;

        // Weights run to gigabytes, so only connecting is time-boxed
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.transfer.connect_timeout_secs))
            .build()
            .map_err(|e| DocshelfError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inventory: LocalInventory::new(dir.clone(), MODEL_EXTENSION),
            http,
            hub_host: config.models.hub_host.trim_end_matches('/').to_string(),
            probe_timeout: Duration::from_secs(config.models.probe_timeout_secs),
        })
    }

    #[must_use]
    pub fn models_dir(&self) -> &Path {
        self.inventory.dir()
    }

    /// Installed models, name (without extension) to path
    #[must_use]
    pub fn list_available(&self) -> BTreeMap<String, PathBuf> {
        self.inventory
            .files()
            .into_iter()
            .map(|(id, path)| (id.to_string(), path))
            .collect()
    }

    /// Remove an installed model. `name` may include the `.gguf` extension.
    pub fn delete(&self, name: &str) -> Result<PathBuf> {
        let stem = name
            .strip_suffix(&format!(".{MODEL_EXTENSION}"))
            .unwrap_or(name);
        let id = ArtifactId::from(stem);
        id.validate()?;
        let path = self.inventory.path_for(&id);

        if !path.is_file() {
            tracing::error!("File to delete {} not found.", path.display());
            return Err(DocshelfError::NotFound(format!(
                "Model file {}",
                path.display()
            )));
        }

        fs::remove_file(&path).map_err(|e| FilesystemError::from_io(&path, e))?;
        tracing::info!("File {} deleted", path.display());
        Ok(path)
    }

    #[must_use]
    pub fn repo_url(&self, repo: &str) -> String {
        format!("{}/{}", self.hub_host, repo.trim_matches('/'))
    }

    #[must_use]
    pub fn file_url(&self, repo: &str, file_name: &str) -> String {
        format!("{}/resolve/main/{file_name}", self.repo_url(repo))
    }

    /// Download `file_name` from a hub repository into the models directory.
    ///
    /// Steps run in order: validate the name, return
    /// [`DownloadStatus::AlreadyPresent`] if the model is installed, check
    /// that the repository exists, then stream the file. An installed model
    /// therefore needs no network at all. `on_progress` runs after every
    /// received chunk.
    #[tracing::instrument(skip(self, on_progress))]
    pub async fn download<F>(
        &self,
        repo: &str,
        file_name: &str,
        on_progress: F,
    ) -> Result<DownloadStatus>
    where
        F: FnMut(Progress),
    {
        let id = validate_file_name(file_name)?;

        if self.list_available().contains_key(id.as_str()) {
            let path = self.inventory.path_for(&id);
            tracing::info!("Selected model already downloaded");
            return Ok(DownloadStatus::AlreadyPresent { path });
        }

        self.probe_repo(repo).await?;

        let url = self.file_url(repo, file_name);
        let dest = self.inventory.path_for(&id);
        tracing::info!("Download for {url} submitted. It may take a while");

        match transfer::download(&self.http, &url, &dest, on_progress).await {
            Ok(bytes) => {
                tracing::info!("File {url} downloaded to folder {}", self.models_dir().display());
                Ok(DownloadStatus::Downloaded { path: dest, bytes })
            }
            Err(e) => {
                tracing::error!(
                    "Error downloading the file: {e}. If the problem persists, please download manually and move under {}",
                    self.models_dir().display()
                );
                Err(e.into())
            }
        }
    }

    async fn probe_repo(&self, repo: &str) -> Result<()> {
        let url = self.repo_url(repo);
        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Repo url {url} not found.");
            return Err(DocshelfError::RepoNotFound {
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

/// Check that `file_name` is a plain `.gguf` file name and return its model ID
pub fn validate_file_name(file_name: &str) -> std::result::Result<ArtifactId, ValidationError> {
    let invalid = || ValidationError::InvalidFilename {
        name: file_name.to_string(),
        expected: MODEL_EXTENSION.to_string(),
    };

    if file_name.contains(['/', '\\']) || file_name.contains("..") {
        return Err(invalid());
    }

    match file_name.strip_suffix(&format!(".{MODEL_EXTENSION}")) {
        Some(stem) if !stem.is_empty() => Ok(ArtifactId::from(stem)),
        _ => Err(invalid()),
    }
}
