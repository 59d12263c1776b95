use super::{BatchResult, DeleteOutcome, FetchOutcome};
use crate::artifact::ArtifactId;
use crate::catalog::{Catalog, CatalogClient};
use crate::config::Config;
use crate::error::{DocshelfError, FilesystemError, Result, TransferError};
use crate::inventory::{ensure_directory, LocalInventory};
use crate::transfer::{self, format_bytes};
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const PAPER_EXTENSION: &str = "pdf";

/// Downloads papers into a local directory, fetching only what is missing
#[derive(Debug, Clone)]
pub struct AcquisitionManager {
    catalog: CatalogClient,
    inventory: LocalInventory,
    http: reqwest::Client,
    max_concurrent: usize,
}

impl AcquisitionManager {
    /// Create new manager from config.
    ///
    /// Fails if the papers directory cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        let dir = &config.storage.papers_dir;
        ensure_directory(dir)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.transfer.timeout_secs))
            .connect_timeout(Duration::from_secs(config.transfer.connect_timeout_secs))
            .build()
            .map_err(|e| DocshelfError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            catalog: CatalogClient::new(&config.catalog)?,
            inventory: LocalInventory::new(dir.clone(), PAPER_EXTENSION),
            http,
            max_concurrent: config.transfer.max_concurrent,
        })
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    #[must_use]
    pub const fn inventory(&self) -> &LocalInventory {
        &self.inventory
    }

    /// Search the remote catalog by keyword
    pub async fn query_catalog(
        &self,
        keyword: Option<&str>,
        start_index: u32,
        max_results: u32,
    ) -> Result<Catalog> {
        Ok(self
            .catalog
            .query_by_keyword(keyword, start_index, max_results)
            .await?)
    }

    /// IDs of papers already downloaded
    #[must_use]
    pub fn list_local(&self) -> BTreeSet<ArtifactId> {
        self.inventory.ids()
    }

    /// Catalog metadata for the papers already downloaded
    pub async fn local_catalog(&self) -> Result<Catalog> {
        let local = self.list_local();
        Ok(self.catalog.query_by_ids(&local).await?)
    }

    /// Download every requested paper that is not already on disk.
    ///
    /// Individual failures are reported in the returned [`BatchResult`];
    /// only an unusable destination directory fails the whole call. IDs that
    /// are not plain file names end as [`FetchOutcome::Rejected`].
    #[tracing::instrument(skip_all, fields(dir = %self.inventory.dir().display()))]
    pub async fn fetch_missing<I>(&self, requested: I) -> Result<BatchResult>
    where
        I: IntoIterator<Item = ArtifactId>,
    {
        let requested: BTreeSet<ArtifactId> = requested.into_iter().collect();
        ensure_directory(self.inventory.dir())?;

        // Single snapshot for the whole batch
        let local = self.inventory.ids();
        let (skipped, attempted): (BTreeSet<_>, BTreeSet<_>) =
            requested.iter().cloned().partition(|id| local.contains(id));

        if attempted.is_empty() {
            tracing::info!("All {} requested papers already downloaded", requested.len());
            return Ok(BatchResult {
                requested,
                skipped,
                attempted,
                outcomes: BTreeMap::new(),
            });
        }

        // Path-like IDs never reach the filesystem or the network
        let mut outcomes = BTreeMap::new();
        let mut valid = Vec::with_capacity(attempted.len());
        for id in &attempted {
            match id.validate() {
                Ok(()) => valid.push(id),
                Err(e) => {
                    tracing::error!("Skipping paper: {e}");
                    outcomes.insert(id.clone(), FetchOutcome::Rejected(e));
                }
            }
        }

        tracing::info!(
            "Downloading {} papers ({} already present, {} rejected)",
            valid.len(),
            skipped.len(),
            outcomes.len()
        );
        let started = Instant::now();

        let limit = if self.max_concurrent == 0 {
            valid.len()
        } else {
            self.max_concurrent
        };
        let permits = Arc::new(Semaphore::new(limit.min(Semaphore::MAX_PERMITS)));

        let handles: Vec<_> = valid
            .into_iter()
            .map(|id| {
                let url = self.catalog.pdf_url(id);
                let dest = self.inventory.path_for(id);
                let http = self.http.clone();
                let permits = Arc::clone(&permits);
                let task_url = url.clone();

                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    fetch_one(&http, &task_url, dest).await
                });
                (id.clone(), url, handle)
            })
            .collect();

        outcomes.extend(
            join_all(handles.into_iter().map(|(id, url, handle)| async move {
                let outcome = handle.await.unwrap_or_else(|e| {
                    FetchOutcome::Failed(TransferError::Interrupted {
                        url,
                        detail: e.to_string(),
                    })
                });
                (id, outcome)
            }))
            .await,
        );

        let result = BatchResult {
            requested,
            skipped,
            attempted,
            outcomes,
        };

        tracing::info!(
            "Approx total bytes downloaded {} ({} ok, {} failed) in {:.2}s",
            format_bytes(result.total_bytes()),
            result.succeeded().len(),
            result.failed().len(),
            started.elapsed().as_secs_f64()
        );

        Ok(result)
    }

    /// Delete the given papers. Missing IDs are reported, not treated as errors.
    pub fn delete<'a, I>(&self, ids: I) -> BTreeMap<ArtifactId, DeleteOutcome>
    where
        I: IntoIterator<Item = &'a ArtifactId>,
    {
        let local = self.inventory.ids();

        ids.into_iter()
            .map(|id| {
                let outcome = if local.contains(id) {
                    remove_paper(id, &self.inventory.path_for(id))
                } else {
                    tracing::error!("Can not delete {id} as not downloaded.");
                    DeleteOutcome::NotFound
                };
                (id.clone(), outcome)
            })
            .collect()
    }

    /// Delete every downloaded paper.
    ///
    /// Keeps going past files that cannot be removed; each one is reported
    /// as [`DeleteOutcome::Failed`].
    pub fn delete_all(&self) -> BTreeMap<ArtifactId, DeleteOutcome> {
        let outcomes = remove_files(self.inventory.files());

        let removed = outcomes
            .values()
            .filter(|o| matches!(o, DeleteOutcome::Deleted))
            .count();
        tracing::info!(
            "Removed {removed} of {} papers from {}",
            outcomes.len(),
            self.inventory.dir().display()
        );
        outcomes
    }
}

fn remove_files(files: Vec<(ArtifactId, PathBuf)>) -> BTreeMap<ArtifactId, DeleteOutcome> {
    files
        .into_iter()
        .map(|(id, path)| {
            let outcome = remove_paper(&id, &path);
            (id, outcome)
        })
        .collect()
}

fn remove_paper(id: &ArtifactId, path: &Path) -> DeleteOutcome {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("Paper {id} deleted.");
            DeleteOutcome::Deleted
        }
        Err(e) => {
            tracing::error!("Failed to delete {}: {e}", path.display());
            DeleteOutcome::Failed(FilesystemError::from_io(path, e))
        }
    }
}

async fn fetch_one(http: &reqwest::Client, url: &str, dest: PathBuf) -> FetchOutcome {
    let outcome = FetchOutcome::from_transfer(transfer::download(http, url, &dest, |_| {}).await);

    match &outcome {
        FetchOutcome::Success(bytes) => {
            tracing::info!("Download paper {url} finished ({})", format_bytes(*bytes));
        }
        FetchOutcome::RemoteNotFound => tracing::error!("Paper {url} not found on remote"),
        FetchOutcome::Failed(e) => tracing::error!("Http can not retrieve the paper {url}: {e}"),
        FetchOutcome::Rejected(e) => tracing::error!("Paper {url} not requested: {e}"),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.storage.papers_dir = dir.join("papers");
        config.catalog.pdf_host = "http://127.0.0.1:9".to_string();
        config
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = AcquisitionManager::new(&config(temp_dir.path())).unwrap();
        assert!(manager.inventory().dir().is_dir());
        assert!(manager.list_local().is_empty());
    }

    #[test]
    fn test_new_fails_on_unusable_directory() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("papers");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let mut config = config(temp_dir.path());
        config.storage.papers_dir = blocker.join("inner");
        let result = AcquisitionManager::new(&config);
        assert!(matches!(result, Err(DocshelfError::Filesystem(_))));
    }

    #[tokio::test]
    async fn test_fetch_all_present_makes_no_requests() {
        let temp_dir = TempDir::new().unwrap();
        let manager = AcquisitionManager::new(&config(temp_dir.path())).unwrap();
        fs::write(manager.inventory().dir().join("a.pdf"), "pdf").unwrap();

        // pdf_host points at a closed port: any request would fail
        let result = manager
            .fetch_missing([ArtifactId::from("a")])
            .await
            .unwrap();
        assert_eq!(result.skipped.len(), 1);
        assert!(result.attempted.is_empty());
        assert!(result.outcomes.is_empty());
    }

    #[test]
    fn test_delete_all() {
        let temp_dir = TempDir::new().unwrap();
        let manager = AcquisitionManager::new(&config(temp_dir.path())).unwrap();
        let dir = manager.inventory().dir().to_path_buf();
        fs::write(dir.join("a.pdf"), "pdf").unwrap();
        fs::write(dir.join("b.pdf"), "pdf").unwrap();
        fs::write(dir.join("keep.txt"), "txt").unwrap();

        let outcomes = manager.delete_all();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.values().all(|o| matches!(o, DeleteOutcome::Deleted)));
        assert!(manager.list_local().is_empty());
        assert!(dir.join("keep.txt").exists());
    }

    #[test]
    fn test_remove_files_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.pdf"), "pdf").unwrap();
        fs::write(dir.join("c.pdf"), "pdf").unwrap();

        let outcomes = remove_files(vec![
            (ArtifactId::from("a"), dir.join("a.pdf")),
            (ArtifactId::from("b"), dir.join("b.pdf")),
            (ArtifactId::from("c"), dir.join("c.pdf")),
        ]);

        assert!(matches!(outcomes[&ArtifactId::from("a")], DeleteOutcome::Deleted));
        assert!(matches!(
            outcomes[&ArtifactId::from("b")],
            DeleteOutcome::Failed(FilesystemError::NotFound { .. })
        ));
        assert!(matches!(outcomes[&ArtifactId::from("c")], DeleteOutcome::Deleted));
        assert!(!dir.join("a.pdf").exists());
        assert!(!dir.join("c.pdf").exists());
    }

    #[tokio::test]
    async fn test_rejected_ids_touch_neither_disk_nor_network() {
        let temp_dir = TempDir::new().unwrap();
        let manager = AcquisitionManager::new(&config(temp_dir.path())).unwrap();

        // pdf_host points at a closed port: a request would end as Failed, not Rejected
        let result = manager
            .fetch_missing([ArtifactId::from("../escaped"), ArtifactId::from("")])
            .await
            .unwrap();

        assert_eq!(result.attempted.len(), 2);
        assert!(result
            .outcomes
            .values()
            .all(|o| matches!(o, FetchOutcome::Rejected(_))));
        assert!(!temp_dir.path().join("escaped.pdf").exists());
    }
}
