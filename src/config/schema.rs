use crate::error::{DocshelfError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StorageConfig {
    #[serde(default = "default_papers_dir")]
    pub papers_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CatalogConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_pdf_host")]
    pub pdf_host: String,
    #[serde(default = "default_query_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TransferConfig {
    /// Upper bound on simultaneous paper transfers; 0 disables the bound
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_transfer_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ModelsConfig {
    #[serde(default = "default_hub_host")]
    pub hub_host: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_repo")]
    pub default_repo: String,
    #[serde(default = "default_file")]
    pub default_file: String,
}

// Default value functions
fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docshelf")
}
fn default_papers_dir() -> PathBuf {
    data_dir().join("papers")
}
fn default_models_dir() -> PathBuf {
    data_dir().join("models")
}
fn default_endpoint() -> String {
    "http://export.arxiv.org/api/query".to_string()
}
fn default_pdf_host() -> String {
    "http://arxiv.org/pdf".to_string()
}
const fn default_query_timeout_secs() -> u64 {
    120
}
const fn default_max_concurrent() -> usize {
    8
}
const fn default_transfer_timeout_secs() -> u64 {
    60
}
const fn default_connect_timeout_secs() -> u64 {
    30
}
fn default_hub_host() -> String {
    "https://huggingface.co".to_string()
}
const fn default_probe_timeout_secs() -> u64 {
    60
}
fn default_repo() -> String {
    "mlabonne/NeuralBeagle14-7B-GGUF".to_string()
}
fn default_file() -> String {
    "neuralbeagle14-7b.Q5_K_M.gguf".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            papers_dir: default_papers_dir(),
            models_dir: default_models_dir(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            pdf_host: default_pdf_host(),
            timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_transfer_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            hub_host: default_hub_host(),
            probe_timeout_secs: default_probe_timeout_secs(),
            default_repo: default_repo(),
            default_file: default_file(),
        }
    }
}

impl Config {
    /// Load config from the user config directory, or defaults if there is no file
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DocshelfError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&content)
            .map_err(|e| DocshelfError::Config(format!("Failed to parse {}: {e}", path.display())))
    }
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| DocshelfError::Config("HOME env var not set".to_string()))?;
        PathBuf::from(home).join(".config")
    };

    Ok(config_dir.join("docshelf").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catalog.endpoint, "http://export.arxiv.org/api/query");
        assert_eq!(config.catalog.pdf_host, "http://arxiv.org/pdf");
        assert_eq!(config.catalog.timeout_secs, 120);
        assert_eq!(config.transfer.max_concurrent, 8);
        assert_eq!(config.models.hub_host, "https://huggingface.co");
        assert!(config.storage.papers_dir.ends_with("docshelf/papers"));
        assert!(config.storage.models_dir.ends_with("docshelf/models"));
    }

    #[test]
    fn test_partial_config_merges_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[transfer]\nmax_concurrent = 2\n\n[storage]\npapers_dir = \"/srv/papers\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.transfer.max_concurrent, 2);
        assert_eq!(config.transfer.timeout_secs, 60);
        assert_eq!(config.storage.papers_dir, PathBuf::from("/srv/papers"));
        assert!(config.storage.models_dir.ends_with("docshelf/models"));
        assert_eq!(config.models.default_file, "neuralbeagle14-7b.Q5_K_M.gguf");
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[transfer]\nmax_concurrent = \"many\"\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(DocshelfError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_load_uses_xdg_config_home() {
        let temp_dir = TempDir::new().unwrap();
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

        // No file yet: defaults
        let config = Config::load().unwrap();
        assert_eq!(config.transfer.max_concurrent, 8);

        let dir = temp_dir.path().join("docshelf");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "[catalog]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load().unwrap();
        assert_eq!(config.catalog.timeout_secs, 5);

        // Restore original env var
        if let Some(val) = original {
            std::env::set_var("XDG_CONFIG_HOME", val);
        } else {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }
}
