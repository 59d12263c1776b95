use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for docshelf
#[derive(Error, Debug)]
pub enum DocshelfError {
    #[error("Catalog query error: {0}")]
    Query(#[from] QueryError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository {url} not found (HTTP {status})\n\nTroubleshooting:\n- Check the repository name, e.g. mlabonne/NeuralBeagle14-7B-GGUF\n- Open the URL in a browser to confirm it is public")]
    RepoNotFound { url: String, status: u16 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/docshelf/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),
}

/// Errors raised while querying the remote catalog feed
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Response is not a valid catalog feed: {0}")]
    Unparseable(String),

    #[error("Network error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Try increasing catalog.timeout_secs in config")]
    Network(String),
}

/// Errors for a single artifact transfer
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error for {url}: {detail}")]
    Network { url: String, detail: String },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Failed writing {}: {detail}", .path.display())]
    Io { path: PathBuf, detail: String },

    #[error("Transfer task for {url} did not complete: {detail}")]
    Interrupted { url: String, detail: String },
}

impl TransferError {
    /// Classify a reqwest failure for the given URL
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                detail: err.to_string(),
            }
        }
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Local filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Permission denied: {}\n\nTroubleshooting:\n- Check ownership of the directory\n- Point storage.papers_dir / storage.models_dir at a writable location", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("No such file or directory: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("IO failure on {}: {source}", .path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FilesystemError {
    /// Attach a path to an IO error and classify it
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::IoFailure { path, source: err },
        }
    }
}

/// Input validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid filename '{name}': expected a plain file name ending in '.{expected}'")]
    InvalidFilename { name: String, expected: String },

    #[error("Invalid ID '{id}': expected a plain name without path separators")]
    InvalidId { id: String },
}

pub type Result<T> = std::result::Result<T, DocshelfError>;
