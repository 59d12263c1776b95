pub mod registry;

pub use registry::{validate_file_name, DownloadStatus, ModelRegistry, MODEL_EXTENSION};
