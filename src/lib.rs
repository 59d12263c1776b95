//! Acquisition of research artifacts for a local document assistant.
//!
//! Papers are searched in and downloaded from the arXiv catalog
//! ([`papers::AcquisitionManager`]); GGUF model weights are downloaded
//! from a model hub ([`models::ModelRegistry`]). Both keep their files in
//! flat local directories whose contents are the inventory, and never
//! fetch an artifact that is already present.

pub mod artifact;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod papers;
pub mod report;
pub mod transfer;

pub use artifact::ArtifactId;
pub use error::{DocshelfError, Result};
