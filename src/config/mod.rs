//! Configuration module for docshelf
//!
//! Loads config from `$XDG_CONFIG_HOME/docshelf/config.toml` or `~/.config/docshelf/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use docshelf::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Papers directory: {}", config.storage.papers_dir.display());
//! println!("Concurrent transfers: {}", config.transfer.max_concurrent);
//! ```

pub mod schema;

pub use schema::Config;
