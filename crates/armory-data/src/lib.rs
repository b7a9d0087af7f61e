//! Filesystem data packs for the armory gun registry.
//!
//! [`DirectoryResolver`] serves gun documents from stacked pack directories,
//! and [`load_manager_config`] reads a manager configuration in RON, JSON, or
//! TOML.

pub mod loader;
pub mod resolver;

pub use loader::{DataLoadError, load_config_from_dir, load_manager_config};
pub use resolver::DirectoryResolver;
