//! Configuration file discovery and deserialization.
//!
//! Provides format detection (RON/JSON/TOML), config file discovery, and the
//! deserialization helper used to read a [`ManagerConfig`] from disk.

use armory_core::config::ManagerConfig;
use armory_core::document::{self, Format};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while reading data packs or their configuration.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// Extension is not one of ron, toml, json.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// The same config exists in more than one format.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed but its contents are unusable.
    #[error("invalid config in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// A pack root does not exist or is not a directory.
    #[error("pack not found: {0}")]
    PackNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Base name of a pack's optional configuration file.
pub const CONFIG_BASE_NAME: &str = "armory";

// ===========================================================================
// Format detection / discovery
// ===========================================================================

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    document::detect_format(path).map_err(|_| DataLoadError::UnsupportedFormat {
        file: path.to_path_buf(),
    })
}

/// Scan a directory for `{base_name}.ron`, `{base_name}.toml`, or
/// `{base_name}.json`. More than one is a conflict.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.is_file() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize a file in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read and check a manager configuration file.
pub fn load_manager_config(path: &Path) -> Result<ManagerConfig, DataLoadError> {
    let config: ManagerConfig = deserialize_file(path)?;
    config.validate().map_err(|e| DataLoadError::Invalid {
        file: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!(file = %path.display(), "loaded manager config");
    Ok(config)
}

/// Load `armory.{ron,toml,json}` from `dir`, or the default configuration
/// when there is none.
pub fn load_config_from_dir(dir: &Path) -> Result<ManagerConfig, DataLoadError> {
    match find_data_file(dir, CONFIG_BASE_NAME)? {
        Some(path) => load_manager_config(&path),
        None => Ok(ManagerConfig::default()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_dirs::{cleanup, make_test_dir};
    use std::fs;

    #[test]
    fn detect_format_known_and_unknown() {
        assert_eq!(detect_format(Path::new("armory.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("armory.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("armory.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("armory")).is_err());
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("armory.ron"), "()").unwrap();
        fs::write(dir.join("armory.json"), "{}").unwrap();

        let result = find_data_file(&dir, "armory");
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));

        cleanup(&dir);
    }

    #[test]
    fn config_from_each_format() {
        let dir = make_test_dir("config_formats");
        let files = [
            ("a.ron", "(builtin_namespace: \"cgm\", max_sync_entries: 7)"),
            ("b.json", r#"{"builtin_namespace": "cgm", "max_sync_entries": 7}"#),
            ("c.toml", "builtin_namespace = \"cgm\"\nmax_sync_entries = 7\n"),
        ];
        for (name, text) in files {
            let path = dir.join(name);
            fs::write(&path, text).unwrap();
            let config = load_manager_config(&path).unwrap();
            assert_eq!(config.builtin_namespace, "cgm", "{name}");
            assert_eq!(config.max_sync_entries, 7, "{name}");
            assert_eq!(config.category, "guns", "{name}");
        }

        cleanup(&dir);
    }

    #[test]
    fn invalid_config_rejected() {
        let dir = make_test_dir("config_invalid");
        let path = dir.join("armory.json");
        fs::write(&path, r#"{"extensions": []}"#).unwrap();
        assert!(matches!(
            load_manager_config(&path),
            Err(DataLoadError::Invalid { .. })
        ));

        fs::write(&path, r#"{"extensions": "#).unwrap();
        assert!(matches!(
            load_manager_config(&path),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn missing_config_file_is_default() {
        let dir = make_test_dir("config_missing");
        assert_eq!(load_config_from_dir(&dir).unwrap(), ManagerConfig::default());

        fs::write(dir.join("armory.toml"), "category = \"weapons\"\n").unwrap();
        assert_eq!(load_config_from_dir(&dir).unwrap().category, "weapons");

        cleanup(&dir);
    }

    #[test]
    fn io_error_converts() {
        let result = load_manager_config(Path::new("/definitely/not/here/armory.toml"));
        assert!(matches!(result, Err(DataLoadError::Io(_))));
    }
}
