//! Filesystem-backed document resolver over stacked data packs.
//!
//! A pack is a directory laid out as
//!
//! ```text
//! <pack>/data/<namespace>/<category>/**/<name>.<ext>
//! ```
//!
//! Packs are stacked in the order given: when two packs supply the same
//! namespace and path, the later pack's file is the one that is read. Listing
//! reports each location once regardless of how many packs supply it.

use crate::loader::DataLoadError;
use armory_core::id::DocumentLocation;
use armory_core::resolver::{ResolveError, ResourceResolver};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory under a pack root holding namespaces.
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    packs: Vec<PathBuf>,
}

fn valid_namespace(name: &str) -> bool {
    !matches!(name, "" | "." | "..")
        && name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-'))
}

impl DirectoryResolver {
    /// Stack the given pack roots, lowest priority first.
    pub fn from_packs(packs: &[PathBuf]) -> Result<Self, DataLoadError> {
        for pack in packs {
            if !pack.is_dir() {
                return Err(DataLoadError::PackNotFound(pack.clone()));
            }
        }
        Ok(Self {
            packs: packs.to_vec(),
        })
    }

    pub fn packs(&self) -> &[PathBuf] {
        &self.packs
    }

    fn namespaces(pack: &Path) -> Vec<String> {
        let data = pack.join(DATA_DIR);
        let Ok(entries) = std::fs::read_dir(&data) else {
            debug!(pack = %pack.display(), "pack has no data directory");
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| {
                let ok = valid_namespace(name);
                if !ok {
                    warn!(pack = %pack.display(), name = %name, "skipping invalid namespace directory");
                }
                ok
            })
            .collect()
    }

    /// Every file under `root`, as `/`-joined paths prefixed with `category`.
    /// Symlinked directories are not descended into.
    fn walk(root: &Path, category: &str) -> Vec<String> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() || (e.path_is_symlink() && e.path().is_file()))
            .filter_map(|e| {
                let relative = e.path().strip_prefix(root).ok()?;
                let mut path = category.to_string();
                for part in relative.components() {
                    path.push('/');
                    path.push_str(part.as_os_str().to_str()?);
                }
                Some(path)
            })
            .collect()
    }

    fn file_path(pack: &Path, location: &DocumentLocation) -> Option<PathBuf> {
        if !valid_namespace(&location.namespace) {
            return None;
        }
        let relative = Path::new(&location.path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(
            pack.join(DATA_DIR)
                .join(&location.namespace)
                .join(relative),
        )
    }
}

impl ResourceResolver for DirectoryResolver {
    fn list(&self, category: &str, filter: &dyn Fn(&str) -> bool) -> Vec<DocumentLocation> {
        let mut found = BTreeSet::new();
        for pack in &self.packs {
            for namespace in Self::namespaces(pack) {
                let root = pack.join(DATA_DIR).join(&namespace).join(category);
                if !root.is_dir() {
                    continue;
                }
                for path in Self::walk(&root, category).into_iter().filter(|p| filter(p.as_str())) {
                    found.insert(DocumentLocation::new(namespace.clone(), path));
                }
            }
        }
        found.into_iter().collect()
    }

    fn open(&self, location: &DocumentLocation) -> Result<String, ResolveError> {
        for pack in self.packs.iter().rev() {
            let Some(path) = Self::file_path(pack, location) else {
                break;
            };
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|source| ResolveError::Io {
                    location: location.clone(),
                    source,
                });
            }
        }
        Err(ResolveError::NotFound(location.clone()))
    }
}
