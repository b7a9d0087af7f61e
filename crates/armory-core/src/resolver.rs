//! Resource enumeration capability.
//!
//! The loader never touches a filesystem directly; it asks a
//! [`ResourceResolver`] to list candidate documents under a category and to
//! open one by its [`DocumentLocation`]. `armory-data` supplies a
//! directory-backed implementation; [`MemoryResolver`] serves embedded
//! content and tests.

use crate::id::DocumentLocation;
use std::collections::BTreeMap;

/// Errors raised while opening a document.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("document not found: {0}")]
    NotFound(DocumentLocation),

    #[error("failed to read {location}: {source}")]
    Io {
        location: DocumentLocation,
        #[source]
        source: std::io::Error,
    },
}

/// Lists and opens documents across all configured namespaces.
pub trait ResourceResolver: Sync {
    /// Every document under `category/` in any namespace whose path
    /// satisfies `filter`. The order is unspecified; the loader sorts.
    fn list(&self, category: &str, filter: &dyn Fn(&str) -> bool) -> Vec<DocumentLocation>;

    /// Read a document's text.
    fn open(&self, location: &DocumentLocation) -> Result<String, ResolveError>;
}

/// A resolver over documents held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    documents: BTreeMap<DocumentLocation, String>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a document at `namespace:path`.
    pub fn insert(
        &mut self,
        namespace: &str,
        path: &str,
        text: impl Into<String>,
    ) -> &mut Self {
        self.documents
            .insert(DocumentLocation::new(namespace, path), text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl ResourceResolver for MemoryResolver {
    fn list(&self, category: &str, filter: &dyn Fn(&str) -> bool) -> Vec<DocumentLocation> {
        let prefix = format!("{category}/");
        self.documents
            .keys()
            .filter(|loc| loc.path.starts_with(&prefix) && filter(&loc.path))
            .cloned()
            .collect()
    }

    fn open(&self, location: &DocumentLocation) -> Result<String, ResolveError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(location.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filters_by_category_and_predicate() {
        let mut resolver = MemoryResolver::new();
        resolver
            .insert("armory", "guns/pistol.json", "{}")
            .insert("armory", "guns/rifle.json", "{}")
            .insert("armory", "ammo/pistol.json", "{}");

        let all = resolver.list("guns", &|_| true);
        assert_eq!(all.len(), 2);

        let pistols = resolver.list("guns", &|p| p.ends_with("pistol.json"));
        assert_eq!(pistols, vec![DocumentLocation::new("armory", "guns/pistol.json")]);
    }

    #[test]
    fn category_prefix_is_a_whole_segment() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("armory", "gunsmith/pistol.json", "{}");
        assert!(resolver.list("guns", &|_| true).is_empty());
    }

    #[test]
    fn open_missing_document() {
        let resolver = MemoryResolver::new();
        let loc = DocumentLocation::new("armory", "guns/none.json");
        assert!(matches!(resolver.open(&loc), Err(ResolveError::NotFound(_))));
    }

    #[test]
    fn insert_replaces_text() {
        let mut resolver = MemoryResolver::new();
        resolver.insert("a", "guns/x.json", "1").insert("a", "guns/x.json", "2");
        assert_eq!(resolver.len(), 1);
        let text = resolver.open(&DocumentLocation::new("a", "guns/x.json")).unwrap();
        assert_eq!(text, "2");
    }
}
