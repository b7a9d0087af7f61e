//! Namespaced gun identifiers and document locations.
//!
//! An [`EntityId`] is written `namespace:path` and names one gun. A
//! [`DocumentLocation`] names one document a resolver can open; it is not
//! validated, so resolvers check it before touching storage.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors produced when parsing a namespaced identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier '{0}' is missing the ':' namespace separator")]
    MissingSeparator(String),
    #[error("identifier '{0}' has an empty namespace or path")]
    Empty(String),
    #[error("invalid character {ch:?} in identifier '{id}'")]
    InvalidChar { id: String, ch: char },
}

fn valid_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn valid_path_char(c: char) -> bool {
    valid_namespace_char(c) || c == '/'
}

/// Identifies a gun. Used both as a resource lookup key and as a registry key.
///
/// Ordered by namespace, then path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    namespace: String,
    path: String,
}

impl EntityId {
    /// Build an id from its parts, checking the allowed character sets.
    pub fn new(namespace: &str, path: &str) -> Result<Self, IdError> {
        let display = format!("{namespace}:{path}");
        if namespace.is_empty() || path.is_empty() {
            return Err(IdError::Empty(display));
        }
        if let Some(ch) = namespace.chars().find(|c| !valid_namespace_char(*c)) {
            return Err(IdError::InvalidChar { id: display, ch });
        }
        if let Some(ch) = path.chars().find(|c| !valid_path_char(*c)) {
            return Err(IdError::InvalidChar { id: display, ch });
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Build an id from literals known to be well-formed.
    pub(crate) fn from_static(namespace: &'static str, path: &'static str) -> Self {
        debug_assert!(Self::new(namespace, path).is_ok());
        Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for EntityId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, path) = s
            .split_once(':')
            .ok_or_else(|| IdError::MissingSeparator(s.to_string()))?;
        Self::new(namespace, path)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A handle to one resource document, e.g. `mod:guns/rifle/pistol.json`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentLocation {
    pub namespace: String,
    pub path: String,
}

impl DocumentLocation {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// The final path segment without its extension (`pistol` for
    /// `guns/rifle/pistol.json`).
    pub fn file_stem(&self) -> &str {
        let file = self.file_name();
        match file.rfind('.') {
            Some(dot) if dot > 0 => &file[..dot],
            _ => file,
        }
    }

    /// The final path segment including its extension.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The extension of the final path segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let file = self.file_name();
        match file.rfind('.') {
            Some(dot) if dot > 0 => Some(&file[dot + 1..]),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}
