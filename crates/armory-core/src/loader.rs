//! Candidate discovery, override precedence, and document parsing.
//!
//! For each known gun id the loader collects every document across all
//! namespaces whose path below the category, minus its extension, is exactly
//! the id's path. It orders the candidates by precedence and parses each of
//! them. Parsed documents are handed on in precedence order so that a later
//! document can stand in for an earlier one that fails validation. Parse
//! failures are recorded as diagnostics and never abort the load.
//!
//! Precedence, highest first:
//!
//! 1. any namespace other than the built-in one
//! 2. namespace name, ascending
//! 3. document path, ascending
//!
//! All candidates for an id are gathered before precedence is decided, so the
//! outcome does not depend on how ids are scheduled across threads.

use crate::config::ManagerConfig;
use crate::document::{self, DocumentError, Format};
use crate::field_bag::FieldBag;
use crate::id::{DocumentLocation, EntityId};
use crate::resolver::{ResolveError, ResourceResolver};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A parsed but not yet validated document for one gun.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    pub id: EntityId,
    /// The document this draft was parsed from.
    pub source: DocumentLocation,
    pub bag: FieldBag,
}

/// Why a candidate document was skipped.
#[derive(Debug, thiserror::Error)]
pub enum LoadIssue {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A skipped candidate, kept for reporting.
#[derive(Debug)]
pub struct LoadDiagnostic {
    pub id: EntityId,
    pub location: DocumentLocation,
    pub issue: LoadIssue,
}

/// Result of one load pass.
#[derive(Debug, Default)]
pub struct LoadOutput {
    /// Parsed drafts per id, highest precedence first. Ids without any
    /// parseable candidate are absent.
    pub drafts: BTreeMap<EntityId, Vec<DraftRecord>>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

fn precedence(a: &DocumentLocation, b: &DocumentLocation, builtin: &str) -> Ordering {
    (a.namespace == builtin)
        .cmp(&(b.namespace == builtin))
        .then_with(|| a.namespace.cmp(&b.namespace))
        .then_with(|| a.path.cmp(&b.path))
}

/// All documents that could configure `id`, highest precedence first.
///
/// A document only qualifies when its whole path below the category matches
/// the id's path. `mod:guns/pistol.json` qualifies for `x:pistol`, while
/// `mod:guns/mypistol.json` and `mod:guns/rifle/pistol.json` do not; the
/// latter configures `x:rifle/pistol`.
pub fn candidates(
    id: &EntityId,
    resolver: &dyn ResourceResolver,
    config: &ManagerConfig,
) -> Vec<DocumentLocation> {
    let suffixes: Vec<String> = config
        .extensions
        .iter()
        .map(|ext| format!("{}.{ext}", id.path()))
        .collect();

    let mut found = resolver.list(&config.category, &|path: &str| {
        suffixes.iter().any(|s| path.ends_with(s.as_str()))
    });

    found.retain(|loc| {
        let Some(ext) = loc.extension() else {
            return false;
        };
        let stem = loc
            .path
            .strip_prefix(config.category.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_suffix(ext))
            .and_then(|rest| rest.strip_suffix('.'));
        stem == Some(id.path()) && config.extensions.iter().any(|e| e == ext)
    });
    found.sort_by(|a, b| precedence(a, b, &config.builtin_namespace));
    found.dedup();
    found
}

fn read_candidate(
    resolver: &dyn ResourceResolver,
    location: &DocumentLocation,
) -> Result<FieldBag, LoadIssue> {
    let ext = location.extension().unwrap_or_default();
    let format = Format::from_extension(ext)
        .ok_or_else(|| DocumentError::UnsupportedFormat(location.to_string()))?;
    let text = resolver.open(location)?;
    Ok(document::parse_document(&text, format)?)
}

/// Parse every candidate for a single id, keeping precedence order.
pub fn load_one(
    id: &EntityId,
    resolver: &dyn ResourceResolver,
    config: &ManagerConfig,
) -> (Vec<DraftRecord>, Vec<LoadDiagnostic>) {
    let mut drafts = Vec::new();
    let mut diagnostics = Vec::new();
    for location in candidates(id, resolver, config) {
        match read_candidate(resolver, &location) {
            Ok(bag) => {
                debug!(id = %id, location = %location, "parsed gun document");
                drafts.push(DraftRecord {
                    id: id.clone(),
                    source: location,
                    bag,
                });
            }
            Err(issue) => {
                error!(id = %id, location = %location, error = %issue, "couldn't parse gun document");
                diagnostics.push(LoadDiagnostic {
                    id: id.clone(),
                    location,
                    issue,
                });
            }
        }
    }
    (drafts, diagnostics)
}

/// Load drafts for every known id. Ids without any parseable candidate are
/// absent from the output; the caller substitutes defaults.
pub fn load(
    known_ids: &BTreeSet<EntityId>,
    resolver: &dyn ResourceResolver,
    config: &ManagerConfig,
) -> LoadOutput {
    #[cfg(feature = "parallel")]
    let results: Vec<_> = known_ids
        .par_iter()
        .map(|id| load_one(id, resolver, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = known_ids
        .iter()
        .map(|id| load_one(id, resolver, config))
        .collect();

    let mut output = LoadOutput::default();
    for (id, (drafts, diagnostics)) in known_ids.iter().zip(results) {
        if !drafts.is_empty() {
            output.drafts.insert(id.clone(), drafts);
        }
        output.diagnostics.extend(diagnostics);
    }
    output
}
