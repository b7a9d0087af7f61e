//! The two halves of a reload cycle.
//!
//! [`prepare`] does all the work that can fail and touches nothing shared.
//! [`apply`] publishes the result. Hosts that schedule reloads themselves call
//! the two separately; [`GunManager::reload`](crate::manager::GunManager::reload)
//! runs them back to back.

use crate::config::ManagerConfig;
use crate::gun::GunConfig;
use crate::id::EntityId;
use crate::loader::{self, LoadDiagnostic, LoadOutput};
use crate::registry::{EntityCatalog, PublishReport, Registry, SnapshotOrigin};
use crate::resolver::ResourceResolver;
use crate::schema::{self, ValidationError};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Records ready to publish, one per known gun.
#[derive(Debug, Default)]
pub struct Prepared {
    pub records: BTreeMap<EntityId, GunConfig>,
    /// Ids whose record is the default because no candidate both parsed and
    /// validated.
    pub defaulted: Vec<EntityId>,
    /// Every candidate that parsed but failed validation, in precedence order.
    pub invalid: Vec<(EntityId, ValidationError)>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

/// Summary of a completed reload.
#[derive(Debug)]
pub struct ReloadReport {
    pub publish: PublishReport,
    /// Guns configured from a document.
    pub loaded: usize,
    pub defaulted: Vec<EntityId>,
    pub invalid: Vec<(EntityId, ValidationError)>,
    pub diagnostics: Vec<LoadDiagnostic>,
}

/// Load and validate a record for every gun the catalog knows.
pub fn prepare(
    catalog: &dyn EntityCatalog,
    resolver: &dyn ResourceResolver,
    config: &ManagerConfig,
) -> Prepared {
    let known = catalog.known_ids();
    let LoadOutput {
        mut drafts,
        diagnostics,
    } = loader::load(&known, resolver, config);

    let mut prepared = Prepared {
        diagnostics,
        ..Prepared::default()
    };
    for id in known {
        let mut chosen = None;
        for draft in drafts.remove(&id).unwrap_or_default() {
            match schema::validate(&draft) {
                Ok(gun) => {
                    debug!(id = %id, location = %draft.source, "selected gun document");
                    chosen = Some(gun);
                    break;
                }
                Err(err) => {
                    warn!(
                        id = %id,
                        location = %draft.source,
                        error = %err,
                        "gun document failed validation, trying next candidate"
                    );
                    prepared.invalid.push((id.clone(), err));
                }
            }
        }
        let gun = chosen.unwrap_or_else(|| {
            debug!(id = %id, "no valid gun document, using default gun data");
            prepared.defaulted.push(id.clone());
            GunConfig::default()
        });
        prepared.records.insert(id, gun);
    }
    prepared
}

/// Publish prepared records as the registry's new local snapshot.
pub fn apply(prepared: Prepared, registry: &Registry, catalog: &dyn EntityCatalog) -> ReloadReport {
    let Prepared {
        records,
        defaulted,
        invalid,
        diagnostics,
    } = prepared;

    let loaded = records.len() - defaulted.len();
    let publish = registry.publish(records, SnapshotOrigin::Local, catalog);
    info!(
        generation = publish.generation,
        loaded,
        defaulted = defaulted.len(),
        skipped_documents = diagnostics.len(),
        "gun reload complete"
    );
    ReloadReport {
        publish,
        loaded,
        defaulted,
        invalid,
        diagnostics,
    }
}
