//! Dependent-side acceptance of replicated guns.
//!
//! A decoded [`GunBatch`] is only installed when every id in it resolves to a
//! live [`EntityHandle`]. Resolution happens for the whole batch before any
//! handle is touched, so a rejected batch leaves every handle, the remote
//! snapshot, and the synced list exactly as they were.

use crate::gun::GunConfig;
use crate::id::EntityId;
use crate::manager::GunManager;
use crate::registry::{EntityHandle, Registry, Snapshot, SnapshotOrigin};
use crate::wire::{self, GunBatch, WireError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("no live gun for {0}")]
    UnknownEntity(EntityId),
}

struct Accepted {
    synced: Vec<Arc<EntityHandle>>,
    guns: BTreeMap<EntityId, Arc<GunConfig>>,
}

fn accept_batch<F>(batch: &GunBatch, resolve: F) -> Result<Accepted, SyncError>
where
    F: Fn(&EntityId) -> Option<Arc<EntityHandle>>,
{
    let mut resolved = Vec::with_capacity(batch.len());
    for (id, gun) in batch.iter() {
        let handle = resolve(id).ok_or_else(|| SyncError::UnknownEntity(id.clone()))?;
        resolved.push((id, handle, gun));
    }

    let mut accepted = Accepted {
        synced: Vec::with_capacity(resolved.len()),
        guns: BTreeMap::new(),
    };
    for (id, handle, gun) in resolved {
        let gun = Arc::new(gun.clone());
        handle.attach(Arc::clone(&gun));
        accepted.guns.insert(id.clone(), gun);
        if !accepted.synced.iter().any(|h| Arc::ptr_eq(h, &handle)) {
            accepted.synced.push(handle);
        }
    }
    Ok(accepted)
}

/// Attach every gun in `batch` to the handle `resolve` returns for its id.
///
/// Returns the updated handles in batch order, each handle once even when
/// several ids resolve to it. If any id is unresolvable nothing is attached.
pub fn accept<F>(batch: &GunBatch, resolve: F) -> Result<Vec<Arc<EntityHandle>>, SyncError>
where
    F: Fn(&EntityId) -> Option<Arc<EntityHandle>>,
{
    accept_batch(batch, resolve).map(|accepted| accepted.synced)
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Anything that carries a set of replicated guns.
pub trait GunProvider {
    /// The carried guns, or `None` when there is nothing to apply.
    fn registered_guns(&self) -> Option<&GunBatch>;
}

impl GunProvider for GunBatch {
    fn registered_guns(&self) -> Option<&GunBatch> {
        Some(self)
    }
}

impl<P: GunProvider> GunProvider for Option<P> {
    fn registered_guns(&self) -> Option<&GunBatch> {
        self.as_ref().and_then(GunProvider::registered_guns)
    }
}

/// The message the authoritative side sends after every reload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateGuns {
    guns: GunBatch,
}

impl UpdateGuns {
    pub fn new(guns: GunBatch) -> Self {
        Self { guns }
    }

    /// Capture the manager's active snapshot.
    pub fn from_manager(manager: &GunManager) -> Self {
        Self::new(GunBatch::from_snapshot(&manager.snapshot()))
    }

    pub fn encode(&self) -> Vec<u8> {
        self.guns.encode()
    }

    pub fn decode(data: &[u8], max_entries: usize) -> Result<Self, WireError> {
        wire::decode_snapshot(data, max_entries).map(Self::new)
    }

    pub fn guns(&self) -> &GunBatch {
        &self.guns
    }
}

impl GunProvider for UpdateGuns {
    fn registered_guns(&self) -> Option<&GunBatch> {
        Some(&self.guns)
    }
}

// ---------------------------------------------------------------------------
// ClientGuns
// ---------------------------------------------------------------------------

/// Dependent-side state: the last accepted remote snapshot and the handles
/// it updated.
#[derive(Debug)]
pub struct ClientGuns {
    registry: Registry,
    synced: RwLock<Vec<Arc<EntityHandle>>>,
    /// Held across accept and install so overlapping updates apply whole.
    update_lock: Mutex<()>,
}

impl Default for ClientGuns {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientGuns {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(SnapshotOrigin::Remote),
            synced: RwLock::new(Vec::new()),
            update_lock: Mutex::new(()),
        }
    }

    /// Apply the guns carried by `provider`. Returns `false` when there is
    /// nothing to apply or an id does not resolve; the transport decides
    /// what to do about it.
    pub fn update_registered_guns<P, F>(&self, provider: &P, resolve: F) -> bool
    where
        P: GunProvider + ?Sized,
        F: Fn(&EntityId) -> Option<Arc<EntityHandle>>,
    {
        let Some(batch) = provider.registered_guns() else {
            warn!("gun update carried no guns");
            return false;
        };

        let _guard = self.update_lock.lock();
        match accept_batch(batch, resolve) {
            Ok(accepted) => {
                let handles = accepted.synced.len();
                let generation = self
                    .registry
                    .install_attached(accepted.guns, SnapshotOrigin::Remote);
                *self.synced.write() = accepted.synced;
                info!(generation, guns = batch.len(), handles, "accepted remote guns");
                true
            }
            Err(err) => {
                warn!(error = %err, "rejected remote guns");
                false
            }
        }
    }

    /// Handles updated by the last accepted update, in batch order.
    pub fn synced_handles(&self) -> Vec<Arc<EntityHandle>> {
        self.synced.read().clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.registry.get()
    }
}
