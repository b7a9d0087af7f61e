//! Immutable snapshots and atomic publication.
//!
//! A [`Snapshot`] is frozen at construction; there is no `&mut self` method
//! on it. The [`Registry`] holds the active snapshot behind an `ArcSwap`, so
//! publishing is a single pointer swap and readers see either the old
//! snapshot or the new one, never a mix.
//!
//! Publishing also attaches each record to its [`EntityHandle`]. That
//! attachment is the only way a handle's gun changes; code outside this
//! crate can read it but not write it.

use crate::gun::GunConfig;
use crate::id::EntityId;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

// ===========================================================================
// Entity handles
// ===========================================================================

/// The runtime object a gun configuration is attached to.
///
/// Holds at most one configuration at a time; the latest attachment wins.
#[derive(Debug)]
pub struct EntityHandle {
    id: EntityId,
    slot: ArcSwapOption<GunConfig>,
}

impl EntityHandle {
    pub fn new(id: EntityId) -> Arc<Self> {
        Arc::new(Self {
            id,
            slot: ArcSwapOption::empty(),
        })
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The configuration currently attached, if any. Registry-controlled:
    /// change the document, not this value.
    pub fn gun(&self) -> Option<Arc<GunConfig>> {
        self.slot.load_full()
    }

    pub(crate) fn attach(&self, gun: Arc<GunConfig>) {
        self.slot.store(Some(gun));
    }
}

/// The catalog of guns that exist, owned by the host.
pub trait EntityCatalog: Sync {
    /// Every gun id that should end up with a configuration.
    fn known_ids(&self) -> BTreeSet<EntityId>;

    /// The live handle for an id, if the id is a known gun.
    fn resolve(&self, id: &EntityId) -> Option<Arc<EntityHandle>>;
}

/// A catalog backed by an in-memory map of handles.
#[derive(Debug, Default)]
pub struct HandleCatalog {
    handles: BTreeMap<EntityId, Arc<EntityHandle>>,
}

impl HandleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gun and return its handle. Registering an id twice returns
    /// the existing handle.
    pub fn register(&mut self, id: EntityId) -> Arc<EntityHandle> {
        self.handles
            .entry(id.clone())
            .or_insert_with(|| EntityHandle::new(id))
            .clone()
    }

    /// Register an extra id that resolves to an existing handle.
    pub fn alias(&mut self, alias: EntityId, handle: Arc<EntityHandle>) {
        self.handles.insert(alias, handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl EntityCatalog for HandleCatalog {
    fn known_ids(&self) -> BTreeSet<EntityId> {
        self.handles.keys().cloned().collect()
    }

    fn resolve(&self, id: &EntityId) -> Option<Arc<EntityHandle>> {
        self.handles.get(id).cloned()
    }
}

// ===========================================================================
// Snapshot
// ===========================================================================

/// Where a snapshot's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Loaded from local documents by a reload cycle.
    Local,
    /// Received from the authoritative side.
    Remote,
}

/// Immutable mapping from gun id to configuration.
#[derive(Debug)]
pub struct Snapshot {
    guns: BTreeMap<EntityId, Arc<GunConfig>>,
    origin: SnapshotOrigin,
    generation: u64,
}

impl Snapshot {
    /// An empty snapshot, the state before the first publish.
    pub fn empty(origin: SnapshotOrigin) -> Self {
        Self {
            guns: BTreeMap::new(),
            origin,
            generation: 0,
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&Arc<GunConfig>> {
        self.guns.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.guns.contains_key(id)
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Arc<GunConfig>)> {
        self.guns.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.guns.keys()
    }

    pub fn len(&self) -> usize {
        self.guns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guns.is_empty()
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    /// Increments on every publish to the same registry; 0 before any.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ===========================================================================
// Registry
// ===========================================================================

/// Outcome of a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub generation: u64,
    pub published: usize,
    /// Records attached to a live handle.
    pub attached: usize,
    /// Ids with no handle. Their records stay in the snapshot for
    /// distribution but are attached to nothing.
    pub unattached: Vec<EntityId>,
}

/// Holder of the active snapshot.
#[derive(Debug)]
pub struct Registry {
    current: ArcSwap<Snapshot>,
    generation: AtomicU64,
}

impl Registry {
    pub fn new(origin: SnapshotOrigin) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty(origin)),
            generation: AtomicU64::new(0),
        }
    }

    /// The active snapshot. Readers hold an `Arc`, so a snapshot outlives
    /// any publish that replaces it.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Build a snapshot from `records`, attach each record to its handle,
    /// and make the snapshot active in one swap.
    pub fn publish(
        &self,
        records: BTreeMap<EntityId, GunConfig>,
        origin: SnapshotOrigin,
        catalog: &dyn EntityCatalog,
    ) -> PublishReport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let guns: BTreeMap<EntityId, Arc<GunConfig>> = records
            .into_iter()
            .map(|(id, gun)| (id, Arc::new(gun)))
            .collect();

        let mut report = PublishReport {
            generation,
            published: guns.len(),
            ..PublishReport::default()
        };
        for (id, gun) in &guns {
            match catalog.resolve(id) {
                Some(handle) => {
                    handle.attach(Arc::clone(gun));
                    report.attached += 1;
                }
                None => {
                    debug!(id = %id, "no handle for published gun");
                    report.unattached.push(id.clone());
                }
            }
        }

        self.install(guns, origin, generation);
        info!(
            generation,
            published = report.published,
            attached = report.attached,
            "published gun snapshot"
        );
        report
    }

    /// Swap in records whose handles the caller has already attached.
    pub(crate) fn install_attached(
        &self,
        guns: BTreeMap<EntityId, Arc<GunConfig>>,
        origin: SnapshotOrigin,
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.install(guns, origin, generation);
        generation
    }

    fn install(&self, guns: BTreeMap<EntityId, Arc<GunConfig>>, origin: SnapshotOrigin, generation: u64) {
        self.current.store(Arc::new(Snapshot {
            guns,
            origin,
            generation,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn new_registry_is_empty() {
        let registry = Registry::new(SnapshotOrigin::Local);
        let snap = registry.get();
        assert!(snap.is_empty());
        assert_eq!(snap.generation(), 0);
        assert_eq!(snap.origin(), SnapshotOrigin::Local);
    }

    #[test]
    fn publish_replaces_snapshot_and_attaches() {
        let (catalog, handles) = catalog_with(&["armory:pistol", "armory:rifle"]);
        let registry = Registry::new(SnapshotOrigin::Local);

        let mut records = BTreeMap::new();
        records.insert(id("armory:pistol"), gun_with_damage(3.0));
        records.insert(id("armory:rifle"), gun_with_damage(9.0));
        let report = registry.publish(records, SnapshotOrigin::Local, &catalog);

        assert_eq!(report.generation, 1);
        assert_eq!(report.published, 2);
        assert_eq!(report.attached, 2);
        assert!(report.unattached.is_empty());

        let snap = registry.get();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get(&id("armory:rifle")).unwrap().damage, 9.0);
        assert_eq!(handles[0].gun().unwrap().damage, 3.0);
        // The handle shares the snapshot's record.
        assert!(Arc::ptr_eq(
            &handles[1].gun().unwrap(),
            snap.get(&id("armory:rifle")).unwrap()
        ));
    }

    #[test]
    fn unresolvable_id_stays_in_snapshot() {
        let (catalog, _) = catalog_with(&["armory:pistol"]);
        let registry = Registry::new(SnapshotOrigin::Local);
        let mut records = BTreeMap::new();
        records.insert(id("armory:pistol"), GunConfig::default());
        records.insert(id("other:ghost"), GunConfig::default());

        let report = registry.publish(records, SnapshotOrigin::Local, &catalog);
        assert_eq!(report.attached, 1);
        assert_eq!(report.unattached, vec![id("other:ghost")]);
        assert!(registry.get().contains(&id("other:ghost")));
    }

    #[test]
    fn old_snapshot_survives_publish() {
        let (catalog, _) = catalog_with(&["armory:pistol"]);
        let registry = Registry::new(SnapshotOrigin::Local);
        let mut first = BTreeMap::new();
        first.insert(id("armory:pistol"), gun_with_damage(1.0));
        registry.publish(first, SnapshotOrigin::Local, &catalog);
        let held = registry.get();

        let mut second = BTreeMap::new();
        second.insert(id("armory:pistol"), gun_with_damage(2.0));
        registry.publish(second, SnapshotOrigin::Local, &catalog);

        assert_eq!(held.get(&id("armory:pistol")).unwrap().damage, 1.0);
        assert_eq!(held.generation(), 1);
        assert_eq!(registry.get().get(&id("armory:pistol")).unwrap().damage, 2.0);
        assert_eq!(registry.get().generation(), 2);
    }

    #[test]
    fn handle_attachment_is_last_write_wins() {
        let handle = EntityHandle::new(id("armory:pistol"));
        assert!(handle.gun().is_none());
        handle.attach(Arc::new(gun_with_damage(1.0)));
        handle.attach(Arc::new(gun_with_damage(2.0)));
        assert_eq!(handle.gun().unwrap().damage, 2.0);
    }

    #[test]
    fn catalog_register_is_idempotent() {
        let mut catalog = HandleCatalog::new();
        let a = catalog.register(id("armory:pistol"));
        let b = catalog.register(id("armory:pistol"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_mixed_snapshots() {
        use std::sync::atomic::AtomicBool;

        let old_ids = ["old:a", "old:b", "old:c", "old:d"];
        let new_ids = ["new:a", "new:b", "new:c", "new:d"];
        let catalog = HandleCatalog::new();
        let registry = Registry::new(SnapshotOrigin::Local);
        let done = AtomicBool::new(false);

        let records = |names: &[&str]| -> BTreeMap<EntityId, GunConfig> {
            names.iter().map(|n| (id(n), GunConfig::default())).collect()
        };

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while !done.load(Ordering::Relaxed) {
                        let snap = registry.get();
                        let old = snap.ids().filter(|i| i.namespace() == "old").count();
                        let new = snap.ids().filter(|i| i.namespace() == "new").count();
                        assert!(
                            (old == 0 || new == 0),
                            "mixed snapshot: {old} old and {new} new ids"
                        );
                        assert!(snap.is_empty() || snap.len() == 4);
                    }
                });
            }
            for i in 0..500 {
                let names = if i % 2 == 0 { &old_ids } else { &new_ids };
                registry.publish(records(&names[..]), SnapshotOrigin::Local, &catalog);
            }
            done.store(true, Ordering::Relaxed);
        });
    }
}
