//! Authoritative-side gun manager.

use crate::config::ManagerConfig;
use crate::registry::{EntityCatalog, Registry, Snapshot, SnapshotOrigin};
use crate::reload::{self, ReloadReport};
use crate::resolver::ResourceResolver;
use crate::wire;
use parking_lot::Mutex;
use std::sync::Arc;

/// Owns the local registry and runs reload cycles against it.
///
/// Reloads on one manager are serialized; snapshot reads never block.
#[derive(Debug)]
pub struct GunManager {
    config: ManagerConfig,
    registry: Registry,
    reload_lock: Mutex<()>,
}

impl GunManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            registry: Registry::new(SnapshotOrigin::Local),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Run a full load, validate, publish cycle.
    pub fn reload(
        &self,
        catalog: &dyn EntityCatalog,
        resolver: &dyn ResourceResolver,
    ) -> ReloadReport {
        let _guard = self.reload_lock.lock();
        let prepared = reload::prepare(catalog, resolver, &self.config);
        reload::apply(prepared, &self.registry, catalog)
    }

    /// The active snapshot of registered guns.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.registry.get()
    }

    /// Encode every registered gun for replication.
    pub fn write_registered_guns(&self) -> Vec<u8> {
        wire::encode_snapshot(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn reload_replaces_snapshot() {
        let (catalog, _) = catalog_with(&["armory:pistol"]);
        let manager = GunManager::new(ManagerConfig::default());
        assert!(manager.snapshot().is_empty());

        let mut resolver = crate::resolver::MemoryResolver::new();
        resolver.insert("armory", "guns/pistol.json", r#"{"damage": 2}"#);
        manager.reload(&catalog, &resolver);
        assert_eq!(manager.snapshot().get(&id("armory:pistol")).unwrap().damage, 2.0);

        resolver.insert("armory", "guns/pistol.json", r#"{"damage": 3}"#);
        let report = manager.reload(&catalog, &resolver);
        assert_eq!(report.publish.generation, 2);
        assert_eq!(manager.snapshot().get(&id("armory:pistol")).unwrap().damage, 3.0);
    }

    #[test]
    fn written_guns_decode_to_snapshot() {
        let (catalog, _) = catalog_with(&["armory:pistol", "armory:rifle"]);
        let manager = GunManager::new(ManagerConfig::default());
        manager.reload(&catalog, &populated_resolver());

        let bytes = manager.write_registered_guns();
        let batch = wire::decode_snapshot(&bytes, manager.config().max_sync_entries).unwrap();
        let snap = manager.snapshot();
        assert_eq!(batch.len(), snap.len());
        for (id, gun) in snap.iter() {
            assert_eq!(batch.get(id), Some(gun.as_ref()));
        }
    }

    #[test]
    fn empty_manager_writes_zero_count() {
        let manager = GunManager::new(ManagerConfig::default());
        assert_eq!(manager.write_registered_guns(), vec![0]);
    }
}
