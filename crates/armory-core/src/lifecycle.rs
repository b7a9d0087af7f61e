//! Process-wide manager slot.
//!
//! The slot is written at exactly two points: when the host registers reload
//! listeners ([`on_add_reload_listener`]) and when the environment stops
//! ([`on_environment_stopped`]). Everything else only reads it. A host that
//! prefers to pass the manager around explicitly can ignore this module.

use crate::config::ManagerConfig;
use crate::manager::GunManager;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

static ACTIVE: RwLock<Option<Arc<GunManager>>> = parking_lot::const_rwlock(None);

/// Install a fresh manager, replacing any previous one, and return it so the
/// host can register it with its reload scheduler.
pub fn on_add_reload_listener(config: ManagerConfig) -> Arc<GunManager> {
    let manager = Arc::new(GunManager::new(config));
    let previous = ACTIVE.write().replace(Arc::clone(&manager));
    if previous.is_some() {
        debug!("replaced active gun manager");
    }
    info!("gun manager installed");
    manager
}

/// Clear the slot. Returns the manager that was active, if any.
pub fn on_environment_stopped() -> Option<Arc<GunManager>> {
    let previous = ACTIVE.write().take();
    if previous.is_some() {
        info!("gun manager cleared");
    }
    previous
}

/// The active manager. `None` before the first registration and after a stop.
pub fn current() -> Option<Arc<GunManager>> {
    ACTIVE.read().clone()
}

pub fn is_manager_active() -> bool {
    ACTIVE.read().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test: the slot is process-wide and tests run concurrently.
    #[test]
    fn slot_follows_lifecycle_events() {
        on_environment_stopped();
        assert!(current().is_none());
        assert!(!is_manager_active());

        let first = on_add_reload_listener(ManagerConfig::default());
        assert!(is_manager_active());
        assert!(Arc::ptr_eq(&current().unwrap(), &first));

        let second = on_add_reload_listener(ManagerConfig::default());
        assert!(Arc::ptr_eq(&current().unwrap(), &second));
        assert!(!Arc::ptr_eq(&first, &second));

        let stopped = on_environment_stopped().unwrap();
        assert!(Arc::ptr_eq(&stopped, &second));
        assert!(current().is_none());
        assert!(on_environment_stopped().is_none());
    }
}
