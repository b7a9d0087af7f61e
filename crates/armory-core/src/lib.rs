//! Armory Core -- data-driven gun registry with snapshot replication.
//!
//! This crate loads per-gun configuration documents from layered resource
//! namespaces, validates them against an explicit schema, publishes an
//! immutable [`registry::Snapshot`], and replicates that snapshot verbatim to
//! dependent sides over a length-prefixed binary channel.
//!
//! # Reload Cycle
//!
//! Each reload runs to completion before anything becomes visible:
//!
//! 1. **Load** -- For every known gun id, gather candidate documents across
//!    namespaces and parse each into a [`loader::DraftRecord`], highest
//!    precedence first.
//! 2. **Validate** -- Check drafts against [`schema::GUN_SCHEMA`] in precedence
//!    order and keep the first that passes; when none does the gun falls back
//!    to [`gun::GunConfig::default`].
//! 3. **Publish** -- Swap the active snapshot in a single atomic step and attach
//!    each record to its [`registry::EntityHandle`].
//!
//! # Replication
//!
//! ```rust,ignore
//! let bytes = manager.write_registered_guns();
//! // ... transport ...
//! let message = UpdateGuns::decode(&bytes, config.max_sync_entries)?;
//! let ok = client.update_registered_guns(&message, |id| catalog.resolve(id));
//! ```
//!
//! # Key Types
//!
//! - [`id::EntityId`] -- Namespaced `namespace:path` identifier.
//! - [`field_bag::FieldBag`] -- Self-describing nested key/value tree used on
//!   disk and on the wire.
//! - [`gun::GunConfig`] -- The validated per-gun configuration record.
//! - [`registry::Registry`] -- Atomically swapped holder of the active snapshot.
//! - [`manager::GunManager`] -- Authoritative-side reload + distribution.
//! - [`sync::ClientGuns`] -- Dependent-side acceptance of remote snapshots.
//! - [`lifecycle`] -- Process-wide manager slot with explicit init/teardown.

pub mod config;
pub mod document;
pub mod field_bag;
pub mod gun;
pub mod id;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod reload;
pub mod resolver;
pub mod schema;
pub mod sync;
pub mod wire;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
