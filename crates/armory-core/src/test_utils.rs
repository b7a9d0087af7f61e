//! Shared fixtures for unit tests, integration tests, and benches.

use crate::gun::{Display, Flash, General, GripType, GunConfig, Projectile, Sounds};
use crate::id::EntityId;
use crate::registry::{EntityHandle, HandleCatalog};
use crate::resolver::MemoryResolver;
use std::collections::BTreeSet;
use std::sync::Arc;

// ===========================================================================
// Ids and records
// ===========================================================================

/// Parse an id, panicking on malformed input.
pub fn id(s: &str) -> EntityId {
    s.parse()
        .unwrap_or_else(|e| panic!("bad test id '{s}': {e}"))
}

/// A gun with every field set away from its default.
pub fn sample_gun() -> GunConfig {
    GunConfig {
        damage: 7.5,
        reload_speed: 3,
        general: General {
            auto: true,
            rate: 4,
            grip_type: GripType::TwoHanded,
            max_ammo: 45,
            reload_amount: 5,
            recoil_angle: 2.25,
            recoil_kick: 0.5,
            spread: 1.75,
            projectile_amount: 2,
            always_spread: true,
        },
        projectile: Projectile {
            item: id("armory:heavy_bullet"),
            size: 0.25,
            speed: 16.0,
            life: 60,
            gravity: true,
            damage_reduce_over_life: true,
            visible: true,
        },
        sounds: Sounds {
            fire: Some(id("armory:item.rifle.fire")),
            reload: Some(id("armory:item.rifle.reload")),
            cock: None,
        },
        display: Display {
            flash: Some(Flash { size: 0.75 }),
        },
        attachments: vec!["scope".to_string(), "barrel".to_string()],
    }
}

/// The default gun with a different damage value.
pub fn gun_with_damage(damage: f32) -> GunConfig {
    GunConfig {
        damage,
        ..GunConfig::default()
    }
}

/// A catalog holding one handle per name, returned in the given order.
pub fn catalog_with(names: &[&str]) -> (HandleCatalog, Vec<Arc<EntityHandle>>) {
    let mut catalog = HandleCatalog::new();
    let handles = names.iter().map(|n| catalog.register(id(n))).collect();
    (catalog, handles)
}

// ===========================================================================
// Documents
// ===========================================================================

pub const PISTOL_JSON: &str = r#"{
    "damage": 5,
    "reloadSpeed": 2,
    "general": { "rate": 6, "maxAmmo": 12, "gripType": "one_handed" },
    "projectile": { "item": "armory:basic_bullet", "speed": 12.5 },
    "sounds": { "fire": "armory:item.pistol.fire" }
}"#;

/// Overrides the built-in pistol from another namespace.
pub const PISTOL_OVERRIDE_JSON: &str = r#"{ "damage": 9, "general": { "rate": 3 } }"#;

pub const RIFLE_RON: &str = r#"{
    "damage": 8.5,
    "general": { "rate": 2, "auto": true, "gripType": "two_handed" },
    "attachments": ["scope"],
}"#;

pub const SHOTGUN_TOML: &str = r#"
damage = 3
reloadSpeed = 4

[general]
rate = 15
projectileAmount = 8
alwaysSpread = true

[display.flash]
size = 1.5
"#;

/// Missing the required `damage` field.
pub const BROKEN_MINIGUN_JSON: &str = r#"{ "general": { "rate": 1 } }"#;

/// Resolver with documents for the ids in [`known_gun_ids`]:
///
/// - `armory:pistol` built-in JSON plus an override from `extra`
/// - `armory:rifle` RON
/// - `armory:shotgun` TOML
/// - `armory:minigun` present but invalid
/// - `armory:bazooka` has no document
///
/// `guns/heavy/pistol.json` belongs to `armory:heavy/pistol`, which is not a
/// known gun, so it never configures the pistol.
pub fn populated_resolver() -> MemoryResolver {
    let mut resolver = MemoryResolver::new();
    resolver
        .insert("armory", "guns/pistol.json", PISTOL_JSON)
        .insert("extra", "guns/pistol.json", PISTOL_OVERRIDE_JSON)
        .insert("armory", "guns/rifle.ron", RIFLE_RON)
        .insert("armory", "guns/shotgun.toml", SHOTGUN_TOML)
        .insert("armory", "guns/heavy/pistol.json", r#"{"damage": 100}"#)
        .insert("armory", "guns/minigun.json", BROKEN_MINIGUN_JSON)
        .insert("armory", "guns/heavy/notes.txt", "not a gun");
    resolver
}

pub fn known_gun_ids() -> BTreeSet<EntityId> {
    [
        "armory:pistol",
        "armory:rifle",
        "armory:shotgun",
        "armory:minigun",
        "armory:bazooka",
    ]
    .into_iter()
    .map(id)
    .collect()
}
