//! Property-based tests for the wire codec.
//!
//! Generates random field bags, gun records, and snapshots, then checks that
//! decoding what was encoded gives back the same value, and that arbitrary
//! bytes never make the decoder panic.

use armory_core::field_bag::{FieldBag, Value};
use armory_core::gun::{Display, Flash, General, GripType, GunConfig, Projectile, Sounds};
use armory_core::id::EntityId;
use armory_core::registry::{HandleCatalog, Registry, SnapshotOrigin};
use armory_core::wire::{self, decode_bag, decode_snapshot, encode_bag, encode_snapshot};
use proptest::prelude::*;
use std::collections::BTreeMap;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_id() -> impl Strategy<Value = EntityId> {
    ("[a-z][a-z0-9_]{0,7}", "[a-z][a-z0-9_/]{0,11}")
        .prop_map(|(ns, path)| EntityId::new(&ns, &path).unwrap())
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[ -~]{0,16}".prop_map(Value::Str),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            proptest::collection::btree_map("[a-zA-Z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Bag(m.into_iter().collect())),
        ]
    })
}

fn arb_bag() -> impl Strategy<Value = FieldBag> {
    proptest::collection::btree_map("[a-zA-Z_]{1,8}", arb_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_f32() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0
}

fn arb_grip() -> impl Strategy<Value = GripType> {
    prop_oneof![
        Just(GripType::OneHanded),
        Just(GripType::TwoHanded),
        Just(GripType::MiniGun),
        Just(GripType::Bazooka),
    ]
}

fn arb_general() -> impl Strategy<Value = General> {
    (
        any::<bool>(),
        any::<i32>(),
        arb_grip(),
        any::<i32>(),
        any::<i32>(),
        (arb_f32(), arb_f32(), arb_f32()),
        any::<i32>(),
        any::<bool>(),
    )
        .prop_map(
            |(auto, rate, grip_type, max_ammo, reload_amount, (angle, kick, spread), amount, always)| {
                General {
                    auto,
                    rate,
                    grip_type,
                    max_ammo,
                    reload_amount,
                    recoil_angle: angle,
                    recoil_kick: kick,
                    spread,
                    projectile_amount: amount,
                    always_spread: always,
                }
            },
        )
}

fn arb_projectile() -> impl Strategy<Value = Projectile> {
    (
        arb_id(),
        arb_f32(),
        arb_f32(),
        any::<i32>(),
        any::<(bool, bool, bool)>(),
    )
        .prop_map(|(item, size, speed, life, (gravity, reduce, visible))| Projectile {
            item,
            size,
            speed,
            life,
            gravity,
            damage_reduce_over_life: reduce,
            visible,
        })
}

fn arb_gun() -> impl Strategy<Value = GunConfig> {
    (
        arb_f32(),
        any::<i32>(),
        arb_general(),
        arb_projectile(),
        proptest::option::of(arb_id()),
        proptest::option::of(arb_id()),
        proptest::option::of(arb_f32()),
        proptest::collection::vec("[a-z_]{1,10}", 0..4),
    )
        .prop_map(
            |(damage, reload_speed, general, projectile, fire, cock, flash, attachments)| {
                GunConfig {
                    damage,
                    reload_speed,
                    general,
                    projectile,
                    sounds: Sounds {
                        fire,
                        reload: None,
                        cock,
                    },
                    display: Display {
                        flash: flash.map(|size| Flash { size }),
                    },
                    attachments,
                }
            },
        )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// decode(encode(b)) == b, and re-encoding is byte-identical.
    #[test]
    fn bag_round_trip(bag in arb_bag()) {
        let bytes = encode_bag(&bag);
        let decoded = decode_bag(&bytes).unwrap();
        prop_assert_eq!(&decoded, &bag);
        prop_assert_eq!(encode_bag(&decoded), bytes);
    }

    /// A record survives bag conversion and the wire.
    #[test]
    fn gun_round_trip(gun in arb_gun()) {
        let bytes = encode_bag(&gun.to_bag());
        let back = GunConfig::from_bag(&decode_bag(&bytes).unwrap()).unwrap();
        prop_assert_eq!(back, gun);
    }

    /// decode(encode(s)) has the same keys and equal records.
    #[test]
    fn snapshot_round_trip(guns in proptest::collection::btree_map(arb_id(), arb_gun(), 0..8)) {
        let registry = Registry::new(SnapshotOrigin::Local);
        registry.publish(guns.clone(), SnapshotOrigin::Local, &HandleCatalog::new());

        let bytes = encode_snapshot(&registry.get());
        let batch = decode_snapshot(&bytes, 64).unwrap();
        prop_assert_eq!(batch.len(), guns.len());
        let decoded: BTreeMap<EntityId, GunConfig> = batch.into_map();
        prop_assert_eq!(decoded, guns);
    }

    /// Arbitrary input is rejected or accepted, never a panic.
    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_bag(&bytes);
        let _ = decode_snapshot(&bytes, 64);
    }

    /// Every strict prefix of a valid payload is rejected.
    #[test]
    fn truncated_snapshot_rejected(gun in arb_gun(), cut in 0usize..1024) {
        let mut batch = wire::GunBatch::new();
        batch.push(EntityId::new("armory", "pistol").unwrap(), gun).unwrap();
        let bytes = batch.encode();
        let cut = cut % bytes.len();
        prop_assert!(decode_snapshot(&bytes[..cut], 64).is_err());
    }
}
