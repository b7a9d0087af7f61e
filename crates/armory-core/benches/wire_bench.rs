//! Criterion benchmarks for the gun wire codec and reload cycle.
//!
//! Benchmark groups:
//! - `wire`: encode and decode of a 1000-gun snapshot
//! - `reload`: a full reload over in-memory documents

use armory_core::config::ManagerConfig;
use armory_core::manager::GunManager;
use armory_core::registry::{HandleCatalog, Registry, SnapshotOrigin};
use armory_core::resolver::MemoryResolver;
use armory_core::test_utils::*;
use armory_core::wire::{decode_snapshot, encode_snapshot};
use criterion::{Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;

const GUN_COUNT: usize = 1000;

fn gun_names() -> Vec<String> {
    (0..GUN_COUNT).map(|i| format!("armory:gun_{i:04}")).collect()
}

fn build_registry() -> Registry {
    let registry = Registry::new(SnapshotOrigin::Local);
    let records: BTreeMap<_, _> = gun_names().iter().map(|n| (id(n), sample_gun())).collect();
    registry.publish(records, SnapshotOrigin::Local, &HandleCatalog::new());
    registry
}

fn bench_wire(c: &mut Criterion) {
    let registry = build_registry();
    let snapshot = registry.get();
    let bytes = encode_snapshot(&snapshot);

    let mut group = c.benchmark_group("wire");
    group.bench_function("encode_1000_guns", |b| {
        b.iter(|| encode_snapshot(black_box(&snapshot)))
    });
    group.bench_function("decode_1000_guns", |b| {
        b.iter(|| decode_snapshot(black_box(&bytes), GUN_COUNT).unwrap())
    });
    group.finish();
}

fn bench_reload(c: &mut Criterion) {
    let names = gun_names();
    let mut catalog = HandleCatalog::new();
    let mut resolver = MemoryResolver::new();
    for (i, name) in names.iter().enumerate() {
        let gun = id(name);
        catalog.register(gun.clone());
        let ns = if i % 3 == 0 { "extra" } else { "armory" };
        resolver.insert(ns, &format!("guns/{}.json", gun.path()), PISTOL_JSON);
    }
    let manager = GunManager::new(ManagerConfig::default());

    let mut group = c.benchmark_group("reload");
    group.bench_function("reload_1000_guns", |b| {
        b.iter(|| manager.reload(&catalog, &resolver))
    });
    group.finish();
}

criterion_group!(benches, bench_wire, bench_reload);
criterion_main!(benches);
