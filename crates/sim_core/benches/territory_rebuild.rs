use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::territory::{BuildingOwner, TerritoryMap};

fn random_owners(width: u32, height: u32, count: usize, seed: u64) -> Vec<BuildingOwner> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| BuildingOwner {
            x: rng.gen_range(0..width as i32),
            y: rng.gen_range(0..height as i32),
            owner: (i % 4) as u32,
        })
        .collect()
}

fn bench_rebuild_by_map_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("territory_rebuild_map_size");
    for &size in &[20u32, 50, 100] {
        let owners = random_owners(size, size, 10, 42);
        group.bench_with_input(BenchmarkId::new("map", format!("{size}x{size}")), &(size, owners), |b, (size, owners)| {
            b.iter(|| {
                let mut map = TerritoryMap::new(*size, *size);
                map.rebuild(black_box(owners));
                black_box(map.version())
            })
        });
    }
    group.finish();
}

fn bench_rebuild_by_building_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("territory_rebuild_building_count");
    let size = 100u32;
    for &count in &[1usize, 10, 50, 200] {
        let owners = random_owners(size, size, count, 7);
        group.bench_with_input(BenchmarkId::new("buildings", count), &owners, |b, owners| {
            b.iter(|| {
                let mut map = TerritoryMap::new(size, size);
                map.rebuild(black_box(owners));
                black_box(map.version())
            })
        });
    }
    group.finish();
}

fn bench_repeated_rebuilds(c: &mut Criterion) {
    let mut group = c.benchmark_group("territory_repeated_rebuilds");
    let owners = random_owners(80, 80, 30, 99);
    let mut map = TerritoryMap::new(80, 80);
    group.bench_function("rebuild_x100", |b| {
        b.iter(|| {
            for _ in 0..100 {
                map.rebuild(black_box(&owners));
            }
            black_box(map.version())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_rebuild_by_map_size, bench_rebuild_by_building_count, bench_repeated_rebuilds);
criterion_main!(benches);
