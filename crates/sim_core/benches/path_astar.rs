use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::path::{astar_path, PathService};
use sim_core::tile_grid::{GroundType, TileGrid};

fn create_mostly_open_grid(width: u32, height: u32, wall_density: f32, seed: u64) -> TileGrid {
    let mut grid = TileGrid::flat(width, height, GroundType::Grass, 0);
    let mut rng = StdRng::seed_from_u64(seed);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            if rng.gen::<f32>() < wall_density {
                grid.set_tile(x, y, GroundType::Water, 0);
            }
        }
    }
    grid.flush_terrain_modified();
    grid
}

fn find_walkable_positions(grid: &TileGrid, count: usize, seed: u64) -> Vec<(i32, i32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = Vec::new();
    let mut attempts = 0;
    while positions.len() < count && attempts < count * 100 {
        let x = rng.gen_range(0..grid.width() as i32);
        let y = rng.gen_range(0..grid.height() as i32);
        if grid.is_passable_at(x, y) {
            positions.push((x, y));
        }
        attempts += 1;
    }
    positions
}

fn bench_astar_grid_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_grid_sizes");
    for &size in &[20, 50, 100] {
        let grid = create_mostly_open_grid(size, size, 0.15, 42);
        let positions = find_walkable_positions(&grid, 10, 123);
        if positions.len() < 2 {
            continue;
        }
        let (start, goal) = (positions[0], positions[positions.len() - 1]);
        group.bench_with_input(BenchmarkId::new("open_grid", format!("{size}x{size}")), &(grid, start, goal), |b, (grid, start, goal)| {
            b.iter(|| black_box(astar_path(black_box(grid), black_box(*start), black_box(*goal))))
        });
    }
    group.finish();
}

fn bench_astar_water_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("astar_water_density");
    let size = 50u32;
    for &density in &[0.1, 0.2, 0.3, 0.4] {
        let grid = create_mostly_open_grid(size, size, density, 42);
        let positions = find_walkable_positions(&grid, 10, 456);
        if positions.len() < 2 {
            continue;
        }
        let (start, goal) = (positions[0], positions[positions.len() - 1]);
        group.bench_with_input(BenchmarkId::new("water_density", format!("{density:.1}")), &(grid, start, goal), |b, (grid, start, goal)| {
            b.iter(|| black_box(astar_path(black_box(grid), black_box(*start), black_box(*goal))))
        });
    }
    group.finish();
}

fn bench_path_service_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_service_cache");
    let grid = create_mostly_open_grid(50, 50, 0.1, 42);
    let positions = find_walkable_positions(&grid, 16, 999);
    if positions.len() < 2 {
        group.finish();
        return;
    }

    let mut requests = Vec::new();
    for i in 0..positions.len() - 1 {
        for j in (i + 1)..positions.len() {
            requests.push((positions[i], positions[j]));
        }
    }
    let original_len = requests.len();
    for i in 0..original_len.min(10) {
        requests.push(requests[i]);
    }

    group.bench_with_input(BenchmarkId::new("cached_batch", requests.len()), &requests, |b, requests| {
        b.iter(|| {
            let mut service = PathService::new(100);
            let results: Vec<_> = requests.iter().map(|(s, g)| black_box(service.get(black_box(&grid), black_box(*s), black_box(*g)))).collect();
            black_box(results)
        })
    });

    group.bench_with_input(BenchmarkId::new("direct_batch", requests.len()), &requests, |b, requests| {
        b.iter(|| {
            let results: Vec<_> = requests.iter().map(|(s, g)| black_box(astar_path(black_box(&grid), black_box(*s), black_box(*g)))).collect();
            black_box(results)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_astar_grid_sizes, bench_astar_water_density, bench_path_service_cache);
criterion_main!(benches);
