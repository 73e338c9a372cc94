use criterion::{criterion_group, criterion_main, Criterion};
use rand::{prelude::StdRng, SeedableRng};

use anzen::{
    astar::astar_timesteps,
    catable::CATable,
    grid::{manhattan_distance, Grid},
    safemap::SafeMap,
    scenario::random_trajectories,
    sipp::sipp,
    wsipp::wsipp,
};

fn generic_path_benchmark(c: &mut Criterion) {
    let seed = 9143629442060746251;

    let height = 32;
    let width = 32;
    let obstacle_count = 24;
    let cycles = 20;

    let start = (0, 0);
    let goal = (height - 1, width - 1);

    let rand = &mut StdRng::seed_from_u64(seed);

    let grid = Grid::from_cells(vec![vec![false; width as usize]; height as usize]);
    let trajectories = random_trajectories(rand, obstacle_count, height, width, cycles);

    c.bench_function("build_safe_map", |b| {
        b.iter(|| SafeMap::new(&grid, &trajectories));
    });

    let map = SafeMap::new(&grid, &trajectories);
    let table = CATable::new(&trajectories);

    c.bench_function("sipp", |b| {
        b.iter(|| sipp(&map, start, goal, manhattan_distance));
    });

    c.bench_function("wsipp_w2", |b| {
        b.iter(|| wsipp(&map, start, goal, 2.0, manhattan_distance));
    });

    c.bench_function("astar_timesteps", |b| {
        b.iter(|| astar_timesteps(&grid, &table, start, goal, manhattan_distance));
    });
}

criterion_group!(benches, generic_path_benchmark);
criterion_main!(benches);
