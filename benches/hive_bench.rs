use criterion::{criterion_group, criterion_main, Criterion};
use grid_util::Point;
use hive_pathfinding::search::Reachability;
use hive_pathfinding::{Pathfinder, Terrain, TileMap, UnitKind, VisitWeights};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;

const TERRAIN: [Terrain; 6] = [
    Terrain::Grass,
    Terrain::Grass,
    Terrain::Dirt,
    Terrain::Sand,
    Terrain::Tree,
    Terrain::Water,
];

fn random_map(size: usize, rng: &mut StdRng) -> TileMap {
    let mut map = TileMap::new(size, size, Terrain::Grass);
    for x in 0..size as i32 {
        for y in 0..size as i32 {
            let terrain = if rng.gen_bool(0.2) {
                Terrain::Rock
            } else {
                TERRAIN[rng.gen_range(0..TERRAIN.len())]
            };
            map.set_terrain(Point::new(x, y), terrain);
        }
    }
    map
}

fn hive_bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    for size in [32, 64, 128] {
        let mut map = random_map(size, &mut rng);
        let last = size as i32 - 1;
        let origins = vec![Point::new(0, 0); 8];
        let target = Point::new(last, last);
        map.set_terrain(origins[0], Terrain::Grass);
        map.set_terrain(target, Terrain::Grass);
        for (kind, name) in [(UnitKind::Ground, "ground"), (UnitKind::Flying, "flying")] {
            let pathfinder = Pathfinder::for_unit(kind, 1);
            c.bench_function(format!("{size}x{size}, {name}, single").as_str(), |b| {
                b.iter(|| black_box(pathfinder.find_path(&map, origins[0], target, None)))
            });
            c.bench_function(format!("{size}x{size}, {name}, hive of 8").as_str(), |b| {
                b.iter(|| {
                    let mut weights = VisitWeights::new();
                    black_box(pathfinder.find_hive_path(&map, &origins, target, &mut weights))
                })
            });
        }
        let pathfinder = Pathfinder::for_unit(UnitKind::Ground, 2);
        c.bench_function(format!("{size}x{size}, components").as_str(), |b| {
            b.iter(|| black_box(Reachability::build(&map, pathfinder.model())))
        });
    }
}

criterion_group!(benches, hive_bench);
criterion_main!(benches);
