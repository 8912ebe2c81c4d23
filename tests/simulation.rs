//! Drives a group of units through a map with obstacles the way a game loop
//! would: advance every cursor, let blocked units interact, apply the grid
//! mutations and recompute the cursors the changes touch.
use fxhash::FxHashSet;
use grid_util::Point;
use hive_pathfinding::checkpoint::{Destructibles, Trees, WaterCrossings};
use hive_pathfinding::{
    Agent, Path, PathData, Pathfinder, Terrain, TerrainGrid, TileMap, UnitKind,
};
use std::sync::Arc;
use std::time::Duration;

struct Soldier;

impl Agent for Soldier {
    fn scale(&self) -> u8 {
        1
    }
    fn attack_power(&self) -> f64 {
        25.0
    }
}

const DT: f64 = 0.1;

fn run(map: &mut TileMap, data: &mut PathData, max_ticks: usize) -> Vec<Path> {
    let mut paths: Vec<Path> = data
        .get_paths_blocking(map)
        .iter()
        .map(Path::clone_fresh)
        .collect();
    assert!(!paths.is_empty());
    let model = data.pathfinder().model().clone();
    for _ in 0..max_ticks {
        if paths.iter().all(|p| p.is_finished()) {
            break;
        }
        let mut changed = FxHashSet::default();
        for path in paths.iter_mut() {
            if let Some(mutation) = path.interact(&*map, &Soldier, DT) {
                changed.extend(map.apply(&mutation));
            }
            path.advance(&*map, &Soldier, DT);
        }
        changed.extend(map.advance_time(Duration::from_secs_f64(DT)));
        for path in paths.iter_mut().filter(|p| p.is_affected_by(&changed)) {
            path.recompute(&*map, &model);
        }
    }
    paths
}

#[test]
fn units_bridge_water_to_reach_the_target() {
    let mut map = TileMap::from_ascii(
        "
        ....~....
        ....~....
        ....~....
        ",
    );
    let pathfinder = Arc::new(Pathfinder::for_unit(UnitKind::Ground, 1));
    let target = Point::new(8, 1);
    let mut data = PathData::new(vec![Point::new(0, 1)], target, pathfinder, 2.0)
        .with_provider(WaterCrossings);
    let paths = run(&mut map, &mut data, 1000);
    for path in &paths {
        assert!(path.is_finished());
        assert!(!path.is_truncated());
        assert_eq!(path.current_cell(), target);
    }
    let bridged = (0..3)
        .filter(|&y| map.cell(Point::new(4, y)).unwrap().terrain == Terrain::Bridge)
        .count();
    assert_eq!(bridged, 1);
}

#[test]
fn units_fell_trees_and_break_walls() {
    let mut map = TileMap::from_ascii(
        "
        ###########
        ...T...W...
        ###########
        ",
    );
    let pathfinder = Arc::new(Pathfinder::for_unit(UnitKind::Ground, 1));
    let target = Point::new(10, 1);
    let mut data = PathData::new(
        vec![Point::new(0, 1), Point::new(0, 1)],
        target,
        pathfinder,
        1.0,
    )
    .with_provider(Trees {
        chop_time: Duration::from_secs(1),
    })
    .with_provider(Destructibles);
    let paths = run(&mut map, &mut data, 2000);
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.current_cell() == target));
    assert_eq!(map.cell(Point::new(3, 1)).unwrap().terrain, Terrain::Grass);
    assert!(map.cell(Point::new(7, 1)).unwrap().structure.is_none());
    assert_eq!(map.pending_fellings(), 0);
}

#[test]
fn walled_in_units_stop_short() {
    let mut map = TileMap::from_ascii(".......");
    let pathfinder = Arc::new(Pathfinder::for_unit(UnitKind::Ground, 1));
    let mut data = PathData::new(vec![Point::new(0, 0)], Point::new(6, 0), pathfinder, 1.0);
    let mut path = data.get_paths_blocking(&map)[0].clone_fresh();
    path.advance(&map, &Soldier, 1.5);
    map.set_terrain(Point::new(4, 0), Terrain::Rock);
    let mut changed = FxHashSet::default();
    changed.insert(Point::new(4, 0));
    assert!(path.is_affected_by(&changed));
    path.recompute(&map, data.pathfinder().model());
    assert!(path.is_truncated());
    path.advance(&map, &Soldier, 100.0);
    assert_eq!(path.current_cell(), Point::new(3, 0));
    assert!(path.is_halted(&map, &Soldier));
    // The owner asks for a fresh batch, which finds nothing
    assert!(data.notify_changed(&changed));
    assert!(data.get_paths_blocking(&map).is_empty());
}
