use fxhash::FxHashSet;
use grid_util::Point;
use hive_pathfinding::checkpoint::{Destructibles, Trees, WaterCrossings};
use hive_pathfinding::{Agent, PathData, Pathfinder, TileMap, UnitKind};
use std::sync::Arc;
use std::time::Duration;

struct Knight;

impl Agent for Knight {
    fn scale(&self) -> u8 {
        1
    }
    fn attack_power(&self) -> f64 {
        30.0
    }
}

// A knight walks along a corridor blocked by a tree, a fence and a river. At
// each obstacle the path halts until the knight has dealt with it; the grid
// changes it makes are applied by this loop, not by the path.
fn main() {
    let mut map = TileMap::from_ascii(
        "
        ##############
        ..T...F...~...
        ##############
        ",
    );
    let pathfinder = Arc::new(Pathfinder::for_unit(UnitKind::Ground, 1));
    let mut data = PathData::new(vec![Point::new(0, 1)], Point::new(13, 1), pathfinder, 2.0)
        .with_provider(Trees {
            chop_time: Duration::from_millis(1500),
        })
        .with_provider(Destructibles)
        .with_provider(WaterCrossings);
    let model = data.pathfinder().model().clone();
    let Some(mut path) = data.get_paths_blocking(&map).first().map(|p| p.clone_fresh()) else {
        println!("No route");
        return;
    };
    let dt = 0.25;
    let mut tick = 0;
    while !path.is_finished() && tick < 1000 {
        let mut changed = FxHashSet::default();
        if let Some(mutation) = path.interact(&map, &Knight, dt) {
            println!("tick {tick}: {mutation}");
            changed.extend(map.apply(&mutation));
        }
        let step = path.advance(&map, &Knight, dt);
        changed.extend(map.advance_time(Duration::from_secs_f64(dt)));
        if path.is_affected_by(&changed) {
            path.recompute(&map, &model);
        }
        if tick % 4 == 0 {
            println!(
                "tick {tick}: {:?} -> {:?} ({:.2}), expected at {:.2} in 1s",
                step.from,
                step.to,
                step.progress,
                path.predict_position_after(1.0)
            );
        }
        tick += 1;
    }
    println!("Arrived at {:?} after {tick} ticks", path.current_cell());
    println!("{}", map);
}
