use grid_util::Point;
use hive_pathfinding::{Pathfinder, Terrain, TerrainGrid, TileMap, UnitKind, VisitWeights};

// Eight units spawning on the same cell are routed as a hive: each route makes
// the cells it uses more expensive for the routes after it, so the group
// fans out instead of walking in single file.
fn main() {
    let mut map = TileMap::from_ascii(
        "
        ....................
        ....................
        .........TT.........
        .........TT.........
        ....................
        ....................
        ",
    );
    let pathfinder = Pathfinder::for_unit(UnitKind::Ground, 1);
    let spawn = Point::new(0, 2);
    let target = Point::new(19, 3);
    let mut weights = VisitWeights::new();
    let routes = pathfinder.find_hive_path(&map, &[spawn; 8], target, &mut weights);
    for (i, route) in routes.iter().enumerate() {
        let Some(route) = route else {
            println!("Unit {i} has nowhere to go");
            continue;
        };
        println!("Unit {i}: {} cells, cost {:.2}", route.len(), route.total_cost());
    }
    // Mark the busiest cells
    for (point, _) in (0..map.height() as i32)
        .flat_map(|y| (0..map.width() as i32).map(move |x| Point::new(x, y)))
        .map(|p| (p, weights.get(&p)))
        .filter(|(_, w)| *w >= 2.0)
        .collect::<Vec<_>>()
    {
        map.set_terrain(point, Terrain::Road);
    }
    println!("{}", map);
}
