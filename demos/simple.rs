use grid_util::Point;
use hive_pathfinding::{Pathfinder, TileMap, UnitKind};

// In this example a route is found on a map with shape
// ..........
// .####.....
// .#::#.~~~.
// .#..#.~~~.
// ..........
// where # is rock, : is sand and ~ is water. Ground units walk around the
// rock and prefer grass over the costly water.
fn main() {
    let map = TileMap::from_ascii(
        "
        ..........
        .####.....
        .#::#.~~~.
        .#..#.~~~.
        ..........
        ",
    );
    println!("{}", map);
    let pathfinder = Pathfinder::for_unit(UnitKind::Ground, 1);
    let start = Point::new(2, 3);
    let end = Point::new(9, 2);
    if let Some(route) = pathfinder.find_path(&map, start, end, None) {
        println!("A route of cost {:.2} has been found:", route.total_cost());
        for (cell, cost) in route.cells().iter().zip(route.costs()) {
            println!("{:?} {:?} {:.2}", cell.point, cell.category, cost);
        }
        for section in route.sections() {
            println!("{:?}", section);
        }
    }
}
