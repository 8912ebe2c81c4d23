use grid_util::Point;
use hive_pathfinding::checkpoint::Trees;
use hive_pathfinding::{
    PathData, PathDataError, PathWorker, Pathfinder, Terrain, TileMap, UnitKind,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn map() -> TileMap {
    TileMap::from_ascii(
        "
        ..........
        ...TT.....
        ...TT..~~.
        ..........
        ",
    )
}

fn spawn_group() -> PathData {
    let pathfinder = Arc::new(Pathfinder::for_unit(UnitKind::Ground, 1));
    PathData::new(
        vec![Point::new(0, 0), Point::new(0, 3), Point::new(0, 0)],
        Point::new(9, 2),
        pathfinder,
        1.5,
    )
}

fn poll(data: &mut PathData, map: &TileMap) -> usize {
    for _ in 0..10_000 {
        let n = data.get_paths_now_or_empty(map).len();
        if n > 0 {
            return n;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("worker never replied");
}

#[test]
fn worker_and_blocking_searches_agree() {
    let map = map();
    let worker = PathWorker::spawn().unwrap();
    let mut background = spawn_group()
        .with_provider(Trees::default())
        .with_worker(worker.handle());
    let mut local = spawn_group().with_provider(Trees::default());
    assert_eq!(poll(&mut background, &map), 3);
    let local_paths = local.get_paths_blocking(&map);
    let background_paths = background.paths().unwrap();
    assert_eq!(background_paths.len(), local_paths.len());
    for (a, b) in background_paths.iter().zip(local_paths) {
        assert_eq!(a.route(), b.route());
        assert_eq!(a.next_checkpoint(), b.next_checkpoint());
    }
    worker.shutdown();
}

#[test]
fn replies_after_invalidation_are_never_applied() {
    let map = map();
    let worker = PathWorker::spawn().unwrap();
    let mut data = spawn_group().with_worker(worker.handle());
    let ticket = data.get_paths_async(&map);
    assert_eq!(ticket.generation(), 0);
    assert!(data.is_pending());
    data.invalidate();
    assert!(!data.is_pending());
    assert!(matches!(
        ticket.wait(&mut data, &map),
        Err(PathDataError::Stale {
            expected: 1,
            got: 0
        })
    ));
    assert!(data.paths().is_none());
    assert_eq!(poll(&mut data, &map), 3);
    worker.shutdown();
}

#[test]
fn tickets_and_polling_share_one_job() {
    let map = map();
    let worker = PathWorker::spawn().unwrap();
    let mut data = spawn_group().with_worker(worker.handle());
    let ticket = data.get_paths_async(&map);
    let polled = data.get_paths_now_or_empty(&map).len();
    assert!(polled == 0 || polled == 3);
    assert_eq!(data.generation(), 0);
    let first = {
        let paths = ticket.wait(&mut data, &map).unwrap();
        assert_eq!(paths.len(), 3);
        Arc::clone(paths[0].route())
    };
    // Later requests are served from the cache
    let again = data.get_paths_async(&map).wait(&mut data, &map).unwrap();
    assert!(Arc::ptr_eq(&first, again[0].route()));
    assert!(!data.is_pending());
    worker.shutdown();
}

#[test]
fn grid_changes_reach_the_worker() {
    let mut map = map();
    let worker = PathWorker::spawn().unwrap();
    let mut data = spawn_group().with_worker(worker.handle());
    poll(&mut data, &map);
    let mut changed = fxhash::FxHashSet::default();
    for y in 0..4 {
        let point = Point::new(6, y);
        map.set_terrain(point, Terrain::Rock);
        changed.insert(point);
    }
    assert!(data.notify_changed(&changed));
    // Nothing reaches the target any more
    for _ in 0..10_000 {
        data.get_paths_now_or_empty(&map);
        if !data.is_pending() {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(data.paths().map(|p| p.len()), Some(0));
    worker.shutdown();
}

#[test]
fn dropped_worker_falls_back_to_the_calling_thread() {
    let map = map();
    let worker = PathWorker::spawn().unwrap();
    let handle = worker.handle();
    worker.shutdown();
    let mut data = spawn_group().with_worker(handle);
    assert_eq!(data.get_paths_now_or_empty(&map).len(), 3);
}
