use crate::checkpoint::{Agent, Checkpoint};
use crate::cost::CostModel;
use crate::route::Route;
use crate::terrain::{GridMutation, TerrainGrid};
use fxhash::FxHashSet;
use grid_util::Point;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;

/// Where a cursor stands after an [advance](Path::advance). Between two cells
/// it is on its way from `from` to `to` and `progress` is the fractional part
/// of its index. Standing exactly on a cell, `to` is that cell, `from` the one
/// it came from and `progress` is zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub from: Point,
    pub to: Point,
    pub progress: f64,
}

/// A cursor following a shared [Route]. The integer part of the index is the
/// cell the unit stands on, the fractional part its progress towards the next
/// cell. Each cursor consumes its own queue of pending [Checkpoint]s.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    route: Arc<Route>,
    index: f64,
    section: usize,
    speed: f64,
    checkpoints: Arc<[Checkpoint]>,
    pending: VecDeque<Checkpoint>,
    limit: usize,
}

impl Path {
    pub fn new(route: impl Into<Arc<Route>>, speed: f64) -> Path {
        Path::with_checkpoints(route, speed, Vec::new())
    }

    /// Attaches checkpoints to a fresh cursor. Checkpoints bound to the origin
    /// or to indices outside the route are dropped.
    pub fn with_checkpoints(
        route: impl Into<Arc<Route>>,
        speed: f64,
        mut checkpoints: Vec<Checkpoint>,
    ) -> Path {
        let route = route.into();
        let len = route.len();
        checkpoints.retain(|c| c.index > 0 && c.index < len);
        checkpoints.sort_by_key(|c| c.index);
        let checkpoints: Arc<[Checkpoint]> = checkpoints.into();
        Path {
            limit: limit_from(&route, 0),
            pending: checkpoints.iter().cloned().collect(),
            checkpoints,
            route,
            index: 0.0,
            section: 0,
            speed,
        }
    }

    /// An independent cursor at the start of the same route, with its own
    /// copy of every checkpoint.
    pub fn clone_fresh(&self) -> Path {
        Path {
            route: Arc::clone(&self.route),
            index: 0.0,
            section: 0,
            speed: self.speed,
            checkpoints: Arc::clone(&self.checkpoints),
            pending: self.checkpoints.iter().cloned().collect(),
            limit: limit_from(&self.route, 0),
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn position(&self) -> f64 {
        self.index
    }

    fn cell_index(&self) -> usize {
        self.index.floor() as usize
    }

    pub fn current_cell(&self) -> Point {
        self.route.cells()[self.cell_index()].point
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn next_checkpoint(&self) -> Option<&Checkpoint> {
        self.pending.front()
    }

    /// The last index this cursor may reach.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether the cursor has gone as far as it can. For a truncated path that
    /// is the last cell before the blockage rather than the target.
    pub fn is_finished(&self) -> bool {
        self.cell_index() >= self.limit
    }

    /// Whether a change to the grid cut the route short. The owner should
    /// request a fresh route.
    pub fn is_truncated(&self) -> bool {
        self.limit + 1 < self.route.len()
    }

    /// The pending checkpoint on the next cell, if it still blocks.
    fn blocking<G: TerrainGrid, A: Agent>(&self, grid: &G, agent: &A) -> Option<&Checkpoint> {
        self.pending
            .front()
            .filter(|c| c.index == self.cell_index() + 1 && !c.is_cleared(grid, agent))
    }

    pub fn is_halted<G: TerrainGrid, A: Agent>(&self, grid: &G, agent: &A) -> bool {
        self.is_finished() || self.blocking(grid, agent).is_some()
    }

    /// Moves the cursor by `dt` time units. Each cell is crossed at
    /// `speed / cost`, and time left over after reaching a cell carries on to
    /// the next. The cursor holds one cell short of an uncleared checkpoint;
    /// cleared checkpoints are consumed on the way.
    pub fn advance<G: TerrainGrid, A: Agent>(&mut self, grid: &G, agent: &A, dt: f64) -> Step {
        if agent.is_busy() || !moves(dt, self.speed) {
            return self.step();
        }
        let mut time = dt;
        loop {
            let current = self.cell_index();
            if current >= self.limit {
                self.index = self.limit as f64;
                break;
            }
            if let Some(checkpoint) = self.pending.front() {
                if checkpoint.index <= current || checkpoint.is_cleared(grid, agent) {
                    self.pending.pop_front();
                    continue;
                }
                if checkpoint.index == current + 1 {
                    self.index = current as f64;
                    break;
                }
            }
            let cost = self.route.cost(current);
            if !cost.is_finite() {
                break;
            }
            let needed = ((current + 1) as f64 - self.index) * cost / self.speed;
            if time < needed {
                self.index += time * self.speed / cost;
                break;
            }
            time -= needed;
            self.index = (current + 1) as f64;
        }
        self.section = self.route.section_index(self.cell_index());
        self.step()
    }

    fn step(&self) -> Step {
        let cells = self.route.cells();
        let i = self.cell_index();
        let progress = self.index - i as f64;
        let from = if progress == 0.0 { i.saturating_sub(1) } else { i };
        Step {
            from: cells[from].point,
            to: cells[(from + 1).min(cells.len() - 1)].point,
            progress,
        }
    }

    /// The grid change the unit makes this tick while an uncleared checkpoint
    /// blocks it, for the caller to apply.
    pub fn interact<G: TerrainGrid, A: Agent>(
        &self,
        grid: &G,
        agent: &A,
        dt: f64,
    ) -> Option<GridMutation> {
        self.blocking(grid, agent)?.process(grid, agent, dt)
    }

    /// The fractional index the cursor would reach after moving for `time`,
    /// walking whole sections at a time. Checkpoints are not taken into
    /// account.
    pub fn predict_position_after(&self, time: f64) -> f64 {
        if !moves(time, self.speed) {
            return self.index;
        }
        let stop = self.limit as f64;
        let sections = self.route.sections();
        let mut index = self.index;
        let mut left = time;
        for section in &sections[self.section.min(sections.len())..] {
            if index >= stop || !section.cost.is_finite() {
                break;
            }
            let end = (section.end as f64).min(stop);
            if end <= index {
                continue;
            }
            let needed = (end - index) * section.cost / self.speed;
            if left < needed {
                return index + left * self.speed / section.cost;
            }
            left -= needed;
            index = end;
        }
        index.min(stop)
    }

    /// Whether any cell in `changed` lies under this path's route.
    pub fn is_affected_by(&self, changed: &FxHashSet<Point>) -> bool {
        self.route.is_affected_by(changed)
    }

    /// Re-resolves the route against the grid while keeping the cursor's
    /// progress. A cursor whose cell became impassable moves on to the nearest
    /// passable cell ahead, and the cursor may not pass the first blocked step
    /// ahead of it. Returns whether the route changed.
    pub fn recompute<G: TerrainGrid>(&mut self, grid: &G, model: &CostModel) -> bool {
        let route = Arc::make_mut(&mut self.route);
        let changed = route.refresh(grid, model);
        let len = route.len();
        let mut current = self.index.floor() as usize;
        if !model.is_passable(grid, route.cells()[current].point) {
            match (current + 1..len).find(|&i| model.is_passable(grid, route.cells()[i].point)) {
                Some(i) => {
                    debug!(
                        "Cursor cell {:?} is gone, resuming at {:?}",
                        route.cells()[current].point,
                        route.cells()[i].point
                    );
                    current = i;
                    self.index = i as f64;
                }
                None => {
                    warn!("Nothing passable left ahead of {:?}", route.cells()[current].point);
                    self.index = current as f64;
                    self.limit = current;
                    self.pending.clear();
                    self.section = route.section_index(current);
                    return changed;
                }
            }
        }
        self.limit = limit_from(route, current);
        self.pending.retain(|c| c.index > current && c.index < len);
        self.section = route.section_index(current);
        changed
    }
}

/// NaN time or speed counts as standing still.
fn moves(time: f64, speed: f64) -> bool {
    time > 0.0 && speed > 0.0
}

/// The first index at or after `start` whose step is impassable, or the
/// route end.
fn limit_from(route: &Route, start: usize) -> usize {
    let last = route.len() - 1;
    (start..last).find(|&i| !route.is_passable(i)).unwrap_or(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointKind, CheckpointRule, Destructibles, CheckpointProvider};
    use crate::cost::UnitKind;
    use crate::pathfinder::Pathfinder;
    use crate::terrain::Terrain;
    use crate::tile_map::TileMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Walker {
        busy: bool,
    }

    impl Agent for Walker {
        fn scale(&self) -> u8 {
            1
        }
        fn is_busy(&self) -> bool {
            self.busy
        }
        fn attack_power(&self) -> f64 {
            20.0
        }
    }

    const IDLE: Walker = Walker { busy: false };

    #[derive(Debug, Default)]
    struct Gate {
        open: AtomicBool,
    }

    impl CheckpointRule for Gate {
        fn is_cleared(&self, _: &dyn TerrainGrid, _: &dyn Agent, _: Point) -> bool {
            self.open.load(Ordering::SeqCst)
        }
        fn process(
            &self,
            _: &dyn TerrainGrid,
            _: &dyn Agent,
            _: Point,
            _: f64,
        ) -> Option<GridMutation> {
            None
        }
    }

    fn model() -> CostModel {
        CostModel::for_unit(UnitKind::Ground, 1)
    }

    fn straight(map: &TileMap) -> Route {
        let target = Point::new(map.width() as i32 - 1, 0);
        Pathfinder::for_unit(UnitKind::Ground, 1)
            .find_path(map, Point::new(0, 0), target, None)
            .unwrap()
    }

    #[test]
    fn five_cells_at_unit_speed() {
        let map = TileMap::from_ascii(".....");
        let mut path = Path::new(straight(&map), 1.0);
        let step = path.advance(&map, &IDLE, 1.0);
        assert_eq!(path.position(), 1.0);
        assert_eq!(step.from, Point::new(0, 0));
        assert_eq!(step.to, Point::new(1, 0));
        assert_eq!(step.progress, 0.0);
        let step = path.advance(&map, &IDLE, 0.5);
        assert_eq!(step.from, Point::new(1, 0));
        assert_eq!(step.to, Point::new(2, 0));
        assert_eq!(step.progress, 0.5);
        assert!(!path.is_halted(&map, &IDLE));
        // Cumulative time 4
        for _ in 0..2 {
            path.advance(&map, &IDLE, 1.0);
        }
        path.advance(&map, &IDLE, 0.5);
        assert_eq!(path.position(), 4.0);
        assert!(path.is_finished());
        assert!(path.is_halted(&map, &IDLE));
        let step = path.advance(&map, &IDLE, 10.0);
        assert_eq!(step.from, Point::new(3, 0));
        assert_eq!(step.to, Point::new(4, 0));
        assert_eq!(step.progress, 0.0);
    }

    #[test]
    fn a_fresh_cursor_reports_its_first_step() {
        let map = TileMap::from_ascii("...");
        let mut path = Path::new(straight(&map), 1.0);
        let step = path.advance(&map, &Walker { busy: true }, 1.0);
        assert_eq!(step.from, Point::new(0, 0));
        assert_eq!(step.to, Point::new(1, 0));
        assert_eq!(step.progress, 0.0);
    }

    #[test]
    fn nan_time_or_speed_stands_still() {
        let map = TileMap::from_ascii(".....");
        let mut path = Path::new(straight(&map), 1.0);
        path.advance(&map, &IDLE, f64::NAN);
        assert_eq!(path.position(), 0.0);
        assert_eq!(path.predict_position_after(f64::NAN), 0.0);
        path.set_speed(f64::NAN);
        path.advance(&map, &IDLE, 1.0);
        assert_eq!(path.position(), 0.0);
        assert_eq!(path.predict_position_after(1.0), 0.0);
    }

    #[test]
    fn expensive_cells_are_slower() {
        let map = TileMap::from_ascii("..::..");
        let mut path = Path::new(straight(&map), 2.0);
        // Steps cost 1 and 1.25 at speed 2
        path.advance(&map, &IDLE, 1.125);
        assert_eq!(path.position(), 2.0);
        let step = path.advance(&map, &IDLE, 0.375);
        assert_eq!(step.progress, 0.5);
        assert_eq!(step.from, Point::new(2, 0));
    }

    #[test]
    fn busy_agents_hold_position() {
        let map = TileMap::from_ascii("....");
        let mut path = Path::new(straight(&map), 1.0);
        path.advance(&map, &Walker { busy: true }, 2.0);
        assert_eq!(path.position(), 0.0);
    }

    #[test]
    fn prediction_matches_advance_without_mutating() {
        let map = TileMap::from_ascii("..::,,..");
        let mut path = Path::new(straight(&map), 1.5);
        path.advance(&map, &IDLE, 0.4);
        let before = path.clone();
        assert_eq!(path.predict_position_after(0.0), path.position());
        let predicted = path.predict_position_after(2.5);
        assert_eq!(path, before);
        path.advance(&map, &IDLE, 2.5);
        assert!((predicted - path.position()).abs() < 1e-9);
        assert_eq!(path.predict_position_after(1e12), 7.0);
        assert_eq!(path.predict_position_after(f64::INFINITY), 7.0);
    }

    #[test]
    fn failing_checkpoint_halts_one_cell_short() {
        let map = TileMap::from_ascii("......");
        let route = straight(&map);
        let gate = Arc::new(Gate::default());
        let checkpoint = Checkpoint::new(3, Point::new(3, 0), CheckpointKind::Custom(gate.clone()));
        let mut path = Path::with_checkpoints(route, 1.0, vec![checkpoint]);
        for _ in 0..20 {
            let step = path.advance(&map, &IDLE, 0.7);
            assert!(path.position() <= 2.0);
            assert!(step.progress == 0.0 || path.position() < 2.0);
        }
        assert_eq!(path.position(), 2.0);
        assert!(path.is_halted(&map, &IDLE));
        gate.open.store(true, Ordering::SeqCst);
        assert!(!path.is_halted(&map, &IDLE));
        path.advance(&map, &IDLE, 1.5);
        assert_eq!(path.position(), 3.5);
        assert!(path.next_checkpoint().is_none());
    }

    #[test]
    fn interaction_clears_the_way() {
        let mut map = TileMap::from_ascii("..F..");
        let route = straight(&map);
        let checkpoints = Destructibles.checkpoints(&route, &map);
        let mut path = Path::with_checkpoints(route, 1.0, checkpoints);
        // The fence (60 hp) sits at index 2
        path.advance(&map, &IDLE, 5.0);
        assert_eq!(path.position(), 1.0);
        let mut ticks = 0;
        while let Some(mutation) = path.interact(&map, &IDLE, 1.0) {
            map.apply(&mutation);
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert!(!path.is_halted(&map, &IDLE));
        path.recompute(&map, &model());
        path.advance(&map, &IDLE, 3.0);
        assert!(path.is_finished());
    }

    #[test]
    fn fresh_clones_share_the_route() {
        let map = TileMap::from_ascii("..F..");
        let route = straight(&map);
        let checkpoints = Destructibles.checkpoints(&route, &map);
        let path = Path::with_checkpoints(route, 1.0, checkpoints);
        let copy = path.clone_fresh();
        assert_eq!(copy, path);
        assert!(Arc::ptr_eq(copy.route(), path.route()));
        assert!(!std::ptr::eq(&copy, &path));

        let mut moved = path.clone_fresh();
        moved.advance(&map, &IDLE, 1.0);
        let again = moved.clone_fresh();
        assert_eq!(again.position(), 0.0);
        assert_eq!(again.next_checkpoint(), path.next_checkpoint());
    }

    #[test]
    fn recompute_twice_is_a_no_op() {
        let mut map = TileMap::from_ascii("......");
        let mut path = Path::new(straight(&map), 1.0);
        path.advance(&map, &IDLE, 1.5);
        map.set_terrain(Point::new(4, 0), Terrain::Sand);
        assert!(path.recompute(&map, &model()));
        let once = path.clone();
        assert!(!path.recompute(&map, &model()));
        assert_eq!(path, once);
        assert_eq!(path.position(), 1.5);
        assert_eq!(path.route().sections(), once.route().sections());
    }

    #[test]
    fn recompute_does_not_touch_other_cursors() {
        let mut map = TileMap::from_ascii("......");
        let shared = Path::new(straight(&map), 1.0);
        let mut own = shared.clone_fresh();
        map.set_terrain(Point::new(3, 0), Terrain::Sand);
        own.recompute(&map, &model());
        assert!(!Arc::ptr_eq(own.route(), shared.route()));
        assert_eq!(shared.route().cost(3), 1.0);
    }

    #[test]
    fn blocked_route_is_truncated() {
        let mut map = TileMap::from_ascii("......");
        let mut path = Path::new(straight(&map), 1.0);
        map.set_terrain(Point::new(4, 0), Terrain::Rock);
        path.recompute(&map, &model());
        assert!(path.is_truncated());
        assert_eq!(path.limit(), 3);
        assert_eq!(path.predict_position_after(100.0), 3.0);
        path.advance(&map, &IDLE, 100.0);
        assert_eq!(path.position(), 3.0);
        assert!(path.is_finished());
    }

    #[test]
    fn lost_cell_resumes_ahead() {
        let mut map = TileMap::from_ascii("......");
        let mut path = Path::new(straight(&map), 1.0);
        path.advance(&map, &IDLE, 1.25);
        map.set_terrain(Point::new(1, 0), Terrain::Rock);
        path.recompute(&map, &model());
        assert_eq!(path.position(), 2.0);
        assert!(!path.is_truncated());
    }

    #[test]
    fn nothing_left_marks_the_path_done() {
        let mut map = TileMap::from_ascii("....");
        let mut path = Path::new(straight(&map), 1.0);
        path.advance(&map, &IDLE, 1.0);
        for x in 1..4 {
            map.set_terrain(Point::new(x, 0), Terrain::Rock);
        }
        path.recompute(&map, &model());
        assert_eq!(path.position(), 1.0);
        assert!(path.is_finished());
        assert!(path.is_truncated());
    }

    #[test]
    fn passed_checkpoints_are_dropped() {
        let map = TileMap::from_ascii("......");
        let route = straight(&map);
        let gate = Arc::new(Gate::default());
        let checkpoints = vec![
            Checkpoint::new(0, Point::new(0, 0), CheckpointKind::Custom(gate.clone())),
            Checkpoint::new(2, Point::new(2, 0), CheckpointKind::WaterCrossing),
            Checkpoint::new(9, Point::new(9, 0), CheckpointKind::Custom(gate)),
        ];
        let mut path = Path::with_checkpoints(route, 1.0, checkpoints);
        assert_eq!(path.next_checkpoint().map(|c| c.index), Some(2));
        path.advance(&map, &IDLE, 2.5);
        assert!(path.next_checkpoint().is_none());

        // Checkpoints the cursor already stands past after a recompute
        let route = straight(&map);
        let gate = Arc::new(Gate::default());
        let mut path = Path::new(route.clone(), 1.0);
        path.advance(&map, &IDLE, 3.5);
        let mut late = Path::with_checkpoints(
            route,
            1.0,
            vec![Checkpoint::new(2, Point::new(2, 0), CheckpointKind::Custom(gate))],
        );
        late.index = path.position();
        late.recompute(&map, &model());
        assert!(late.next_checkpoint().is_none());
        assert!(!late.is_halted(&map, &IDLE));
    }
}
