use crate::config::PathfinderConfig;
use crate::cost::{CostModel, UnitKind};
use crate::route::Route;
use crate::search::{astar, Reachability};
use crate::terrain::TerrainGrid;
use crate::N_SMALLVEC_SIZE;
use fxhash::FxHashMap;
use grid_util::Point;
use log::{debug, info};
use smallvec::SmallVec;

/// Neighbour offsets in clockwise order starting north. Even indices are
/// cardinal; the diagonal at an odd index `i` lies between the cardinals at
/// `i - 1` and `(i + 1) % 8`.
const NEIGHBOURS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Per-cell multipliers accumulated while a hive batch is searched. Every
/// route found in the batch makes its cells a little more expensive for the
/// searches that follow, so units sharing a spawn spread out instead of
/// queueing on one line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisitWeights {
    weights: FxHashMap<Point, f64>,
}

impl VisitWeights {
    pub fn new() -> VisitWeights {
        VisitWeights::default()
    }

    /// The multiplier of a cell, 1 when no route has visited it yet.
    pub fn get(&self, point: &Point) -> f64 {
        self.weights.get(point).copied().unwrap_or(1.0)
    }

    pub fn bump(&mut self, point: Point, amount: f64) {
        *self.weights.entry(point).or_insert(1.0) += amount;
    }

    /// Applies the hive bumps for every cell of `route`.
    pub fn record<G: TerrainGrid>(&mut self, grid: &G, route: &Route, config: &PathfinderConfig) {
        for point in route.points() {
            let mut amount = config.hive_step_bump;
            if grid.cell(point).map_or(false, |c| c.has_blocking_structure()) {
                amount += config.hive_structure_bump;
            }
            self.bump(point, amount);
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn clear(&mut self) {
        self.weights.clear();
    }
}

/// Weighted A* over a [TerrainGrid] for one [CostModel].
#[derive(Clone, Debug, PartialEq)]
pub struct Pathfinder {
    model: CostModel,
    config: PathfinderConfig,
}

impl Pathfinder {
    pub fn new(model: CostModel, config: PathfinderConfig) -> Pathfinder {
        Pathfinder { model, config }
    }

    pub fn for_unit(kind: UnitKind, scale: u8) -> Pathfinder {
        Pathfinder::new(CostModel::for_unit(kind, scale), PathfinderConfig::default())
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    fn weighted_cost<G: TerrainGrid>(
        &self,
        grid: &G,
        point: Point,
        weights: Option<&VisitWeights>,
    ) -> Option<f64> {
        let cost = self.model.multiplied_cost(grid, point)?;
        Some(weights.map_or(cost, |w| cost * w.get(&point)))
    }

    /// Passable neighbours of `node` with the cost of stepping onto them.
    /// Diagonal steps need both adjoining cardinal cells to be passable, pay a
    /// quarter of their costs on top and are refused outright when those two
    /// costs exceed the configured maximum.
    pub fn successors<G: TerrainGrid>(
        &self,
        grid: &G,
        node: &Point,
        weights: Option<&VisitWeights>,
    ) -> SmallVec<[(Point, f64); N_SMALLVEC_SIZE]> {
        let points = NEIGHBOURS.map(|(dx, dy)| Point::new(node.x + dx, node.y + dy));
        let costs = points.map(|p| self.weighted_cost(grid, p, weights));
        let mut succ = SmallVec::new();
        for i in 0..8 {
            let Some(cost) = costs[i] else {
                continue;
            };
            if i % 2 == 0 {
                succ.push((points[i], cost));
                continue;
            }
            if let (Some(c1), Some(c2)) = (costs[i - 1], costs[(i + 1) % 8]) {
                let corners = c1 + c2;
                if corners <= self.config.max_diagonal_cost {
                    succ.push((points[i], cost + corners / 4.0));
                }
            }
        }
        succ
    }

    fn heuristic(&self, p1: &Point, p2: &Point) -> f64 {
        ((p1.x - p2.x).abs() + (p1.y - p2.y).abs()) as f64 * self.config.heuristic_factor
    }

    /// Computes a route from origin to target. `weights` biases the search
    /// with hive visitation multipliers. Returns [None] when the target cannot
    /// be reached.
    pub fn find_path<G: TerrainGrid>(
        &self,
        grid: &G,
        origin: Point,
        target: Point,
        weights: Option<&VisitWeights>,
    ) -> Option<Route> {
        let result = astar(
            &origin,
            |node| self.successors(grid, node, weights),
            |point| self.heuristic(point, &target),
            |point, _| *point == target,
        );
        match result {
            Some((points, cost)) => {
                debug!(
                    "Found route {:?} -> {:?} of {} cells, cost {cost:.2}",
                    origin,
                    target,
                    points.len()
                );
                Some(Route::build(grid, &self.model, points))
            }
            None => {
                debug!("{:?} is not reachable from {:?}", target, origin);
                None
            }
        }
    }

    /// Searches one route per origin, in order, threading `weights` through
    /// the batch so each route is biased away from the cells of the routes
    /// before it. The result is aligned with `origins`.
    pub fn find_hive_path<G: TerrainGrid>(
        &self,
        grid: &G,
        origins: &[Point],
        target: Point,
        weights: &mut VisitWeights,
    ) -> Vec<Option<Route>> {
        self.find_hive_path_while(grid, origins, target, weights, || true)
            .unwrap_or_default()
    }

    /// Like [find_hive_path](Self::find_hive_path), but consults `keep_going`
    /// before every origin and gives up with [None] once it returns false.
    pub fn find_hive_path_while<G, F>(
        &self,
        grid: &G,
        origins: &[Point],
        target: Point,
        weights: &mut VisitWeights,
        mut keep_going: F,
    ) -> Option<Vec<Option<Route>>>
    where
        G: TerrainGrid,
        F: FnMut() -> bool,
    {
        info!(
            "Hive search for {} origins towards {:?}",
            origins.len(),
            target
        );
        let reachability = Reachability::build(grid, &self.model);
        let mut routes = Vec::with_capacity(origins.len());
        for origin in origins {
            if !keep_going() {
                info!("Hive search abandoned after {} origins", routes.len());
                return None;
            }
            // Origins on impassable cells (a unit inside a wall) have no
            // component of their own, so only the search can tell.
            if reachability.get_component(origin).is_some()
                && reachability.unreachable(origin, &target)
            {
                debug!("{:?} is not reachable from {:?}", target, origin);
                routes.push(None);
                continue;
            }
            let route = self.find_path(grid, *origin, target, Some(&*weights));
            if let Some(route) = &route {
                weights.record(grid, route, &self.config);
            }
            routes.push(route);
        }
        Some(routes)
    }

    /// Cost of a single cell (`to` is [None]) or of the step between two
    /// adjacent cells, consistent with the penalties the search applies.
    pub fn get_cost<G: TerrainGrid>(&self, grid: &G, from: Point, to: Option<Point>) -> Option<f64> {
        self.model.step_cost(grid, from, to)
    }
}
