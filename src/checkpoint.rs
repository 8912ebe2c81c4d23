//! Checkpoints are interactions a unit has to complete before it may step onto
//! a route index: breaking a structure, chopping a tree, bridging water or
//! converting terrain. Providers scan a [Route] for one kind of interaction
//! each and can be combined.
use crate::cost::footprint;
use crate::route::Route;
use crate::terrain::{GridMutation, Terrain, TerrainGrid};
use core::fmt;
use fxhash::FxHashSet;
use grid_util::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the pathing code needs to know about the unit following a path.
pub trait Agent {
    /// Side length of the unit's square footprint in cells.
    fn scale(&self) -> u8;
    /// A busy unit (mid-attack, stunned, ...) holds its position.
    fn is_busy(&self) -> bool {
        false
    }
    /// Damage dealt per unit of time when attacking a structure.
    fn attack_power(&self) -> f64;
}

/// Clearance rule and processing action for checkpoints defined outside this
/// crate.
pub trait CheckpointRule: fmt::Debug + Send + Sync {
    fn is_cleared(&self, grid: &dyn TerrainGrid, agent: &dyn Agent, point: Point) -> bool;
    fn process(
        &self,
        grid: &dyn TerrainGrid,
        agent: &dyn Agent,
        point: Point,
        dt: f64,
    ) -> Option<GridMutation>;
}

#[derive(Clone, Debug)]
pub enum CheckpointKind {
    /// A blocking structure that has to be destroyed.
    Destructible,
    /// A tree that has to be felled.
    Tree { chop_time: Duration },
    /// Water that has to be bridged.
    WaterCrossing,
    /// Terrain the unit converts before moving on.
    TerrainConversion { from: Terrain, to: Terrain },
    Custom(Arc<dyn CheckpointRule>),
}

impl PartialEq for CheckpointKind {
    fn eq(&self, other: &Self) -> bool {
        use CheckpointKind::*;
        match (self, other) {
            (Destructible, Destructible) | (WaterCrossing, WaterCrossing) => true,
            (Tree { chop_time: a }, Tree { chop_time: b }) => a == b,
            (
                TerrainConversion { from: f1, to: t1 },
                TerrainConversion { from: f2, to: t2 },
            ) => f1 == f2 && t1 == t2,
            (Custom(a), Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// An interaction bound to one route index. `point` is the cell the
/// interaction targets, which for large units may differ from the route cell
/// at `index`.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub index: usize,
    pub point: Point,
    pub kind: CheckpointKind,
}

impl Checkpoint {
    pub fn new(index: usize, point: Point, kind: CheckpointKind) -> Checkpoint {
        Checkpoint { index, point, kind }
    }

    /// Whether the unit may move on to `index`.
    pub fn is_cleared<G: TerrainGrid, A: Agent>(&self, grid: &G, agent: &A) -> bool {
        let Some(cell) = grid.cell(self.point) else {
            // Nothing left to interact with
            return true;
        };
        match &self.kind {
            CheckpointKind::Destructible => !cell.has_blocking_structure(),
            CheckpointKind::Tree { .. } => cell.terrain != Terrain::Tree,
            CheckpointKind::WaterCrossing => cell.terrain != Terrain::Water,
            CheckpointKind::TerrainConversion { from, .. } => cell.terrain != *from,
            CheckpointKind::Custom(rule) => rule.is_cleared(grid, agent, self.point),
        }
    }

    /// The grid change the unit performs this tick while it is blocked here.
    /// The caller applies it through the grid's own API.
    pub fn process<G: TerrainGrid, A: Agent>(
        &self,
        grid: &G,
        agent: &A,
        dt: f64,
    ) -> Option<GridMutation> {
        if self.is_cleared(grid, agent) {
            return None;
        }
        let point = self.point;
        match &self.kind {
            CheckpointKind::Destructible => Some(GridMutation::DamageStructure {
                point,
                amount: agent.attack_power() * dt,
            }),
            CheckpointKind::Tree { chop_time } => Some(GridMutation::FellTree {
                point,
                delay: *chop_time,
            }),
            CheckpointKind::WaterCrossing => Some(GridMutation::SetTerrain {
                point,
                terrain: Terrain::Bridge,
            }),
            CheckpointKind::TerrainConversion { to, .. } => Some(GridMutation::SetTerrain {
                point,
                terrain: *to,
            }),
            CheckpointKind::Custom(rule) => rule.process(grid, agent, point, dt),
        }
    }
}

/// Scans a route for one kind of interaction.
pub trait CheckpointProvider {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint>;
}

impl<F> CheckpointProvider for F
where
    F: Fn(&Route, &dyn TerrainGrid) -> Vec<Checkpoint>,
{
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        self(route, grid)
    }
}

/// Emits a checkpoint for every footprint cell matching `pred`, bound to the
/// first route index (after the origin) whose footprint covers it.
fn scan<P>(route: &Route, grid: &dyn TerrainGrid, kind: CheckpointKind, pred: P) -> Vec<Checkpoint>
where
    P: Fn(&crate::terrain::Cell) -> bool,
{
    let mut seen = FxHashSet::default();
    let mut found = Vec::new();
    for (index, anchor) in route.points().enumerate().skip(1) {
        for point in footprint(anchor, route.scale()) {
            if grid.cell(point).map_or(false, |c| pred(&c)) && seen.insert(point) {
                found.push(Checkpoint::new(index, point, kind.clone()));
            }
        }
    }
    found
}

/// Structures standing in the way.
#[derive(Clone, Copy, Debug, Default)]
pub struct Destructibles;

impl CheckpointProvider for Destructibles {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        scan(route, grid, CheckpointKind::Destructible, |c| {
            c.has_blocking_structure()
        })
    }
}

/// Trees inside the unit's footprint along the route.
#[derive(Clone, Copy, Debug)]
pub struct Trees {
    pub chop_time: Duration,
}

impl Default for Trees {
    fn default() -> Trees {
        Trees {
            chop_time: Duration::from_secs(3),
        }
    }
}

impl CheckpointProvider for Trees {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        let kind = CheckpointKind::Tree {
            chop_time: self.chop_time,
        };
        scan(route, grid, kind, |c| c.terrain == Terrain::Tree)
    }
}

/// Water the unit bridges by building on it.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaterCrossings;

impl CheckpointProvider for WaterCrossings {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        scan(route, grid, CheckpointKind::WaterCrossing, |c| {
            c.terrain == Terrain::Water
        })
    }
}

/// Terrain of one type the unit converts into another as it goes, such as
/// grass trampled into dirt.
#[derive(Clone, Copy, Debug)]
pub struct TerrainConversions {
    pub from: Terrain,
    pub to: Terrain,
}

impl CheckpointProvider for TerrainConversions {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        let kind = CheckpointKind::TerrainConversion {
            from: self.from,
            to: self.to,
        };
        let from = self.from;
        scan(route, grid, kind, |c| c.terrain == from && c.structure.is_none())
    }
}

/// Applies its provider to a route with a fixed probability.
#[derive(Debug)]
pub struct Maybe<P> {
    inner: P,
    probability: f64,
    rng: Mutex<StdRng>,
}

impl<P> Maybe<P> {
    pub fn new(inner: P, probability: f64, seed: u64) -> Maybe<P> {
        Maybe {
            inner,
            probability: probability.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<P: CheckpointProvider> CheckpointProvider for Maybe<P> {
    fn checkpoints(&self, route: &Route, grid: &dyn TerrainGrid) -> Vec<Checkpoint> {
        let apply = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_bool(self.probability);
        if apply {
            self.inner.checkpoints(route, grid)
        } else {
            Vec::new()
        }
    }
}

/// Runs every provider over the route and orders the result by index, so a
/// unit handles interactions in the order it physically reaches them.
/// Checkpoints sharing an index keep the order of their providers.
pub fn combine(
    route: &Route,
    grid: &dyn TerrainGrid,
    providers: &[&dyn CheckpointProvider],
) -> Vec<Checkpoint> {
    let mut checkpoints: Vec<Checkpoint> = providers
        .iter()
        .flat_map(|provider| provider.checkpoints(route, grid))
        .collect();
    checkpoints.sort_by_key(|c| c.index);
    checkpoints
}
