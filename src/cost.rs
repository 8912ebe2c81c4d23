//! The cost model: per-category traversal costs and bias multipliers, resolved
//! over the footprint of the unit that is moving.
use crate::terrain::{Category, TerrainGrid};
use grid_util::Point;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Movement cost and bias multiplier per [Category]. A cost of zero (or no
/// entry when deserialized) marks the category as impassable. Multipliers
/// default to 1 and only bias the search; they never make a cell impassable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "CostTableDef", into = "CostTableDef")]
pub struct CostTable {
    costs: [f64; Category::COUNT],
    multipliers: [f64; Category::COUNT],
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct CostTableDef {
    costs: BTreeMap<Category, f64>,
    #[serde(default)]
    multipliers: BTreeMap<Category, f64>,
}

impl From<CostTableDef> for CostTable {
    fn from(def: CostTableDef) -> CostTable {
        let mut table = CostTable::impassable();
        for (category, cost) in def.costs {
            table = table.with_cost(category, cost);
        }
        for (category, multiplier) in def.multipliers {
            table = table.with_multiplier(category, multiplier);
        }
        table
    }
}

impl From<CostTable> for CostTableDef {
    fn from(table: CostTable) -> CostTableDef {
        let mut def = CostTableDef::default();
        for category in Category::ALL {
            if let Some(cost) = table.cost(category) {
                def.costs.insert(category, cost);
            }
            let multiplier = table.multiplier(category);
            if multiplier != 1.0 {
                def.multipliers.insert(category, multiplier);
            }
        }
        def
    }
}

impl CostTable {
    /// A table in which every category is impassable.
    pub fn impassable() -> CostTable {
        CostTable {
            costs: [0.0; Category::COUNT],
            multipliers: [1.0; Category::COUNT],
        }
    }

    /// A table in which every category costs `cost`.
    pub fn uniform(cost: f64) -> CostTable {
        CostTable {
            costs: [cost; Category::COUNT],
            multipliers: [1.0; Category::COUNT],
        }
    }

    pub fn with_cost(mut self, category: Category, cost: f64) -> CostTable {
        self.costs[category.index()] = cost;
        self
    }

    pub fn with_multiplier(mut self, category: Category, multiplier: f64) -> CostTable {
        self.multipliers[category.index()] = multiplier;
        self
    }

    pub fn cost(&self, category: Category) -> Option<f64> {
        let cost = self.costs[category.index()];
        if cost > 0.0 && cost.is_finite() {
            Some(cost)
        } else {
            None
        }
    }

    pub fn multiplier(&self, category: Category) -> f64 {
        self.multipliers[category.index()]
    }

    pub fn is_passable(&self, category: Category) -> bool {
        self.cost(category).is_some()
    }
}

/// The families of units that ship with a default [CostTable].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Walks; chops trees, bridges water and breaks through structures.
    Ground,
    /// Ignores terrain entirely.
    Flying,
    /// Tunnels under structures and rock but cannot cross water.
    Burrowing,
}

impl UnitKind {
    pub fn cost_table(self) -> CostTable {
        use Category::*;
        match self {
            UnitKind::Ground => CostTable::impassable()
                .with_cost(Grass, 1.0)
                .with_cost(Dirt, 1.0)
                .with_cost(Sand, 1.5)
                .with_cost(Road, 1.0)
                .with_cost(Bridge, 1.0)
                .with_cost(Castle, 1.0)
                .with_cost(Tree, 4.0)
                .with_multiplier(Tree, 1.5)
                .with_cost(Water, 6.0)
                .with_multiplier(Water, 2.0)
                .with_cost(Fence, 4.0)
                .with_multiplier(Fence, 2.0)
                .with_cost(Wall, 10.0)
                .with_multiplier(Wall, 2.0)
                .with_cost(Tower, 12.0)
                .with_multiplier(Tower, 2.0),
            UnitKind::Flying => CostTable::uniform(1.0),
            UnitKind::Burrowing => CostTable::uniform(1.0)
                .with_cost(Road, 2.0)
                .with_cost(Tree, 2.0)
                .with_cost(Rock, 3.0)
                .with_cost(Water, 0.0)
                .with_cost(Bridge, 0.0),
        }
    }
}

/// A [CostTable] bound to the footprint size of the units using it. A unit of
/// scale `s` anchored at a cell covers the `s` by `s` block extending towards
/// positive x and y; the block is as expensive as its most expensive cell and
/// impassable if any of its cells is.
#[derive(Clone, Debug, PartialEq)]
pub struct CostModel {
    pub table: CostTable,
    scale: u8,
}

impl CostModel {
    pub fn new(table: CostTable, scale: u8) -> CostModel {
        CostModel {
            table,
            scale: scale.max(1),
        }
    }

    pub fn for_unit(kind: UnitKind, scale: u8) -> CostModel {
        CostModel::new(kind.cost_table(), scale)
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// The cells covered by a unit anchored at `anchor`.
    pub fn footprint(&self, anchor: Point) -> SmallVec<[Point; 4]> {
        footprint(anchor, self.scale)
    }

    /// Raw movement cost of the footprint anchored at `point`, or [None] if
    /// any of its cells is absent or impassable.
    pub fn cell_cost<G: TerrainGrid>(&self, grid: &G, point: Point) -> Option<f64> {
        let mut worst: f64 = 0.0;
        for p in self.footprint(point) {
            let cost = self.table.cost(grid.cell(p)?.category())?;
            worst = worst.max(cost);
        }
        Some(worst)
    }

    /// Bias multiplier of the footprint anchored at `point`.
    pub fn multiplier<G: TerrainGrid>(&self, grid: &G, point: Point) -> f64 {
        self.footprint(point)
            .into_iter()
            .filter_map(|p| grid.cell(p))
            .map(|cell| self.table.multiplier(cell.category()))
            .reduce(f64::max)
            .unwrap_or(1.0)
    }

    /// Cost times multiplier, the value the search works with.
    pub fn multiplied_cost<G: TerrainGrid>(&self, grid: &G, point: Point) -> Option<f64> {
        self.cell_cost(grid, point)
            .map(|cost| cost * self.multiplier(grid, point))
    }

    pub fn is_passable<G: TerrainGrid>(&self, grid: &G, point: Point) -> bool {
        self.cell_cost(grid, point).is_some()
    }

    /// Cost of a single cell, or of the step between two adjacent cells: the
    /// mean of both cells plus, for a diagonal step, a quarter of the two
    /// corner cells it cuts past. [None] when a cell involved is impassable or
    /// the cells are not adjacent.
    pub fn step_cost<G: TerrainGrid>(&self, grid: &G, from: Point, to: Option<Point>) -> Option<f64> {
        let from_cost = self.cell_cost(grid, from)?;
        let Some(to) = to else {
            return Some(from_cost);
        };
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        if dx.abs() > 1 || dy.abs() > 1 {
            return None;
        }
        let mut cost = (from_cost + self.cell_cost(grid, to)?) / 2.0;
        if dx != 0 && dy != 0 {
            let corner_1 = self.cell_cost(grid, Point::new(to.x, from.y))?;
            let corner_2 = self.cell_cost(grid, Point::new(from.x, to.y))?;
            cost += (corner_1 + corner_2) / 4.0;
        }
        Some(cost)
    }
}

pub(crate) fn footprint(anchor: Point, scale: u8) -> SmallVec<[Point; 4]> {
    let scale = scale.max(1) as i32;
    let mut points = SmallVec::new();
    for dy in 0..scale {
        for dx in 0..scale {
            points.push(Point::new(anchor.x + dx, anchor.y + dy));
        }
    }
    points
}
