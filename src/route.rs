use crate::cost::CostModel;
use crate::terrain::{Category, TerrainGrid};
use fxhash::FxHashSet;
use grid_util::Point;
use log::warn;

/// One cell of a [Route] together with the category it resolved to when the
/// route was last (re)computed. The category is [None] when the grid no
/// longer has a cell at that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteCell {
    pub point: Point,
    pub category: Option<Category>,
}

/// A run of route indices `[start, end)` that share one step cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Section {
    pub start: usize,
    pub end: usize,
    pub cost: f64,
}

impl Section {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A sequence of 8-adjacent cells from an origin to a target, with the cost
/// of stepping off each cell. The cost at index `i` is the step cost from
/// cell `i` to cell `i + 1`; the last index holds the cost of the target cell
/// itself. Impassable steps cost [f64::INFINITY].
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    cells: Vec<RouteCell>,
    costs: Vec<f64>,
    sections: Vec<Section>,
    members: FxHashSet<Point>,
    scale: u8,
}

impl Route {
    /// Resolves `points` against the grid. `points` must be non-empty and
    /// consecutive points must be 8-adjacent.
    pub(crate) fn build<G: TerrainGrid>(grid: &G, model: &CostModel, points: Vec<Point>) -> Route {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| is_adjacent(w[0], w[1])));
        let members = points
            .iter()
            .flat_map(|p| model.footprint(*p))
            .collect::<FxHashSet<Point>>();
        let mut route = Route {
            cells: points
                .into_iter()
                .map(|point| RouteCell {
                    point,
                    category: None,
                })
                .collect(),
            costs: Vec::new(),
            sections: Vec::new(),
            members,
            scale: model.scale(),
        };
        route.refresh(grid, model);
        route
    }

    /// Rebuilds a route from bare coordinates, such as those sent back by a
    /// path worker. Rejects empty, disconnected or currently impassable runs.
    pub fn rehydrate<G: TerrainGrid>(
        grid: &G,
        model: &CostModel,
        coords: &[(i32, i32)],
    ) -> Option<Route> {
        let points: Vec<Point> = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
        if points.is_empty() {
            return None;
        }
        if let Some(w) = points.windows(2).find(|w| !is_adjacent(w[0], w[1])) {
            warn!("Discarding route with a gap between {:?} and {:?}", w[0], w[1]);
            return None;
        }
        if let Some(p) = points.iter().find(|p| !model.is_passable(grid, **p)) {
            warn!("Discarding route through impassable cell {:?}", p);
            return None;
        }
        Some(Route::build(grid, model, points))
    }

    /// Re-resolves every cell against the grid and recomputes costs and
    /// sections. Returns whether anything changed.
    pub fn refresh<G: TerrainGrid>(&mut self, grid: &G, model: &CostModel) -> bool {
        let mut changed = false;
        for cell in self.cells.iter_mut() {
            let category = grid.cell(cell.point).map(|c| c.category());
            if cell.category != category {
                cell.category = category;
                changed = true;
            }
        }
        let n = self.cells.len();
        let costs: Vec<f64> = (0..n)
            .map(|i| {
                let next = (i + 1 < n).then(|| self.cells[i + 1].point);
                model
                    .step_cost(grid, self.cells[i].point, next)
                    .unwrap_or(f64::INFINITY)
            })
            .collect();
        if costs != self.costs {
            self.sections = build_sections(&costs);
            self.costs = costs;
            changed = true;
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Routes always hold at least their target.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[RouteCell] {
        &self.cells
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells.iter().map(|c| c.point)
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.cells.get(index).map(|c| c.point)
    }

    pub fn origin(&self) -> Point {
        self.cells[0].point
    }

    pub fn target(&self) -> Point {
        self.cells[self.cells.len() - 1].point
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn cost(&self, index: usize) -> f64 {
        self.costs.get(index).copied().unwrap_or(f64::INFINITY)
    }

    /// Sum of the step costs from origin to target.
    pub fn total_cost(&self) -> f64 {
        self.costs[..self.costs.len().saturating_sub(1)].iter().sum()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Index into [sections](Self::sections) of the section holding `index`.
    pub fn section_index(&self, index: usize) -> usize {
        self.sections.partition_point(|s| s.end <= index)
    }

    pub fn is_passable(&self, index: usize) -> bool {
        self.costs.get(index).map_or(false, |c| c.is_finite())
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether any cell covered by this route (including the footprint of
    /// large units) is in `changed`.
    pub fn is_affected_by(&self, changed: &FxHashSet<Point>) -> bool {
        if changed.len() < self.members.len() {
            changed.iter().any(|p| self.members.contains(p))
        } else {
            self.members.iter().any(|p| changed.contains(p))
        }
    }

    pub fn covers(&self, point: &Point) -> bool {
        self.members.contains(point)
    }

    /// Plain coordinates, as exchanged with path workers.
    pub fn to_coords(&self) -> Vec<(i32, i32)> {
        self.points().map(|p| (p.x, p.y)).collect()
    }
}

pub(crate) fn is_adjacent(a: Point, b: Point) -> bool {
    let (dx, dy) = ((a.x - b.x).abs(), (a.y - b.y).abs());
    dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
}

fn build_sections(costs: &[f64]) -> Vec<Section> {
    let n = costs.len().saturating_sub(1);
    let mut sections = Vec::new();
    let mut start = 0;
    for i in 1..=n {
        if i == n || costs[i] != costs[start] {
            sections.push(Section {
                start,
                end: i,
                cost: costs[start],
            });
            start = i;
        }
    }
    sections
}
