use crate::cost::CostModel;
use crate::terrain::TerrainGrid;
use grid_util::Point;
use log::info;
use petgraph::unionfind::UnionFind;

/// Connected components of the passable cells of a grid for one [CostModel].
///
/// Only cardinal neighbours are joined. That is exact for this search since a
/// diagonal step is only ever taken when both cardinal cells it passes are
/// passable, so any diagonal connection also exists through a cardinal one.
#[derive(Clone, Debug)]
pub struct Reachability {
    width: usize,
    height: usize,
    passable: Vec<bool>,
    components: UnionFind<usize>,
}

impl Reachability {
    /// Generates a new [UnionFind] structure and links up passable grid
    /// neighbours to the same components.
    pub fn build<G: TerrainGrid>(grid: &G, model: &CostModel) -> Reachability {
        let (w, h) = (grid.width(), grid.height());
        info!("Generating connected components for a {w}x{h} grid");
        let mut components = UnionFind::new(w * h);
        let passable: Vec<bool> = (0..w * h)
            .map(|ix| model.is_passable(grid, Point::new((ix % w) as i32, (ix / w) as i32)))
            .collect();
        for y in 0..h {
            for x in 0..w {
                let ix = y * w + x;
                if !passable[ix] {
                    continue;
                }
                if x + 1 < w && passable[ix + 1] {
                    components.union(ix, ix + 1);
                }
                if y + 1 < h && passable[ix + w] {
                    components.union(ix, ix + w);
                }
            }
        }
        Reachability {
            width: w,
            height: h,
            passable,
            components,
        }
    }

    fn index(&self, point: &Point) -> Option<usize> {
        if point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width
            && (point.y as usize) < self.height
        {
            Some(point.y as usize * self.width + point.x as usize)
        } else {
            None
        }
    }

    /// Retrieves the component id a given [Point] belongs to, if it is passable.
    pub fn get_component(&self, point: &Point) -> Option<usize> {
        let ix = self.index(point)?;
        self.passable[ix].then(|| self.components.find(ix))
    }

    /// Checks if start and goal are passable and on the same component.
    pub fn reachable(&self, start: &Point, goal: &Point) -> bool {
        match (self.index(start), self.index(goal)) {
            (Some(s), Some(g)) => {
                self.passable[s] && self.passable[g] && self.components.equiv(s, g)
            }
            _ => false,
        }
    }

    pub fn unreachable(&self, start: &Point, goal: &Point) -> bool {
        !self.reachable(start, goal)
    }
}
