use crate::terrain::{
    Cell, GridMutation, Structure, StructureId, StructureKind, Terrain, TerrainGrid,
};
use core::fmt;
use fxhash::FxHashSet;
use grid_util::Point;
use log::debug;
use std::time::Duration;

/// Dense in-memory [TerrainGrid]. Stores cells in row-major order and applies
/// the [GridMutation]s produced by checkpoints, including timed tree felling.
#[derive(Clone, Debug, Default)]
pub struct TileMap {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    next_structure: u32,
    felling: Vec<(Point, Duration)>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, terrain: Terrain) -> TileMap {
        TileMap {
            width,
            height,
            cells: vec![Cell::new(terrain); width * height],
            next_structure: 1,
            felling: Vec::new(),
        }
    }

    /// Builds a map from an ASCII drawing, one row per line:
    ///
    /// | char | cell |
    /// |------|------|
    /// | `.`  | grass |
    /// | `,`  | dirt |
    /// | `:`  | sand |
    /// | `=`  | road |
    /// | `T`  | tree |
    /// | `~`  | water |
    /// | `b`  | bridge |
    /// | `#`  | rock |
    /// | `W`, `F`, `X`, `C` | wall, fence, tower, castle on grass |
    ///
    /// Unknown characters are read as grass and short rows are padded with rock.
    pub fn from_ascii(map: &str) -> TileMap {
        let rows: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut tile_map = TileMap::new(width, rows.len(), Terrain::Rock);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let point = Point::new(x as i32, y as i32);
                let (terrain, structure) = match ch {
                    ',' => (Terrain::Dirt, None),
                    ':' => (Terrain::Sand, None),
                    '=' => (Terrain::Road, None),
                    'T' => (Terrain::Tree, None),
                    '~' => (Terrain::Water, None),
                    'b' => (Terrain::Bridge, None),
                    '#' => (Terrain::Rock, None),
                    'W' => (Terrain::Grass, Some(StructureKind::Wall)),
                    'F' => (Terrain::Grass, Some(StructureKind::Fence)),
                    'X' => (Terrain::Grass, Some(StructureKind::Tower)),
                    'C' => (Terrain::Grass, Some(StructureKind::Castle)),
                    _ => (Terrain::Grass, None),
                };
                tile_map.set_terrain(point, terrain);
                if let Some(kind) = structure {
                    tile_map.place_structure(point, kind);
                }
            }
        }
        tile_map
    }

    fn index(&self, point: Point) -> Option<usize> {
        if self.in_bounds(point) {
            Some(point.y as usize * self.width + point.x as usize)
        } else {
            None
        }
    }

    pub fn cell_mut(&mut self, point: Point) -> Option<&mut Cell> {
        let ix = self.index(point)?;
        self.cells.get_mut(ix)
    }

    /// Sets the terrain of a cell. Returns false when the point is out of bounds.
    pub fn set_terrain(&mut self, point: Point, terrain: Terrain) -> bool {
        match self.cell_mut(point) {
            Some(cell) => {
                cell.terrain = terrain;
                true
            }
            None => false,
        }
    }

    /// Places a structure on a free cell.
    pub fn place_structure(&mut self, point: Point, kind: StructureKind) -> Option<StructureId> {
        let id = StructureId(self.next_structure);
        let cell = self.cell_mut(point)?;
        if cell.structure.is_some() {
            return None;
        }
        cell.structure = Some(Structure::new(id, kind));
        self.next_structure += 1;
        Some(id)
    }

    pub fn remove_structure(&mut self, point: Point) -> Option<Structure> {
        self.cell_mut(point)?.structure.take()
    }

    pub fn set_discovered(&mut self, point: Point, discovered: bool) {
        if let Some(cell) = self.cell_mut(point) {
            cell.discovered = discovered;
        }
    }

    /// Applies a mutation and returns the cells whose pathing state changed.
    pub fn apply(&mut self, mutation: &GridMutation) -> FxHashSet<Point> {
        let mut changed = FxHashSet::default();
        match *mutation {
            GridMutation::SetTerrain { point, terrain } => {
                if self.cell(point).map_or(false, |c| c.terrain != terrain)
                    && self.set_terrain(point, terrain)
                {
                    changed.insert(point);
                }
            }
            GridMutation::DamageStructure { point, amount } => {
                if let Some(cell) = self.cell_mut(point) {
                    if let Some(structure) = cell.structure.as_mut() {
                        structure.hp -= amount;
                        if structure.hp <= 0.0 {
                            debug!("Structure {:?} at {:?} destroyed", structure.id, point);
                            cell.structure = None;
                            changed.insert(point);
                        }
                    }
                }
            }
            GridMutation::FellTree { point, delay } => {
                let is_tree = self.cell(point).map_or(false, |c| c.terrain == Terrain::Tree);
                if is_tree && !self.felling.iter().any(|(p, _)| *p == point) {
                    if delay.is_zero() {
                        self.set_terrain(point, Terrain::Grass);
                        changed.insert(point);
                    } else {
                        self.felling.push((point, delay));
                    }
                }
            }
        }
        changed
    }

    /// Advances scheduled tree felling and returns the cells that changed.
    pub fn advance_time(&mut self, dt: Duration) -> FxHashSet<Point> {
        let mut done = Vec::new();
        self.felling.retain_mut(|(point, remaining)| {
            *remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                done.push(*point);
                false
            } else {
                true
            }
        });
        let mut changed = FxHashSet::default();
        for point in done {
            if self.cell(point).map_or(false, |c| c.terrain == Terrain::Tree) {
                self.set_terrain(point, Terrain::Grass);
                changed.insert(point);
            }
        }
        changed
    }

    /// Number of trees currently scheduled to be felled.
    pub fn pending_fellings(&self) -> usize {
        self.felling.len()
    }
}

impl TerrainGrid for TileMap {
    fn width(&self) -> usize {
        self.width
    }
    fn height(&self) -> usize {
        self.height
    }
    fn cell(&self, point: Point) -> Option<Cell> {
        self.index(point).and_then(|ix| self.cells.get(ix).copied())
    }
}

fn cell_char(cell: &Cell) -> char {
    match cell.structure.map(|s| s.kind) {
        Some(StructureKind::Wall) => 'W',
        Some(StructureKind::Fence) => 'F',
        Some(StructureKind::Tower) => 'X',
        Some(StructureKind::Castle) => 'C',
        None => match cell.terrain {
            Terrain::Grass => '.',
            Terrain::Dirt => ',',
            Terrain::Sand => ':',
            Terrain::Road => '=',
            Terrain::Tree => 'T',
            Terrain::Water => '~',
            Terrain::Bridge => 'b',
            Terrain::Rock => '#',
        },
    }
}

impl fmt::Display for TileMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            let line: String = row.iter().map(cell_char).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
