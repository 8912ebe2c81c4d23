//! Terrain vocabulary shared by the cost model, the checkpoint providers and
//! the grid boundary.
use core::fmt;
use grid_util::Point;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ground type of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Grass,
    Dirt,
    Sand,
    Road,
    Tree,
    Water,
    Bridge,
    Rock,
}

impl Terrain {
    pub const ALL: [Terrain; 8] = [
        Terrain::Grass,
        Terrain::Dirt,
        Terrain::Sand,
        Terrain::Road,
        Terrain::Tree,
        Terrain::Water,
        Terrain::Bridge,
        Terrain::Rock,
    ];

    /// Byte code used by grid snapshots.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Terrain> {
        Terrain::ALL.get(byte as usize).copied()
    }

    pub fn category(self) -> Category {
        match self {
            Terrain::Grass => Category::Grass,
            Terrain::Dirt => Category::Dirt,
            Terrain::Sand => Category::Sand,
            Terrain::Road => Category::Road,
            Terrain::Tree => Category::Tree,
            Terrain::Water => Category::Water,
            Terrain::Bridge => Category::Bridge,
            Terrain::Rock => Category::Rock,
        }
    }
}

/// Kind of structure that can occupy a cell on top of its terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Wall,
    Fence,
    Tower,
    /// The defended target. Never treated as an obstacle to clear.
    Castle,
}

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Wall,
        StructureKind::Fence,
        StructureKind::Tower,
        StructureKind::Castle,
    ];

    /// Byte code used by grid snapshots. Zero is reserved for "no structure".
    pub fn to_byte(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_byte(byte: u8) -> Option<StructureKind> {
        byte.checked_sub(1)
            .and_then(|ix| StructureKind::ALL.get(ix as usize).copied())
    }

    pub fn max_hp(self) -> f64 {
        match self {
            StructureKind::Wall => 200.0,
            StructureKind::Fence => 60.0,
            StructureKind::Tower => 150.0,
            StructureKind::Castle => 1000.0,
        }
    }

    /// Whether units have to break this structure to walk through its cell.
    pub fn is_blocking(self) -> bool {
        !matches!(self, StructureKind::Castle)
    }

    pub fn category(self) -> Category {
        match self {
            StructureKind::Wall => Category::Wall,
            StructureKind::Fence => Category::Fence,
            StructureKind::Tower => Category::Tower,
            StructureKind::Castle => Category::Castle,
        }
    }
}

/// Flat key of the cost tables: a cell's category is the category of its
/// structure if it has one, otherwise the category of its terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Grass,
    Dirt,
    Sand,
    Road,
    Tree,
    Water,
    Bridge,
    Rock,
    Wall,
    Fence,
    Tower,
    Castle,
}

impl Category {
    pub const COUNT: usize = 12;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Grass,
        Category::Dirt,
        Category::Sand,
        Category::Road,
        Category::Tree,
        Category::Water,
        Category::Bridge,
        Category::Rock,
        Category::Wall,
        Category::Fence,
        Category::Tower,
        Category::Castle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(pub u32);

/// A structure standing on a cell. Owned by the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Structure {
    pub id: StructureId,
    pub kind: StructureKind,
    pub hp: f64,
}

impl Structure {
    pub fn new(id: StructureId, kind: StructureKind) -> Structure {
        Structure {
            id,
            kind,
            hp: kind.max_hp(),
        }
    }
}

/// Read-only view of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub terrain: Terrain,
    pub structure: Option<Structure>,
    pub discovered: bool,
}

impl Cell {
    pub fn new(terrain: Terrain) -> Cell {
        Cell {
            terrain,
            structure: None,
            discovered: true,
        }
    }

    pub fn category(&self) -> Category {
        match self.structure {
            Some(structure) => structure.kind.category(),
            None => self.terrain.category(),
        }
    }

    pub fn has_blocking_structure(&self) -> bool {
        self.structure.map_or(false, |s| s.kind.is_blocking())
    }
}

/// The grid boundary the pathfinder consumes. Implementations own the cells;
/// the pathfinding code only ever reads through this trait.
pub trait TerrainGrid {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Looks a cell up by coordinate. Out-of-bounds lookups yield [None].
    fn cell(&self, point: Point) -> Option<Cell>;

    fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width()
            && (point.y as usize) < self.height()
    }
}

impl<G: TerrainGrid + ?Sized> TerrainGrid for &G {
    fn width(&self) -> usize {
        (**self).width()
    }
    fn height(&self) -> usize {
        (**self).height()
    }
    fn cell(&self, point: Point) -> Option<Cell> {
        (**self).cell(point)
    }
}

/// A change a checkpoint asks the grid to make. Checkpoints never write to the
/// grid themselves; the owner of the grid applies these.
#[derive(Clone, Debug, PartialEq)]
pub enum GridMutation {
    SetTerrain { point: Point, terrain: Terrain },
    DamageStructure { point: Point, amount: f64 },
    /// Replace the tree at `point` with grass once `delay` has passed.
    FellTree { point: Point, delay: Duration },
}

impl GridMutation {
    pub fn point(&self) -> Point {
        match *self {
            GridMutation::SetTerrain { point, .. }
            | GridMutation::DamageStructure { point, .. }
            | GridMutation::FellTree { point, .. } => point,
        }
    }
}

impl fmt::Display for GridMutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GridMutation::SetTerrain { point, terrain } => {
                write!(f, "set ({}, {}) to {:?}", point.x, point.y, terrain)
            }
            GridMutation::DamageStructure { point, amount } => {
                write!(f, "damage ({}, {}) by {amount}", point.x, point.y)
            }
            GridMutation::FellTree { point, delay } => {
                write!(f, "fell tree at ({}, {}) in {delay:?}", point.x, point.y)
            }
        }
    }
}
