//! # hive_pathfinding
//!
//! Terrain pathfinding and movement for units on a mutable, weighted grid.
//! Routes are found with a weighted
//! [A*](https://en.wikipedia.org/wiki/A*_search_algorithm) search that blends
//! in the cost of the cells a diagonal step cuts past. Groups of units sharing
//! a spawn point are routed as a *hive*: every route raises the visitation
//! weight of the cells it uses, so later routes in the batch spread out.
//! [Connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! are pre-computed per batch to avoid flood-filling when no route exists.
//!
//! A [Path] follows a [Route] at terrain-dependent speed and halts at
//! [Checkpoint]s (structures to break, trees to fell, water to bridge) until
//! the unit clears them. [PathData] caches the paths of one group and can
//! offload the search to a background [PathWorker].
pub mod checkpoint;
pub mod config;
pub mod cost;
pub mod error;
pub mod path;
pub mod path_data;
pub mod pathfinder;
pub mod route;
pub mod search;
pub mod snapshot;
pub mod terrain;
pub mod tile_map;
pub mod worker;

pub use checkpoint::{Agent, Checkpoint, CheckpointKind, CheckpointProvider};
pub use config::PathfinderConfig;
pub use cost::{CostModel, CostTable, UnitKind};
pub use error::{PathDataError, SnapshotError};
pub use path::{Path, Step};
pub use path_data::{PathData, PathsTicket};
pub use pathfinder::{Pathfinder, VisitWeights};
pub use route::{Route, Section};
pub use terrain::{Category, Cell, GridMutation, StructureKind, Terrain, TerrainGrid};
pub use tile_map::TileMap;
pub use worker::{PathWorker, PendingPaths, WorkerHandle, WorkerRequest, WorkerResponse};

/// Inline capacity of successor lists, one slot per neighbour.
pub const N_SMALLVEC_SIZE: usize = 8;
