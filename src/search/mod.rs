pub mod astar;
pub mod reachability;

pub use astar::astar;
pub use reachability::Reachability;
