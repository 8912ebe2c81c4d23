use serde::{Deserialize, Serialize};

/// Tunable search constants. The defaults are tuned by hand for cost tables
/// whose cheapest terrain costs 1.0 and are not guaranteed to suit other
/// scales.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// A diagonal move is rejected when the multiplied costs of the two
    /// cardinal cells it squeezes between add up to more than this.
    pub max_diagonal_cost: f64,
    /// Added to the visitation weight of every cell a hive route covers.
    pub hive_step_bump: f64,
    /// Added on top of `hive_step_bump` when the covered cell holds a
    /// blocking structure.
    pub hive_structure_bump: f64,
    /// Scales the Manhattan heuristic. Values above 1 trade optimality for
    /// fewer expansions.
    pub heuristic_factor: f64,
}

impl Default for PathfinderConfig {
    fn default() -> PathfinderConfig {
        PathfinderConfig {
            max_diagonal_cost: 24.0,
            hive_step_bump: 0.25,
            hive_structure_bump: 2.0,
            heuristic_factor: 1.0,
        }
    }
}
