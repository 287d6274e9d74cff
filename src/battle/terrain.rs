//! War grid terrain types and their effects

use serde::{Deserialize, Serialize};

use crate::battle::constants::{FOREST_VISION_PENALTY, HILLS_VISION_BONUS};

/// Terrain type of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    #[default]
    Plains,
    Forest,
    Hills,
    River,  // Impassable without bridge builders
    Bridge, // Map feature, never generated randomly
    Wall,   // Map feature, never generated randomly
}

impl TerrainType {
    /// Terrain drawn by random generation; bridges and walls are placed by hand
    pub const GENERATED: [TerrainType; 4] = [
        TerrainType::Plains,
        TerrainType::Forest,
        TerrainType::Hills,
        TerrainType::River,
    ];

    /// Change to a unit's tile-window vision radius when standing here
    pub fn vision_radius_modifier(&self) -> i32 {
        match self {
            TerrainType::Hills => HILLS_VISION_BONUS,
            TerrainType::Forest => -FOREST_VISION_PENALTY,
            _ => 0,
        }
    }

    /// Divisor applied to a vision stat when looking across this tile
    ///
    /// Walls are not in the detection table and take the neutral fallback.
    pub fn vision_penalty(&self) -> f32 {
        match self {
            TerrainType::Plains => 1.0,
            TerrainType::Forest => 2.0,
            TerrainType::Hills => 0.75,
            TerrainType::River => 1.5,
            TerrainType::Bridge => 1.0,
            TerrainType::Wall => 1.0,
        }
    }
}
