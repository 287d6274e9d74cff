//! Bounded war grid with a terrain tile for every cell
//!
//! Terrain is generated once per war and read-only afterwards.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::terrain::TerrainType;
use crate::core::types::GridPos;

/// A single terrain cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTile {
    pub pos: GridPos,
    pub terrain: TerrainType,
}

/// The full war grid (row-major terrain matrix)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarGrid {
    pub width: u32,
    pub height: u32,
    tiles: Vec<TerrainType>,
}

impl WarGrid {
    /// Create a grid covered in plains
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![TerrainType::Plains; width as usize * height as usize],
        }
    }

    /// Generate terrain for every cell, drawn uniformly from the generated set
    pub fn generate<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let tiles = (0..width as usize * height as usize)
            .map(|_| TerrainType::GENERATED[rng.gen_range(0..TerrainType::GENERATED.len())])
            .collect();

        Self {
            width,
            height,
            tiles,
        }
    }

    /// Check if a position is within grid bounds
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Terrain at a position, `None` outside the grid
    pub fn terrain_at(&self, pos: GridPos) -> Option<TerrainType> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// Place a map feature (bridge, wall) or override generated terrain
    pub fn set_terrain(&mut self, pos: GridPos, terrain: TerrainType) {
        if let Some(i) = self.index(pos) {
            self.tiles[i] = terrain;
        }
    }

    /// Clamp a position onto the grid
    pub fn clamp(&self, pos: GridPos) -> GridPos {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        GridPos::new(pos.x.clamp(0, max_x), pos.y.clamp(0, max_y))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterate all tiles in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = TerrainTile> + '_ {
        self.tiles.iter().enumerate().map(|(i, terrain)| TerrainTile {
            pos: GridPos::new(
                (i % self.width as usize) as i32,
                (i / self.width as usize) as i32,
            ),
            terrain: *terrain,
        })
    }
}
