//! Fog of war
//!
//! Two separate computations live here:
//! - the tile window every unit reveals (feeds the `vision_update` log entry)
//! - enemy detection between unit pairs (feeds each unit's `visible_enemies`)

use std::collections::HashSet;

use crate::battle::participants::WarKind;
use crate::battle::terrain::TerrainType;
use crate::battle::unit_type::StatTable;
use crate::battle::units::Unit;
use crate::battle::war_grid::WarGrid;
use crate::core::types::{GridPos, UnitId};

/// Radius of the square window a unit reveals from its current tile
pub fn vision_radius(unit: &Unit, grid: &WarGrid, base_vision: i32) -> i32 {
    let modifier = grid
        .terrain_at(unit.position)
        .map(|t| t.vision_radius_modifier())
        .unwrap_or(0);
    (base_vision + modifier).max(0)
}

/// Union of every unit's vision window, clipped to the grid
pub fn compute_visible_tiles(units: &[Unit], grid: &WarGrid, base_vision: i32) -> HashSet<GridPos> {
    let mut visible = HashSet::new();

    for unit in units.iter().filter(|u| u.is_alive()) {
        let radius = vision_radius(unit, grid, base_vision);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let pos = GridPos::new(unit.position.x + dx, unit.position.y + dy);
                if grid.in_bounds(pos) {
                    visible.insert(pos);
                }
            }
        }
    }

    visible
}

/// Vision stat reduced by the terrain halfway between observer and target
///
/// Unknown terrain (off-grid midpoint) takes the neutral 1.0 penalty.
pub fn effective_vision_range(base_vision: f32, midpoint_terrain: Option<TerrainType>) -> f32 {
    let penalty = midpoint_terrain.map(|t| t.vision_penalty()).unwrap_or(1.0);
    base_vision / penalty
}

/// Can `observer` detect `target` this tick?
pub fn can_detect(observer: &Unit, target: &Unit, grid: &WarGrid, stats: &StatTable) -> bool {
    let midpoint = observer.position.midpoint(&target.position);
    let range = effective_vision_range(
        stats.get(observer.unit_type).vision_range,
        grid.terrain_at(midpoint),
    );
    observer.position.chebyshev_distance(&target.position) as f32 <= range
}

/// Enemy units a unit can currently detect, in roster order
pub fn visible_enemies(
    observer: &Unit,
    units: &[Unit],
    kind: &WarKind,
    grid: &WarGrid,
    stats: &StatTable,
) -> Vec<UnitId> {
    units
        .iter()
        .filter(|other| other.is_alive())
        .filter(|other| kind.are_opposed(observer.kingdom_id, other.kingdom_id))
        .filter(|other| can_detect(observer, other, grid, stats))
        .map(|other| other.id)
        .collect()
}

/// Refresh the published `visible_enemies` field on every living unit
pub fn update_visible_enemies(units: &mut [Unit], kind: &WarKind, grid: &WarGrid, stats: &StatTable) {
    let sightings: Vec<Vec<UnitId>> = units
        .iter()
        .map(|unit| {
            if unit.is_alive() {
                visible_enemies(unit, units, kind, grid, stats)
            } else {
                Vec::new()
            }
        })
        .collect();

    for (unit, seen) in units.iter_mut().zip(sightings) {
        unit.visible_enemies = seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit_type::UnitType;
    use crate::core::types::KingdomId;

    fn unit_at(id: u64, kingdom: u64, unit_type: UnitType, x: i32, y: i32) -> Unit {
        Unit::new(UnitId(id), KingdomId(kingdom), unit_type, 10, GridPos::new(x, y))
    }

    fn kingdom_war() -> WarKind {
        WarKind::Kingdom {
            attacker: KingdomId(1),
            defender: KingdomId(2),
        }
    }

    #[test]
    fn test_plains_window_is_eleven_wide() {
        let grid = WarGrid::new(60, 20);
        let units = vec![unit_at(1, 1, UnitType::Swordsman, 30, 10)];
        let visible = compute_visible_tiles(&units, &grid, 5);
        assert_eq!(visible.len(), 11 * 11);
    }

    #[test]
    fn test_hills_extend_window_to_seven() {
        let mut grid = WarGrid::new(60, 30);
        grid.set_terrain(GridPos::new(30, 15), TerrainType::Hills);
        let units = vec![unit_at(1, 1, UnitType::Swordsman, 30, 15)];

        assert_eq!(vision_radius(&units[0], &grid, 5), 7);
        let visible = compute_visible_tiles(&units, &grid, 5);
        assert_eq!(visible.len(), 15 * 15);
        assert!(visible.contains(&GridPos::new(37, 22)));
        assert!(!visible.contains(&GridPos::new(38, 15)));
    }

    #[test]
    fn test_forest_shrinks_window_to_four() {
        let mut grid = WarGrid::new(60, 20);
        grid.set_terrain(GridPos::new(30, 10), TerrainType::Forest);
        let units = vec![unit_at(1, 1, UnitType::Swordsman, 30, 10)];

        assert_eq!(vision_radius(&units[0], &grid, 5), 4);
        assert_eq!(compute_visible_tiles(&units, &grid, 5).len(), 9 * 9);
    }

    #[test]
    fn test_window_clipped_at_corner() {
        let grid = WarGrid::new(60, 20);
        let units = vec![unit_at(1, 1, UnitType::Swordsman, 0, 0)];
        assert_eq!(compute_visible_tiles(&units, &grid, 5).len(), 6 * 6);
    }

    #[test]
    fn test_no_units_no_vision() {
        let grid = WarGrid::new(60, 20);
        assert!(compute_visible_tiles(&[], &grid, 5).is_empty());
    }

    #[test]
    fn test_effective_vision_range() {
        assert_eq!(effective_vision_range(6.0, Some(TerrainType::Plains)), 6.0);
        assert_eq!(effective_vision_range(6.0, Some(TerrainType::Forest)), 3.0);
        assert_eq!(effective_vision_range(6.0, Some(TerrainType::Hills)), 8.0);
        assert_eq!(effective_vision_range(6.0, Some(TerrainType::River)), 4.0);
        assert_eq!(effective_vision_range(6.0, None), 6.0);
    }

    #[test]
    fn test_forest_midpoint_hides_enemy() {
        let mut grid = WarGrid::new(60, 20);
        let stats = StatTable::new();
        let mut units = vec![
            unit_at(1, 1, UnitType::Swordsman, 10, 10),
            unit_at(2, 2, UnitType::Swordsman, 15, 10),
        ];

        update_visible_enemies(&mut units, &kingdom_war(), &grid, &stats);
        assert_eq!(units[0].visible_enemies, vec![UnitId(2)]);

        // Midpoint (12, 10) becomes forest: range 6 / 2 = 3 < distance 5
        grid.set_terrain(GridPos::new(12, 10), TerrainType::Forest);
        update_visible_enemies(&mut units, &kingdom_war(), &grid, &stats);
        assert!(units[0].visible_enemies.is_empty());
    }

    #[test]
    fn test_allies_not_reported() {
        let grid = WarGrid::new(60, 20);
        let stats = StatTable::new();
        let mut units = vec![
            unit_at(1, 1, UnitType::Swordsman, 10, 10),
            unit_at(2, 1, UnitType::Swordsman, 11, 10),
        ];
        update_visible_enemies(&mut units, &kingdom_war(), &grid, &stats);
        assert!(units[0].visible_enemies.is_empty());
        assert!(units[1].visible_enemies.is_empty());
    }
}
