//! Stance-driven unit movement
//!
//! Each tick a unit either withdraws, holds, follows its path or wanders its
//! patrol zone. Step size is divided by the movement cost of the tile the unit
//! is standing on, so a unit on a river without bridge builders goes nowhere.

use rand::Rng;

use crate::battle::constants::{
    CAVALRY_FOREST_MOVEMENT_COST, IMPASSABLE_MOVEMENT_COST, OPEN_MOVEMENT_COST,
    ROUGH_MOVEMENT_COST,
};
use crate::battle::terrain::TerrainType;
use crate::battle::unit_type::{StatTable, UnitProperties};
use crate::battle::units::{Unit, UnitStance};
use crate::battle::war_grid::WarGrid;
use crate::core::types::GridPos;

/// What a unit did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementResult {
    pub moved: bool,
    pub reached_target: bool,
    pub withdrawing: bool,
}

/// Divisor applied to the raw step on a given terrain
pub fn terrain_movement_modifier(terrain: TerrainType, props: &UnitProperties) -> f32 {
    match terrain {
        TerrainType::Plains | TerrainType::Bridge => OPEN_MOVEMENT_COST,
        TerrainType::River => {
            if props.builds_bridges {
                OPEN_MOVEMENT_COST
            } else {
                IMPASSABLE_MOVEMENT_COST
            }
        }
        TerrainType::Forest => {
            if props.is_cavalry {
                CAVALRY_FOREST_MOVEMENT_COST
            } else {
                ROUGH_MOVEMENT_COST
            }
        }
        TerrainType::Hills => ROUGH_MOVEMENT_COST,
        TerrainType::Wall => IMPASSABLE_MOVEMENT_COST,
    }
}

/// Step one axis: clamp to speed, divide by terrain cost, drop the fraction
fn axis_step(delta: i32, speed: i32, modifier: f32) -> i32 {
    let clamped = delta.clamp(-speed, speed);
    (clamped as f32 / modifier).trunc() as i32
}

/// Move a unit toward a target cell; returns true if it landed exactly on it
pub fn move_toward(
    unit: &mut Unit,
    target: GridPos,
    speed: i32,
    grid: &WarGrid,
    props: &UnitProperties,
) -> bool {
    let modifier = grid
        .terrain_at(unit.position)
        .map(|t| terrain_movement_modifier(t, props))
        .unwrap_or(OPEN_MOVEMENT_COST);

    let step_x = axis_step(target.x - unit.position.x, speed, modifier);
    let step_y = axis_step(target.y - unit.position.y, speed, modifier);

    unit.position = grid.clamp(GridPos::new(unit.position.x + step_x, unit.position.y + step_y));
    unit.position == target
}

/// Follow the unit's path one step, popping the waypoint once reached
fn follow_path(unit: &mut Unit, grid: &WarGrid, props: &UnitProperties) -> MovementResult {
    let Some(next) = unit.path.front().copied() else {
        return MovementResult::default();
    };

    let start = unit.position;
    let reached = move_toward(unit, next, props.speed, grid, props);
    if reached {
        unit.path.pop_front();
    }

    MovementResult {
        moved: unit.position != start,
        reached_target: reached,
        withdrawing: false,
    }
}

/// Advance a unit by one tick according to its stance
pub fn advance_unit<R: Rng + ?Sized>(
    unit: &mut Unit,
    grid: &WarGrid,
    stats: &StatTable,
    rng: &mut R,
) -> MovementResult {
    let props = stats.get(unit.unit_type);
    let start = unit.position;

    // Morale collapse overrides every stance
    if unit.is_withdrawing() {
        let reached = match unit.fallback_point {
            Some(point) => move_toward(unit, point, props.speed, grid, &props),
            None => false,
        };
        return MovementResult {
            moved: unit.position != start,
            reached_target: reached,
            withdrawing: true,
        };
    }

    match unit.stance {
        UnitStance::HoldGround => MovementResult::default(),
        UnitStance::AdvanceEngage => follow_path(unit, grid, &props),
        UnitStance::PatrolZone => match unit.patrol_zone {
            Some(zone) => {
                let target = zone.random_cell(rng);
                let reached = move_toward(unit, target, props.speed, grid, &props);
                MovementResult {
                    moved: unit.position != start,
                    reached_target: reached,
                    withdrawing: false,
                }
            }
            None => follow_path(unit, grid, &props),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit_type::UnitType;
    use crate::battle::units::{Morale, PatrolZone};
    use crate::core::types::{KingdomId, UnitId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unit(unit_type: UnitType, x: i32, y: i32) -> Unit {
        Unit::new(UnitId(1), KingdomId(1), unit_type, 10, GridPos::new(x, y))
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    #[test]
    fn test_modifier_table() {
        let foot = UnitType::Swordsman.default_properties();
        let horse = UnitType::Cavalry.default_properties();
        let engineer = UnitType::Engineer.default_properties();

        assert_eq!(terrain_movement_modifier(TerrainType::Plains, &foot), 1.0);
        assert_eq!(terrain_movement_modifier(TerrainType::Bridge, &foot), 1.0);
        assert_eq!(terrain_movement_modifier(TerrainType::Hills, &foot), 1.5);
        assert_eq!(terrain_movement_modifier(TerrainType::Forest, &foot), 1.5);
        assert_eq!(terrain_movement_modifier(TerrainType::Forest, &horse), 2.0);
        assert_eq!(terrain_movement_modifier(TerrainType::River, &foot), 999.0);
        assert_eq!(terrain_movement_modifier(TerrainType::River, &engineer), 1.0);
    }

    #[test]
    fn test_move_toward_on_plains() {
        let grid = WarGrid::new(60, 20);
        let props = UnitType::Swordsman.default_properties();
        let mut u = unit(UnitType::Swordsman, 5, 5);

        let reached = move_toward(&mut u, GridPos::new(10, 4), 2, &grid, &props);
        assert!(!reached);
        assert_eq!(u.position, GridPos::new(7, 4));

        move_toward(&mut u, GridPos::new(10, 4), 2, &grid, &props);
        assert!(move_toward(&mut u, GridPos::new(10, 4), 2, &grid, &props));
        assert_eq!(u.position, GridPos::new(10, 4));
    }

    #[test]
    fn test_move_toward_negative_direction() {
        let grid = WarGrid::new(60, 20);
        let props = UnitType::Swordsman.default_properties();
        let mut u = unit(UnitType::Swordsman, 10, 10);

        move_toward(&mut u, GridPos::new(0, 10), 2, &grid, &props);
        assert_eq!(u.position, GridPos::new(8, 10));
    }

    #[test]
    fn test_river_blocks_foot_units() {
        let mut grid = WarGrid::new(60, 20);
        grid.set_terrain(GridPos::new(5, 5), TerrainType::River);
        let props = UnitType::Swordsman.default_properties();
        let mut u = unit(UnitType::Swordsman, 5, 5);

        for _ in 0..5 {
            assert!(!move_toward(&mut u, GridPos::new(9, 5), 2, &grid, &props));
        }
        assert_eq!(u.position, GridPos::new(5, 5));

        // Moving away is just as impossible
        move_toward(&mut u, GridPos::new(0, 5), 2, &grid, &props);
        assert_eq!(u.position, GridPos::new(5, 5));
    }

    #[test]
    fn test_engineers_cross_river() {
        let mut grid = WarGrid::new(60, 20);
        grid.set_terrain(GridPos::new(5, 5), TerrainType::River);
        let props = UnitType::Engineer.default_properties();
        let mut u = unit(UnitType::Engineer, 5, 5);

        move_toward(&mut u, GridPos::new(9, 5), 2, &grid, &props);
        assert_eq!(u.position, GridPos::new(7, 5));
    }

    #[test]
    fn test_forest_slows_cavalry_more() {
        let mut grid = WarGrid::new(60, 20);
        grid.set_terrain(GridPos::new(5, 5), TerrainType::Forest);

        let foot = UnitType::Swordsman.default_properties();
        let mut infantry = unit(UnitType::Swordsman, 5, 5);
        move_toward(&mut infantry, GridPos::new(20, 5), 3, &grid, &foot);
        assert_eq!(infantry.position, GridPos::new(7, 5)); // 3 / 1.5 = 2

        let horse = UnitType::Cavalry.default_properties();
        let mut cavalry = unit(UnitType::Cavalry, 5, 5);
        move_toward(&mut cavalry, GridPos::new(20, 5), 3, &grid, &horse);
        assert_eq!(cavalry.position, GridPos::new(6, 5)); // 3 / 2.0 = 1.5 -> 1
    }

    #[test]
    fn test_move_clamped_to_grid() {
        let grid = WarGrid::new(10, 10);
        let props = UnitType::Swordsman.default_properties();
        let mut u = unit(UnitType::Swordsman, 9, 9);

        let reached = move_toward(&mut u, GridPos::new(14, 14), 3, &grid, &props);
        assert!(!reached);
        assert_eq!(u.position, GridPos::new(9, 9));
    }

    #[test]
    fn test_hold_ground_never_moves() {
        let grid = WarGrid::new(60, 20);
        let mut u = unit(UnitType::Swordsman, 5, 5)
            .with_stance(UnitStance::HoldGround)
            .with_path([GridPos::new(20, 5)]);

        let result = advance_unit(&mut u, &grid, &StatTable::new(), &mut rng());
        assert!(!result.moved);
        assert_eq!(u.position, GridPos::new(5, 5));
        assert_eq!(u.path.len(), 1);
    }

    #[test]
    fn test_advance_pops_reached_waypoints() {
        let grid = WarGrid::new(60, 20);
        let mut u = unit(UnitType::Swordsman, 0, 0)
            .with_stance(UnitStance::AdvanceEngage)
            .with_path([GridPos::new(2, 0), GridPos::new(2, 4)]);
        let stats = StatTable::new();

        let result = advance_unit(&mut u, &grid, &stats, &mut rng());
        assert!(result.reached_target);
        assert_eq!(u.path.len(), 1);

        advance_unit(&mut u, &grid, &stats, &mut rng());
        assert_eq!(u.position, GridPos::new(2, 2));
        advance_unit(&mut u, &grid, &stats, &mut rng());
        assert!(u.path.is_empty());

        let result = advance_unit(&mut u, &grid, &stats, &mut rng());
        assert!(!result.moved);
    }

    #[test]
    fn test_withdraw_overrides_stance() {
        let grid = WarGrid::new(60, 20);
        let mut u = unit(UnitType::Swordsman, 10, 10)
            .with_stance(UnitStance::AdvanceEngage)
            .with_path([GridPos::new(20, 10)])
            .with_fallback(GridPos::new(0, 10), Morale::new(50));
        u.morale = Morale::new(20);

        let result = advance_unit(&mut u, &grid, &StatTable::new(), &mut rng());
        assert!(result.withdrawing);
        assert_eq!(u.position, GridPos::new(8, 10));
        assert_eq!(u.path.len(), 1);
    }

    #[test]
    fn test_patrol_stays_in_zone() {
        let grid = WarGrid::new(60, 20);
        let zone = PatrolZone::new(GridPos::new(12, 8), GridPos::new(8, 4));
        let mut u = unit(UnitType::Scout, 10, 6)
            .with_stance(UnitStance::PatrolZone)
            .with_patrol_zone(zone);
        let stats = StatTable::new();
        let mut rng = rng();

        for _ in 0..50 {
            advance_unit(&mut u, &grid, &stats, &mut rng);
            assert!(zone.contains(u.position), "left zone at {:?}", u.position);
        }
    }

    #[test]
    fn test_patrol_without_zone_follows_path() {
        let grid = WarGrid::new(60, 20);
        let mut u = unit(UnitType::Swordsman, 0, 0)
            .with_stance(UnitStance::PatrolZone)
            .with_path([GridPos::new(2, 0)]);

        advance_unit(&mut u, &grid, &StatTable::new(), &mut rng());
        assert_eq!(u.position, GridPos::new(2, 0));
        assert!(u.path.is_empty());
    }
}
