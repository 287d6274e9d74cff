//! Battle tick engine - the pure step function over a war's state
//!
//! One tick runs, in order:
//! - vision (tile windows and enemy detection)
//! - stance-driven movement
//! - combat among co-located opposing units
//! - siege damage against the defending castle
//!
//! Nothing here touches storage. `war::manager` wraps it with the
//! exactly-once execution guard.

pub mod combat_log;
pub mod constants;
pub mod execution;
pub mod morale;
pub mod movement;
pub mod participants;
pub mod resolution;
pub mod targeting;
pub mod terrain;
pub mod unit_type;
pub mod units;
pub mod visibility;
pub mod war_grid;

// Re-exports for convenient access
pub use combat_log::{CombatEventKind, CombatLog, CombatLogEntry};
pub use constants::*;
pub use execution::{check_war_end, TickEnv, Victor, WarScore, WarState, WarStatus};
pub use morale::{apply_exchange_morale, triggered_withdraw, MoraleShift};
pub use movement::{advance_unit, move_toward, terrain_movement_modifier, MovementResult};
pub use participants::{AllianceMember, Side, WarKind};
pub use resolution::{apply_siege, CombatContext, CombatOutcome, CombatResolver, SideDamage};
pub use targeting::{select_target, CounterCache, CounterSource, CounterTable};
pub use terrain::TerrainType;
pub use unit_type::{StatTable, UnitProperties, UnitType};
pub use units::{Morale, PatrolZone, Unit, UnitStance, UnitStatus};
pub use visibility::{
    can_detect, compute_visible_tiles, effective_vision_range, update_visible_enemies,
    vision_radius, visible_enemies,
};
pub use war_grid::{TerrainTile, WarGrid};
