//! Battle system constants - all tunable values in one place
//!
//! `EngineConfig` defaults are taken from here.

// War grid
pub const DEFAULT_GRID_WIDTH: u32 = 60;
pub const DEFAULT_GRID_HEIGHT: u32 = 20;

// Time
pub const MAX_BATTLE_TICKS: u64 = 12;

// Vision (cells)
pub const BASE_VISION_RANGE: i32 = 5;
pub const HILLS_VISION_BONUS: i32 = 2;
pub const FOREST_VISION_PENALTY: i32 = 1;

// Movement cost multipliers (divide the raw step)
pub const OPEN_MOVEMENT_COST: f32 = 1.0;
pub const ROUGH_MOVEMENT_COST: f32 = 1.5;
pub const CAVALRY_FOREST_MOVEMENT_COST: f32 = 2.0;
pub const IMPASSABLE_MOVEMENT_COST: f32 = 999.0;

// Combat
pub const DAMAGE_PER_TROOP: u32 = 10;
pub const SIEGE_DAMAGE_PER_TROOP: u32 = 5;

// Morale (0-100 scale)
pub const MORALE_MAX: u8 = 100;
pub const MORALE_SHIFT: u8 = 10;

// Operations
pub const DEFAULT_COUNTER_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_WATCHDOG_DELAY_SECS: i64 = 3600;
