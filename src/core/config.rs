//! Engine configuration with documented constants
//!
//! Every tunable number the tick engine reads lives here. Defaults match
//! `battle::constants`; a TOML file may override any subset of fields.

use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    BASE_VISION_RANGE, DAMAGE_PER_TROOP, DEFAULT_COUNTER_CACHE_CAPACITY, DEFAULT_GRID_HEIGHT,
    DEFAULT_GRID_WIDTH, DEFAULT_WATCHDOG_DELAY_SECS, MAX_BATTLE_TICKS, MORALE_SHIFT,
    SIEGE_DAMAGE_PER_TROOP,
};
use crate::core::error::{Result, WarError};

/// Which combat resolver a war runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Flat `quantity x 10` damage, no counters or morale. Offline replay only.
    Simplified,
    /// Counter multipliers, troop losses and morale shifts. Used for persisted wars.
    #[default]
    Full,
}

/// How a concluded war with equal scores is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The defending side keeps its castle
    #[default]
    Defender,
    /// Nobody wins
    Draw,
}

/// Configuration for the tick engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === GRID ===
    /// Width of a freshly generated war grid (cells)
    pub grid_width: u32,
    /// Height of a freshly generated war grid (cells)
    pub grid_height: u32,

    // === VISION ===
    /// Radius of the square window each unit reveals before terrain modifiers
    pub base_vision: i32,

    // === BATTLE LENGTH ===
    /// A war concludes once its tick counter reaches this value
    pub max_battle_ticks: u64,

    // === DAMAGE ===
    /// Damage dealt per attacking troop in one exchange
    pub damage_per_troop: u32,
    /// Castle damage dealt per siege troop per tick
    pub siege_damage_per_troop: u32,
    /// Morale points lost by the defender (and gained by the attacker) per exchange
    ///
    /// Points on the 0-100 morale scale. Rosters with fractional morale are
    /// converted when they are deserialized (see `Morale`).
    pub morale_shift: u8,

    // === COMBAT STRATEGY ===
    pub resolver: ResolverKind,
    pub tie_break: TieBreak,

    // === OPERATIONS ===
    /// Maximum cached counter multipliers before the cache is flushed
    pub counter_cache_capacity: usize,
    /// Age of the last tick after which the watchdog restarts a war
    pub watchdog_delay_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            base_vision: BASE_VISION_RANGE,
            max_battle_ticks: MAX_BATTLE_TICKS,
            damage_per_troop: DAMAGE_PER_TROOP,
            siege_damage_per_troop: SIEGE_DAMAGE_PER_TROOP,
            morale_shift: MORALE_SHIFT,
            resolver: ResolverKind::default(),
            tie_break: TieBreak::default(),
            counter_cache_capacity: DEFAULT_COUNTER_CACHE_CAPACITY,
            watchdog_delay_secs: DEFAULT_WATCHDOG_DELAY_SECS,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing fields keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(WarError::Config(format!(
                "grid must be non-empty, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }

        if self.max_battle_ticks == 0 {
            return Err(WarError::Config("max_battle_ticks must be positive".into()));
        }

        if self.counter_cache_capacity == 0 {
            return Err(WarError::Config("counter_cache_capacity must be positive".into()));
        }

        if self.watchdog_delay_secs < 0 {
            return Err(WarError::Config("watchdog_delay_secs cannot be negative".into()));
        }
        self.watchdog_delay()?;

        Ok(())
    }

    /// The watchdog delay as a duration; errors if it is out of range
    pub fn watchdog_delay(&self) -> Result<Duration> {
        Duration::try_seconds(self.watchdog_delay_secs).ok_or_else(|| {
            WarError::Config(format!(
                "watchdog_delay_secs {} is out of range",
                self.watchdog_delay_secs
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_width, 60);
        assert_eq!(config.grid_height, 20);
        assert_eq!(config.max_battle_ticks, 12);
        assert_eq!(config.resolver, ResolverKind::Full);
        assert_eq!(config.tie_break, TieBreak::Defender);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_battle_ticks = 30
            resolver = "simplified"
            tie_break = "draw"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_battle_ticks, 30);
        assert_eq!(config.resolver, ResolverKind::Simplified);
        assert_eq!(config.tie_break, TieBreak::Draw);
        assert_eq!(config.damage_per_troop, 10);
    }

    #[test]
    fn test_empty_grid_rejected() {
        let result = EngineConfig::from_toml_str("grid_width = 0");
        assert!(matches!(result, Err(WarError::Config(_))));
    }

    #[test]
    fn test_huge_watchdog_delay_rejected() {
        let result = EngineConfig::from_toml_str("watchdog_delay_secs = 9223372036854775807");
        assert!(matches!(result, Err(WarError::Config(_))));

        let config = EngineConfig::from_toml_str("watchdog_delay_secs = 86400").unwrap();
        assert_eq!(config.watchdog_delay().unwrap(), Duration::days(1));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let result = EngineConfig::from_toml_str("max_battle_ticks = \"soon\"");
        assert!(matches!(result, Err(WarError::Toml(_))));
    }
}
