//! Unit types and their reference stats
//!
//! The stat rows are owned by the reference-data layer; the defaults here are
//! used for any type the loaded table does not override.

use std::collections::HashMap;
use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, WarError};

/// Type tag of a military unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    // Infantry
    Swordsman,
    Spearman,
    Archer,
    Crossbowman,

    // Mounted
    Cavalry,
    Knight,
    Scout,

    // Support
    Engineer, // Bridge builders
    Siege,    // Castle breakers
}

/// Reference stats for a unit type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitProperties {
    pub vision_range: f32, // Cells, before terrain penalty
    pub speed: i32,        // Max cells per axis per tick
    pub attack: f32,       // Multiplier on troop damage
    pub defense: f32,      // Divisor on incoming damage
    pub troop_hit_points: u32,
    pub is_cavalry: bool,
    pub builds_bridges: bool,
    pub castle_capable: bool,
}

impl UnitType {
    pub const ALL: [UnitType; 9] = [
        UnitType::Swordsman,
        UnitType::Spearman,
        UnitType::Archer,
        UnitType::Crossbowman,
        UnitType::Cavalry,
        UnitType::Knight,
        UnitType::Scout,
        UnitType::Engineer,
        UnitType::Siege,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            UnitType::Swordsman => "swordsman",
            UnitType::Spearman => "spearman",
            UnitType::Archer => "archer",
            UnitType::Crossbowman => "crossbowman",
            UnitType::Cavalry => "cavalry",
            UnitType::Knight => "knight",
            UnitType::Scout => "scout",
            UnitType::Engineer => "engineer",
            UnitType::Siege => "siege",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Get default properties for this unit type
    pub fn default_properties(&self) -> UnitProperties {
        let base = UnitProperties {
            vision_range: 6.0,
            speed: 2,
            attack: 1.0,
            defense: 1.0,
            troop_hit_points: 10,
            is_cavalry: false,
            builds_bridges: false,
            castle_capable: false,
        };

        match self {
            UnitType::Swordsman => base,
            UnitType::Spearman => UnitProperties {
                defense: 1.2,
                ..base
            },
            UnitType::Archer => UnitProperties {
                vision_range: 10.0, // Good eyes
                defense: 0.8,
                troop_hit_points: 6,
                ..base
            },
            UnitType::Crossbowman => UnitProperties {
                vision_range: 8.0,
                attack: 1.2,
                troop_hit_points: 8,
                ..base
            },
            UnitType::Cavalry => UnitProperties {
                vision_range: 8.0,
                speed: 3,
                attack: 1.2,
                troop_hit_points: 15,
                is_cavalry: true,
                ..base
            },
            UnitType::Knight => UnitProperties {
                speed: 3,
                attack: 1.5,
                defense: 1.5,
                troop_hit_points: 20,
                is_cavalry: true,
                ..base
            },
            UnitType::Scout => UnitProperties {
                vision_range: 12.0, // Best vision
                speed: 3,
                attack: 0.5,
                troop_hit_points: 6,
                is_cavalry: true,
                ..base
            },
            UnitType::Engineer => UnitProperties {
                attack: 0.5,
                troop_hit_points: 6,
                builds_bridges: true,
                ..base
            },
            UnitType::Siege => UnitProperties {
                vision_range: 4.0,
                attack: 0.5,
                defense: 0.7,
                troop_hit_points: 25,
                castle_capable: true,
                ..base
            },
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unit stat reference table (defaults plus loaded overrides)
#[derive(Debug, Clone, Default)]
pub struct StatTable {
    overrides: AHashMap<UnitType, UnitProperties>,
}

impl StatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse override rows keyed by unit-type tag
    ///
    /// ```toml
    /// [archer]
    /// vision_range = 11.0
    /// speed = 2
    /// ...
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let rows: HashMap<String, UnitProperties> = toml::from_str(contents)?;
        let mut table = Self::new();
        for (tag, props) in rows {
            let unit_type = UnitType::from_tag(&tag)
                .ok_or_else(|| WarError::Config(format!("unknown unit type '{}'", tag)))?;
            table.set(unit_type, props);
        }
        Ok(table)
    }

    pub fn set(&mut self, unit_type: UnitType, props: UnitProperties) {
        self.overrides.insert(unit_type, props);
    }

    pub fn get(&self, unit_type: UnitType) -> UnitProperties {
        self.overrides
            .get(&unit_type)
            .copied()
            .unwrap_or_else(|| unit_type.default_properties())
    }
}
