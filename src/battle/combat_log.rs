//! Append-only combat log
//!
//! Entries are ordered by (tick, insertion order). Consumers read them from
//! the kingdom-war or alliance-war log table.

use serde::{Deserialize, Serialize};

use crate::core::types::{GridPos, Tick, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEventKind {
    VisionUpdate,
    Attack,
    Death,
    Siege,
}

/// One row of the combat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    pub tick: Tick,
    pub kind: CombatEventKind,
    pub attacker: Option<UnitId>,
    pub defender: Option<UnitId>,
    pub position: Option<GridPos>,
    pub damage: u32,
    pub morale_delta: i32,
    pub note: String,
}

impl CombatLogEntry {
    pub fn vision_update(tick: Tick, visible_tiles: usize) -> Self {
        Self {
            tick,
            kind: CombatEventKind::VisionUpdate,
            attacker: None,
            defender: None,
            position: None,
            damage: 0,
            morale_delta: 0,
            note: format!("{} tiles visible", visible_tiles),
        }
    }

    pub fn attack(
        tick: Tick,
        attacker: UnitId,
        defender: UnitId,
        position: GridPos,
        damage: u32,
        morale_delta: i32,
    ) -> Self {
        Self {
            tick,
            kind: CombatEventKind::Attack,
            attacker: Some(attacker),
            defender: Some(defender),
            position: Some(position),
            damage,
            morale_delta,
            note: format!("unit {} hit unit {} for {}", attacker.0, defender.0, damage),
        }
    }

    pub fn death(tick: Tick, attacker: UnitId, defender: UnitId, position: GridPos) -> Self {
        Self {
            tick,
            kind: CombatEventKind::Death,
            attacker: Some(attacker),
            defender: Some(defender),
            position: Some(position),
            damage: 0,
            morale_delta: 0,
            note: format!("unit {} destroyed", defender.0),
        }
    }

    pub fn siege(tick: Tick, damage: u32, castle_hp: u32) -> Self {
        Self {
            tick,
            kind: CombatEventKind::Siege,
            attacker: None,
            defender: None,
            position: None,
            damage,
            morale_delta: 0,
            note: format!("castle hp {}", castle_hp),
        }
    }
}

/// Entries produced by a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatLog {
    pub entries: Vec<CombatLogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CombatLogEntry) {
        self.entries.push(entry);
    }

    pub fn count(&self, kind: CombatEventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
