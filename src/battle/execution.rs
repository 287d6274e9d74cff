//! War state and the per-tick driver
//!
//! Each tick: vision -> movement -> combat -> siege -> tick counter -> end check

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::combat_log::{CombatLog, CombatLogEntry};
use crate::battle::movement::advance_unit;
use crate::battle::participants::{Side, WarKind};
use crate::battle::resolution::{apply_siege, CombatContext, CombatResolver, SideDamage};
use crate::battle::targeting::{CounterCache, CounterSource};
use crate::battle::unit_type::StatTable;
use crate::battle::units::Unit;
use crate::battle::visibility::{compute_visible_tiles, update_visible_enemies};
use crate::battle::war_grid::WarGrid;
use crate::core::config::{EngineConfig, TieBreak};
use crate::core::error::{Result, WarError};
use crate::core::types::{Tick, WarId};

/// War lifecycle: pending -> active -> {concluded, surrendered}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarStatus {
    #[default]
    Pending,
    Active,
    Concluded,
    Surrendered,
}

impl WarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarStatus::Pending => "pending",
            WarStatus::Active => "active",
            WarStatus::Concluded => "concluded",
            WarStatus::Surrendered => "surrendered",
        }
    }

    /// Only active wars take ticks
    pub fn is_live(&self) -> bool {
        *self == WarStatus::Active
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, WarStatus::Concluded | WarStatus::Surrendered)
    }

    /// Check a one-way transition
    pub fn transition(self, to: WarStatus) -> Result<WarStatus> {
        let allowed = matches!(
            (self, to),
            (WarStatus::Pending, WarStatus::Active)
                | (WarStatus::Active, WarStatus::Concluded)
                | (WarStatus::Active, WarStatus::Surrendered)
        );
        if allowed {
            Ok(to)
        } else {
            Err(WarError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Victor {
    Attacker,
    Defender,
    Draw,
}

impl From<Side> for Victor {
    fn from(side: Side) -> Self {
        match side {
            Side::Attacker => Victor::Attacker,
            Side::Defender => Victor::Defender,
        }
    }
}

/// One score row per war; `victor` stays `None` until the war is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarScore {
    pub attacker_score: u64,
    pub defender_score: u64,
    pub victor: Option<Victor>,
}

impl WarScore {
    /// Running score with no decision yet
    pub fn provisional(attacker_score: u64, defender_score: u64) -> Self {
        Self {
            attacker_score,
            defender_score,
            victor: None,
        }
    }

    /// Final score: higher wins, ties go to the configured policy
    pub fn decide(attacker_score: u64, defender_score: u64, tie_break: TieBreak) -> Self {
        let victor = if attacker_score > defender_score {
            Victor::Attacker
        } else if defender_score > attacker_score {
            Victor::Defender
        } else {
            match tie_break {
                TieBreak::Defender => Victor::Defender,
                TieBreak::Draw => Victor::Draw,
            }
        };
        Self {
            attacker_score,
            defender_score,
            victor: Some(victor),
        }
    }
}

/// Shared, read-only inputs for running ticks
pub struct TickEnv<'a> {
    pub config: &'a EngineConfig,
    pub stats: &'a StatTable,
    pub counters: &'a CounterCache,
    pub counter_source: &'a dyn CounterSource,
}

/// Complete state of one war
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarState {
    pub war_id: WarId,
    pub kind: WarKind,
    pub status: WarStatus,
    /// Last applied tick (0 before the first)
    pub tick: Tick,
    pub castle_hp: u32,
    pub grid: WarGrid,
    pub units: Vec<Unit>,
    /// Destroyed units, kept for scoring and external readers
    pub fallen: Vec<Unit>,
    /// Seed for terrain and per-tick randomness
    pub seed: u64,
    pub damage_dealt: SideDamage,
    pub log: Vec<CombatLogEntry>,
}

impl WarState {
    pub fn new(war_id: WarId, kind: WarKind, grid: WarGrid, castle_hp: u32, seed: u64) -> Self {
        Self {
            war_id,
            kind,
            status: WarStatus::Pending,
            tick: 0,
            castle_hp,
            grid,
            units: Vec::new(),
            fallen: Vec::new(),
            seed,
            damage_dealt: SideDamage::default(),
            log: Vec::new(),
        }
    }

    pub fn with_units(mut self, units: Vec<Unit>) -> Self {
        self.units = units;
        self
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn activate(&mut self) -> Result<()> {
        self.status = self.status.transition(WarStatus::Active)?;
        info!(war = self.war_id.0, "War activated");
        Ok(())
    }

    /// Conclude the war and return its final score
    pub fn conclude(&mut self, tie_break: TieBreak) -> Result<WarScore> {
        self.status = self.status.transition(WarStatus::Concluded)?;
        let score = self.final_score(tie_break);
        info!(
            war = self.war_id.0,
            tick = self.tick,
            attacker = score.attacker_score,
            defender = score.defender_score,
            victor = ?score.victor,
            "War concluded"
        );
        Ok(score)
    }

    /// One side gives up; the other side wins regardless of score
    pub fn surrender(&mut self, side: Side) -> Result<WarScore> {
        self.status = self.status.transition(WarStatus::Surrendered)?;
        let (attacker_score, defender_score) = self.side_scores();
        info!(war = self.war_id.0, side = ?side, "War surrendered");
        Ok(WarScore {
            attacker_score,
            defender_score,
            victor: Some(side.opponent().into()),
        })
    }

    /// Kingdom wars count surviving troops, alliance wars count damage dealt
    pub fn side_scores(&self) -> (u64, u64) {
        if self.kind.is_alliance_war() {
            return (self.damage_dealt.attacker, self.damage_dealt.defender);
        }

        let mut attacker = 0u64;
        let mut defender = 0u64;
        for unit in self.units.iter().filter(|u| u.is_alive()) {
            match self.kind.side_of(unit.kingdom_id) {
                Some(Side::Attacker) => attacker += u64::from(unit.quantity),
                Some(Side::Defender) => defender += u64::from(unit.quantity),
                None => {}
            }
        }
        (attacker, defender)
    }

    pub fn current_score(&self) -> WarScore {
        let (attacker, defender) = self.side_scores();
        WarScore::provisional(attacker, defender)
    }

    pub fn final_score(&self, tie_break: TieBreak) -> WarScore {
        let (attacker, defender) = self.side_scores();
        WarScore::decide(attacker, defender, tie_break)
    }

    /// Advance one tick. Returns the entries appended this tick.
    ///
    /// A war that is not active is left untouched and yields an empty log.
    pub fn run_tick<R: Rng + ?Sized>(&mut self, env: &TickEnv<'_>, rng: &mut R) -> CombatLog {
        let mut log = CombatLog::new();
        if !self.is_live() {
            return log;
        }

        let tick = self.tick + 1;

        self.phase_vision(tick, env, &mut log);
        self.phase_movement(env, rng);
        self.phase_combat(tick, env, &mut log);
        self.phase_siege(tick, env, &mut log);

        self.tick = tick;
        self.log.extend(log.entries.iter().cloned());

        debug!(
            war = self.war_id.0,
            tick,
            entries = log.entries.len(),
            castle_hp = self.castle_hp,
            units = self.units.len(),
            "Tick applied"
        );

        log
    }

    /// Run ticks until the war ends, returning the final score
    pub fn run_to_end<R: Rng + ?Sized>(&mut self, env: &TickEnv<'_>, rng: &mut R) -> Result<WarScore> {
        self.status.transition(WarStatus::Concluded)?;
        loop {
            self.run_tick(env, rng);
            if check_war_end(self, env.config.max_battle_ticks) {
                return self.conclude(env.config.tie_break);
            }
        }
    }

    fn phase_vision(&mut self, tick: Tick, env: &TickEnv<'_>, log: &mut CombatLog) {
        let visible = compute_visible_tiles(&self.units, &self.grid, env.config.base_vision);
        log.push(CombatLogEntry::vision_update(tick, visible.len()));
        update_visible_enemies(&mut self.units, &self.kind, &self.grid, env.stats);
    }

    fn phase_movement<R: Rng + ?Sized>(&mut self, env: &TickEnv<'_>, rng: &mut R) {
        for unit in self.units.iter_mut().filter(|u| u.is_alive()) {
            advance_unit(unit, &self.grid, env.stats, rng);
        }
    }

    fn phase_combat(&mut self, tick: Tick, env: &TickEnv<'_>, log: &mut CombatLog) {
        let ctx = CombatContext {
            tick,
            kind: &self.kind,
            stats: env.stats,
            counters: env.counters,
            counter_source: env.counter_source,
            damage_per_troop: env.config.damage_per_troop,
            morale_shift: env.config.morale_shift,
        };
        let outcome = CombatResolver::from(env.config.resolver).resolve(&mut self.units, &ctx, log);

        self.damage_dealt.attacker += outcome.damage.attacker;
        self.damage_dealt.defender += outcome.damage.defender;
        self.fallen.extend(outcome.destroyed);
    }

    fn phase_siege(&mut self, tick: Tick, env: &TickEnv<'_>, log: &mut CombatLog) {
        apply_siege(
            &self.units,
            &self.kind,
            env.stats,
            &mut self.castle_hp,
            env.config.siege_damage_per_troop,
            tick,
            log,
        );
    }
}

/// Has this war met a termination condition?
pub fn check_war_end(state: &WarState, max_ticks: Tick) -> bool {
    state.is_live() && (state.castle_hp == 0 || state.tick >= max_ticks)
}
