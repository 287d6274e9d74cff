//! Durable war storage
//!
//! The store is the system of record between ticks. `commit_tick` is the only
//! way tick effects reach it, and it is atomic: ledger row, war state, log rows
//! and score land together or not at all. The ledger's `(war, tick)` uniqueness
//! is the exactly-once guard; no in-process lock replaces it.
//!
//! Tick commits and lifecycle changes are both compare-and-swap against the
//! stored status and tick, so neither can overwrite the other.

use std::sync::{Mutex, MutexGuard};

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::battle::combat_log::CombatLogEntry;
use crate::battle::execution::{WarScore, WarState, WarStatus};
use crate::core::error::{Result, WarError};
use crate::core::types::{KingdomId, Tick, WarId};

/// A war header plus its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarRecord {
    pub state: WarState,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl WarRecord {
    pub fn new(state: WarState, created_at: DateTime<Utc>) -> Self {
        Self {
            state,
            created_at,
            activated_at: None,
            last_tick_at: None,
        }
    }

    pub fn war_id(&self) -> WarId {
        self.state.war_id
    }

    /// When the war last made progress (last tick, else activation)
    pub fn last_progress(&self) -> Option<DateTime<Utc>> {
        self.last_tick_at.or(self.activated_at)
    }
}

/// Everything one applied tick writes
#[derive(Debug, Clone)]
pub struct TickCommit {
    pub war_id: WarId,
    pub tick: Tick,
    pub state: WarState,
    pub entries: Vec<CombatLogEntry>,
    pub score: WarScore,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The ledger already held this `(war, tick)`; nothing was written
    AlreadyApplied,
    /// The stored war moved on since the caller loaded it; nothing was written
    Stale,
}

/// What a lifecycle change does to the participants' combat flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatFlags {
    Engage,
    Release,
}

/// A lifecycle change written outside of a tick (activation, surrender, victory)
#[derive(Debug, Clone)]
pub struct WarTransition {
    pub record: WarRecord,
    /// Status the stored war must still have
    pub expected_status: WarStatus,
    /// Tick the stored war must still be at
    pub expected_tick: Tick,
    pub score: WarScore,
    pub flags: CombatFlags,
}

/// Which log table a war writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTable {
    Kingdom,
    Alliance,
}

impl LogTable {
    pub fn for_state(state: &WarState) -> Self {
        if state.kind.is_alliance_war() {
            LogTable::Alliance
        } else {
            LogTable::Kingdom
        }
    }
}

pub trait WarStore: Send + Sync {
    fn insert_war(&self, record: WarRecord) -> Result<()>;

    /// `WarNotFound` if the war does not exist
    fn load_war(&self, war: WarId) -> Result<WarRecord>;

    /// Overwrite a war header unconditionally (operator repair)
    fn save_war(&self, record: &WarRecord) -> Result<()>;

    /// Ids of every war in the `active` state, in id order
    fn active_wars(&self) -> Result<Vec<WarId>>;

    fn tick_applied(&self, war: WarId, tick: Tick) -> Result<bool>;

    /// Atomically insert the ledger row and apply the tick's writes.
    ///
    /// The stored war must be active at `commit.tick - 1`, otherwise the
    /// commit is `Stale`. When the war is no longer active after this tick,
    /// participant kingdoms are released from combat in the same step.
    fn commit_tick(&self, commit: TickCommit) -> Result<CommitOutcome>;

    /// Atomically write a lifecycle change with its score and combat flags.
    ///
    /// `Stale` if the stored status or tick differs from the expected ones.
    fn apply_transition(&self, change: WarTransition) -> Result<CommitOutcome>;

    fn score(&self, war: WarId) -> Result<Option<WarScore>>;

    /// True while the kingdom takes part in at least one active war
    fn in_combat(&self, kingdom: KingdomId) -> Result<bool>;

    fn combat_log(&self, table: LogTable, war: WarId) -> Result<Vec<CombatLogEntry>>;
}

#[derive(Debug, Default)]
struct Tables {
    wars: AHashMap<WarId, WarRecord>,
    ledger: AHashSet<(WarId, Tick)>,
    kingdom_logs: AHashMap<WarId, Vec<CombatLogEntry>>,
    alliance_logs: AHashMap<WarId, Vec<CombatLogEntry>>,
    scores: AHashMap<WarId, WarScore>,
    /// Active wars per kingdom
    in_combat: AHashMap<KingdomId, u32>,
}

impl Tables {
    fn engage(&mut self, kingdoms: &[KingdomId]) {
        for kingdom in kingdoms {
            *self.in_combat.entry(*kingdom).or_insert(0) += 1;
        }
    }

    fn release(&mut self, kingdoms: &[KingdomId]) {
        for kingdom in kingdoms {
            if let Some(count) = self.in_combat.get_mut(kingdom) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.in_combat.remove(kingdom);
                }
            }
        }
    }

    fn logs_mut(&mut self, table: LogTable) -> &mut AHashMap<WarId, Vec<CombatLogEntry>> {
        match table {
            LogTable::Kingdom => &mut self.kingdom_logs,
            LogTable::Alliance => &mut self.alliance_logs,
        }
    }

    fn logs(&self, table: LogTable) -> &AHashMap<WarId, Vec<CombatLogEntry>> {
        match table {
            LogTable::Kingdom => &self.kingdom_logs,
            LogTable::Alliance => &self.alliance_logs,
        }
    }
}

/// Reference store: every table behind one mutex
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| WarError::Store("store lock poisoned".into()))
    }

    /// Ticks recorded in the ledger for a war, ascending
    pub fn ledger_ticks(&self, war: WarId) -> Result<Vec<Tick>> {
        let tables = self.lock()?;
        let mut ticks: Vec<Tick> = tables
            .ledger
            .iter()
            .filter(|(w, _)| *w == war)
            .map(|(_, t)| *t)
            .collect();
        ticks.sort_unstable();
        Ok(ticks)
    }
}

impl WarStore for InMemoryStore {
    fn insert_war(&self, record: WarRecord) -> Result<()> {
        let mut tables = self.lock()?;
        let war = record.war_id();
        if tables.wars.contains_key(&war) {
            return Err(WarError::Store(format!("war {} already exists", war.0)));
        }
        tables.wars.insert(war, record);
        Ok(())
    }

    fn load_war(&self, war: WarId) -> Result<WarRecord> {
        self.lock()?
            .wars
            .get(&war)
            .cloned()
            .ok_or(WarError::WarNotFound(war))
    }

    fn save_war(&self, record: &WarRecord) -> Result<()> {
        let mut tables = self.lock()?;
        let war = record.war_id();
        let slot = tables.wars.get_mut(&war).ok_or(WarError::WarNotFound(war))?;
        *slot = record.clone();
        Ok(())
    }

    fn active_wars(&self) -> Result<Vec<WarId>> {
        let tables = self.lock()?;
        let mut wars: Vec<WarId> = tables
            .wars
            .values()
            .filter(|r| r.state.status == WarStatus::Active)
            .map(|r| r.war_id())
            .collect();
        wars.sort();
        Ok(wars)
    }

    fn tick_applied(&self, war: WarId, tick: Tick) -> Result<bool> {
        Ok(self.lock()?.ledger.contains(&(war, tick)))
    }

    fn commit_tick(&self, commit: TickCommit) -> Result<CommitOutcome> {
        let mut tables = self.lock()?;

        if tables.ledger.contains(&(commit.war_id, commit.tick)) {
            return Ok(CommitOutcome::AlreadyApplied);
        }
        let stored = tables
            .wars
            .get(&commit.war_id)
            .ok_or(WarError::WarNotFound(commit.war_id))?;
        if !stored.state.is_live() || stored.state.tick + 1 != commit.tick {
            return Ok(CommitOutcome::Stale);
        }

        tables.ledger.insert((commit.war_id, commit.tick));

        let table = LogTable::for_state(&commit.state);
        tables
            .logs_mut(table)
            .entry(commit.war_id)
            .or_default()
            .extend(commit.entries);
        tables.scores.insert(commit.war_id, commit.score);

        if !commit.state.is_live() {
            tables.release(&commit.state.kind.kingdoms());
        }

        if let Some(record) = tables.wars.get_mut(&commit.war_id) {
            record.state = commit.state;
            record.last_tick_at = Some(commit.applied_at);
        }

        Ok(CommitOutcome::Applied)
    }

    fn apply_transition(&self, change: WarTransition) -> Result<CommitOutcome> {
        let mut tables = self.lock()?;
        let war = change.record.war_id();

        let stored = tables.wars.get(&war).ok_or(WarError::WarNotFound(war))?;
        if stored.state.status != change.expected_status || stored.state.tick != change.expected_tick {
            return Ok(CommitOutcome::Stale);
        }

        let kingdoms = change.record.state.kind.kingdoms();
        match change.flags {
            CombatFlags::Engage => tables.engage(&kingdoms),
            CombatFlags::Release => tables.release(&kingdoms),
        }
        tables.scores.insert(war, change.score);
        tables.wars.insert(war, change.record);

        Ok(CommitOutcome::Applied)
    }

    fn score(&self, war: WarId) -> Result<Option<WarScore>> {
        Ok(self.lock()?.scores.get(&war).copied())
    }

    fn in_combat(&self, kingdom: KingdomId) -> Result<bool> {
        Ok(self.lock()?.in_combat.contains_key(&kingdom))
    }

    fn combat_log(&self, table: LogTable, war: WarId) -> Result<Vec<CombatLogEntry>> {
        Ok(self
            .lock()?
            .logs(table)
            .get(&war)
            .cloned()
            .unwrap_or_default())
    }
}
