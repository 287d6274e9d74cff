//! The war service: exactly-once tick execution over a durable store
//!
//! `process_tick` is the only path that advances a war:
//! 1. write the request to the backup sink
//! 2. probe the ledger, skip if the tick is already applied
//! 3. load, run the tick, conclude if an end condition is met
//! 4. commit ledger row + state + logs + score in one store call
//!
//! Racing schedulers or watchdogs are fine: the loser of step 4 sees
//! `AlreadyApplied` and reports a skip. A tick that lost to a surrender or
//! victory check sees `Stale` and is dropped the same way.

use std::sync::Arc;

use chrono::Duration;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::battle::combat_log::CombatLogEntry;
use crate::battle::execution::{check_war_end, TickEnv, WarScore, WarState};
use crate::battle::participants::{Side, WarKind};
use crate::battle::targeting::{CounterCache, CounterSource, CounterTable};
use crate::battle::unit_type::StatTable;
use crate::battle::units::Unit;
use crate::battle::war_grid::WarGrid;
use crate::core::config::EngineConfig;
use crate::core::error::{Result, WarError};
use crate::core::types::{Tick, WarId};
use crate::war::backup::{BackupSink, TickBackup, TickPayload, TickTrigger};
use crate::war::clock::Clock;
use crate::war::store::{
    CombatFlags, CommitOutcome, LogTable, TickCommit, WarRecord, WarStore, WarTransition,
};

/// Reloads a lifecycle change may take while ticks keep landing
const LIFECYCLE_ATTEMPTS: usize = 3;

/// Outcome of one scheduling pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickPassReport {
    pub applied: Vec<WarId>,
    pub skipped: Vec<WarId>,
    pub failed: Vec<(WarId, String)>,
}

impl TickPassReport {
    pub fn total(&self) -> usize {
        self.applied.len() + self.skipped.len() + self.failed.len()
    }
}

/// Per-tick generator: same war seed and tick always replay the same tick
pub fn tick_rng(seed: u64, tick: Tick) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub struct WarManager {
    config: EngineConfig,
    stats: StatTable,
    counter_source: Arc<dyn CounterSource>,
    counters: CounterCache,
    store: Arc<dyn WarStore>,
    backup: Arc<dyn BackupSink>,
    clock: Arc<dyn Clock>,
}

impl WarManager {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn WarStore>,
        backup: Arc<dyn BackupSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let counters = CounterCache::new(config.counter_cache_capacity);
        Self {
            config,
            stats: StatTable::new(),
            counter_source: Arc::new(CounterTable::standard()),
            counters,
            store,
            backup,
            clock,
        }
    }

    pub fn with_stats(mut self, stats: StatTable) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_counter_source(mut self, source: Arc<dyn CounterSource>) -> Self {
        self.set_counter_source(source);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn WarStore> {
        &self.store
    }

    /// Swap the counter rows and drop every cached multiplier
    pub fn set_counter_source(&mut self, source: Arc<dyn CounterSource>) {
        self.counter_source = source;
        self.counters.invalidate();
    }

    /// Drop cached counter multipliers after the rows changed in place
    pub fn invalidate_counters(&self) {
        self.counters.invalidate();
        debug!("Counter cache invalidated");
    }

    fn env(&self) -> TickEnv<'_> {
        TickEnv {
            config: &self.config,
            stats: &self.stats,
            counters: &self.counters,
            counter_source: self.counter_source.as_ref(),
        }
    }

    /// Register a pending war with freshly generated terrain
    ///
    /// Terrain comes from `seed`, so the same seed always yields the same map.
    /// Unit positions are clamped into the grid.
    pub fn create_war(
        &self,
        war_id: WarId,
        kind: WarKind,
        units: Vec<Unit>,
        castle_hp: u32,
        seed: u64,
    ) -> Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = WarGrid::generate(self.config.grid_width, self.config.grid_height, &mut rng);

        let units = units
            .into_iter()
            .map(|mut unit| {
                unit.position = grid.clamp(unit.position);
                unit
            })
            .collect();

        let state = WarState::new(war_id, kind, grid, castle_hp, seed).with_units(units);
        self.store.insert_war(WarRecord::new(state, self.clock.now()))?;
        info!(war = war_id.0, seed, castle_hp, "War created");
        Ok(())
    }

    /// `pending -> active`; marks every participant kingdom as in combat
    pub fn activate_war(&self, war: WarId) -> Result<()> {
        let now = self.clock.now();
        self.update_lifecycle(war, CombatFlags::Engage, |record| {
            record.state.activate()?;
            record.activated_at = Some(now);
            Ok(Some(record.state.current_score()))
        })?;
        Ok(())
    }

    /// Apply `tick` to `war` exactly once.
    ///
    /// Returns `Ok(true)` if this call applied the tick, `Ok(false)` if the
    /// tick was already applied (or the war is no longer active). A tick past
    /// `current + 1` is `TickOutOfOrder` and writes no ledger row.
    pub fn process_tick(&self, war: WarId, tick: Tick, payload: TickPayload) -> Result<bool> {
        let now = self.clock.now();

        let backup = TickBackup::new(war, tick, payload.clone(), now);
        if let Err(err) = self.backup.write(&backup) {
            warn!(war = war.0, tick, error = %err, "Tick backup write failed");
        }

        if self.store.tick_applied(war, tick)? {
            debug!(war = war.0, tick, trigger = ?payload.trigger, "Tick already applied, skipping");
            return Ok(false);
        }

        let record = self.store.load_war(war)?;
        let mut state = record.state;
        if !state.is_live() {
            debug!(war = war.0, tick, status = state.status.as_str(), "War not active, skipping");
            return Ok(false);
        }

        // Another caller committed between the probe and the load
        if tick <= state.tick {
            debug!(war = war.0, tick, "Tick applied concurrently, skipping");
            return Ok(false);
        }

        let expected = state.tick + 1;
        if tick != expected {
            return Err(WarError::TickOutOfOrder {
                war,
                expected,
                requested: tick,
            });
        }

        let env = self.env();
        let mut rng = tick_rng(state.seed, tick);
        let log = state.run_tick(&env, &mut rng);

        let score = if check_war_end(&state, self.config.max_battle_ticks) {
            state.conclude(self.config.tie_break)?
        } else {
            state.current_score()
        };
        let concluded = !state.is_live();

        let commit = TickCommit {
            war_id: war,
            tick,
            state,
            entries: log.entries,
            score,
            applied_at: now,
        };

        match self.store.commit_tick(commit)? {
            CommitOutcome::Applied => {
                if concluded {
                    info!(war = war.0, tick, victor = ?score.victor, "War concluded on tick");
                } else {
                    debug!(war = war.0, tick, trigger = ?payload.trigger, "Tick committed");
                }
                Ok(true)
            }
            CommitOutcome::AlreadyApplied => {
                debug!(war = war.0, tick, "Lost ledger race, tick already applied");
                Ok(false)
            }
            CommitOutcome::Stale => {
                debug!(war = war.0, tick, "War changed while the tick ran, dropping it");
                Ok(false)
            }
        }
    }

    fn next_tick(&self, war: WarId) -> Result<Tick> {
        Ok(self.store.load_war(war)?.state.tick + 1)
    }

    /// Process every active war once. A failing war never aborts the pass.
    pub fn run_due_wars(&self) -> Result<TickPassReport> {
        let mut report = TickPassReport::default();

        for war in self.store.active_wars()? {
            let result = self.next_tick(war).and_then(|tick| {
                let payload = TickPayload::new(TickTrigger::Scheduled, self.clock.now());
                self.process_tick(war, tick, payload)
            });

            match result {
                Ok(true) => report.applied.push(war),
                Ok(false) => report.skipped.push(war),
                Err(err) => {
                    warn!(war = war.0, error = %err, "Scheduled tick failed");
                    report.failed.push((war, err.to_string()));
                }
            }
        }

        info!(
            wars = report.total(),
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Tick pass finished"
        );
        Ok(report)
    }

    /// Re-drive every active war whose last progress is older than `delay`.
    ///
    /// Each stalled war gets at most one tick per pass. Returns how many ticks
    /// were actually applied. Failures are logged and left for the next pass.
    pub fn watchdog_restart(&self, delay: Duration) -> Result<usize> {
        let now = self.clock.now();
        let mut restarted = 0;

        for war in self.store.active_wars()? {
            let record = match self.store.load_war(war) {
                Ok(record) => record,
                Err(err) => {
                    warn!(war = war.0, error = %err, "Watchdog could not load war");
                    continue;
                }
            };

            let stalled = record
                .last_progress()
                .map_or(true, |last| now - last > delay);
            if !stalled {
                continue;
            }

            let tick = record.state.tick + 1;
            let payload = TickPayload::new(TickTrigger::AutoRestart, now)
                .with_note(format!("stalled at tick {}", record.state.tick));

            match self.process_tick(war, tick, payload) {
                Ok(true) => {
                    info!(war = war.0, tick, "Watchdog restarted war");
                    restarted += 1;
                }
                Ok(false) => {}
                Err(err) => warn!(war = war.0, tick, error = %err, "Watchdog restart failed"),
            }
        }

        Ok(restarted)
    }

    /// Watchdog pass using the configured delay
    pub fn run_watchdog(&self) -> Result<usize> {
        self.watchdog_restart(self.config.watchdog_delay()?)
    }

    /// Manual recovery entry point; a no-op if the tick was already applied
    pub fn reprocess_tick(&self, war: WarId, tick: Tick, note: Option<String>) -> Result<bool> {
        let mut payload = TickPayload::new(TickTrigger::Manual, self.clock.now());
        payload.note = note;
        self.process_tick(war, tick, payload)
    }

    /// Standalone victory check.
    ///
    /// Concludes a live war that has met an end condition. Returns the final
    /// score for a decided war, `None` while it is still running.
    pub fn check_victory(&self, war: WarId) -> Result<Option<WarScore>> {
        let (max_ticks, tie_break) = (self.config.max_battle_ticks, self.config.tie_break);
        let concluded = self.update_lifecycle(war, CombatFlags::Release, |record| {
            if !check_war_end(&record.state, max_ticks) {
                return Ok(None);
            }
            record.state.conclude(tie_break).map(Some)
        })?;
        if concluded.is_some() {
            return Ok(concluded);
        }

        if self.store.load_war(war)?.state.status.is_finished() {
            return self.store.score(war);
        }
        Ok(None)
    }

    /// `active -> surrendered`; the other side wins
    pub fn surrender(&self, war: WarId, side: Side) -> Result<WarScore> {
        self.update_lifecycle(war, CombatFlags::Release, |record| {
            record.state.surrender(side).map(Some)
        })?
        .ok_or(WarError::Conflict(war))
    }

    /// Load, change and write back a war as one compare-and-swap.
    ///
    /// `change` returns the score to store, or `None` to leave the war as is.
    /// A tick landing between load and write makes the store answer `Stale`;
    /// the change is then rebuilt from a fresh load.
    fn update_lifecycle<F>(&self, war: WarId, flags: CombatFlags, mut change: F) -> Result<Option<WarScore>>
    where
        F: FnMut(&mut WarRecord) -> Result<Option<WarScore>>,
    {
        for _ in 0..LIFECYCLE_ATTEMPTS {
            let mut record = self.store.load_war(war)?;
            let expected_status = record.state.status;
            let expected_tick = record.state.tick;

            let Some(score) = change(&mut record)? else {
                return Ok(None);
            };

            let transition = WarTransition {
                record,
                expected_status,
                expected_tick,
                score,
                flags,
            };
            match self.store.apply_transition(transition)? {
                CommitOutcome::Applied => return Ok(Some(score)),
                _ => debug!(war = war.0, "War moved during lifecycle change, reloading"),
            }
        }

        warn!(war = war.0, attempts = LIFECYCLE_ATTEMPTS, "Lifecycle change kept losing to ticks");
        Err(WarError::Conflict(war))
    }

    pub fn war(&self, war: WarId) -> Result<WarState> {
        Ok(self.store.load_war(war)?.state)
    }

    pub fn score(&self, war: WarId) -> Result<Option<WarScore>> {
        self.store.score(war)
    }

    /// Log rows from the table matching the war's participant model
    pub fn combat_log(&self, war: WarId) -> Result<Vec<CombatLogEntry>> {
        let record = self.store.load_war(war)?;
        self.store.combat_log(LogTable::for_state(&record.state), war)
    }
}
