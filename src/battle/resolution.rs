//! Combat resolution between co-located opposing units, plus siege damage
//!
//! Two strategies share one interface:
//! - `Simplified`: every opposing pair in a cell exchanges flat damage.
//! - `Full`: each attacker strikes its selected target with counter
//!   multipliers, troop losses and morale shifts. Persisted wars use this one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::combat_log::{CombatLog, CombatLogEntry};
use crate::battle::morale::{apply_exchange_morale, triggered_withdraw};
use crate::battle::participants::{Side, WarKind};
use crate::battle::targeting::{select_target, CounterCache, CounterSource};
use crate::battle::unit_type::StatTable;
use crate::battle::units::{Unit, UnitStatus};
use crate::core::config::ResolverKind;
use crate::core::types::{GridPos, Tick};

/// Read-only inputs a resolver needs for one tick
pub struct CombatContext<'a> {
    pub tick: Tick,
    pub kind: &'a WarKind,
    pub stats: &'a StatTable,
    pub counters: &'a CounterCache,
    pub counter_source: &'a dyn CounterSource,
    pub damage_per_troop: u32,
    pub morale_shift: u8,
}

/// Damage dealt per side during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideDamage {
    pub attacker: u64,
    pub defender: u64,
}

impl SideDamage {
    pub fn add(&mut self, side: Side, damage: u32) {
        match side {
            Side::Attacker => self.attacker += u64::from(damage),
            Side::Defender => self.defender += u64::from(damage),
        }
    }
}

/// Result of resolving all cells
#[derive(Debug, Clone, Default)]
pub struct CombatOutcome {
    pub destroyed: Vec<Unit>,
    pub damage: SideDamage,
}

/// Combat strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatResolver {
    Simplified,
    Full,
}

impl From<ResolverKind> for CombatResolver {
    fn from(kind: ResolverKind) -> Self {
        match kind {
            ResolverKind::Simplified => CombatResolver::Simplified,
            ResolverKind::Full => CombatResolver::Full,
        }
    }
}

/// Borrow two distinct roster entries mutably
fn pair_mut(units: &mut [Unit], a: usize, b: usize) -> (&mut Unit, &mut Unit) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = units.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = units.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Group living units by cell (deterministic cell order)
fn group_by_cell(units: &[Unit]) -> BTreeMap<GridPos, Vec<usize>> {
    let mut cells: BTreeMap<GridPos, Vec<usize>> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate().filter(|(_, u)| u.is_alive()) {
        cells.entry(unit.position).or_default().push(i);
    }
    cells
}

impl CombatResolver {
    /// Resolve every contested cell, removing destroyed units from the roster
    pub fn resolve(&self, units: &mut Vec<Unit>, ctx: &CombatContext<'_>, log: &mut CombatLog) -> CombatOutcome {
        let mut outcome = CombatOutcome::default();

        for (position, cell) in group_by_cell(units) {
            if cell.len() < 2 {
                continue;
            }

            let mut dead: Vec<usize> = Vec::new();
            match self {
                CombatResolver::Simplified => {
                    for &a in &cell {
                        for &d in &cell {
                            if a == d || dead.contains(&a) || dead.contains(&d) {
                                continue;
                            }
                            if !ctx.kind.are_opposed(units[a].kingdom_id, units[d].kingdom_id) {
                                continue;
                            }
                            self.exchange(units, a, d, position, ctx, log, &mut dead, &mut outcome);
                        }
                    }
                }
                CombatResolver::Full => {
                    for &a in &cell {
                        if dead.contains(&a) {
                            continue;
                        }
                        let enemies: Vec<&Unit> = cell
                            .iter()
                            .filter(|&&d| d != a && !dead.contains(&d))
                            .map(|&d| &units[d])
                            .filter(|d| ctx.kind.are_opposed(units[a].kingdom_id, d.kingdom_id))
                            .collect();
                        let Some(target_id) = select_target(&units[a], &enemies).map(|t| t.id) else {
                            continue;
                        };
                        let Some(d) = cell.iter().copied().find(|&i| units[i].id == target_id) else {
                            continue;
                        };
                        self.exchange(units, a, d, position, ctx, log, &mut dead, &mut outcome);
                    }
                }
            }

            for i in dead {
                units[i].status = UnitStatus::Destroyed;
            }
        }

        let (alive, destroyed): (Vec<Unit>, Vec<Unit>) =
            units.drain(..).partition(|u| u.status == UnitStatus::Active);
        *units = alive;
        outcome.destroyed = destroyed;
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn exchange(
        &self,
        units: &mut [Unit],
        a: usize,
        d: usize,
        position: GridPos,
        ctx: &CombatContext<'_>,
        log: &mut CombatLog,
        dead: &mut Vec<usize>,
        outcome: &mut CombatOutcome,
    ) {
        let (attacker, defender) = pair_mut(units, a, d);

        let (damage, morale_delta, withdrew) = match self {
            CombatResolver::Simplified => {
                let damage = attacker
                    .quantity
                    .saturating_mul(ctx.damage_per_troop)
                    .min(defender.hit_points);
                defender.hit_points -= damage;
                (damage, 0, false)
            }
            CombatResolver::Full => {
                let attacker_props = ctx.stats.get(attacker.unit_type);
                let defender_props = ctx.stats.get(defender.unit_type);
                let counter = ctx.counters.multiplier(
                    ctx.counter_source,
                    attacker.unit_type,
                    defender.unit_type,
                );

                let raw = attacker.quantity as f32
                    * ctx.damage_per_troop as f32
                    * counter
                    * attacker_props.attack
                    / defender_props.defense.max(0.01);
                let damage = (raw.floor() as u32).min(defender.hit_points);
                defender.hit_points -= damage;

                let losses = damage / defender_props.troop_hit_points.max(1);
                defender.quantity = defender.quantity.saturating_sub(losses);
                if defender.hit_points == 0 {
                    defender.quantity = 0;
                }

                let shift = apply_exchange_morale(attacker, defender, ctx.morale_shift);
                let withdrew = defender.hit_points > 0 && triggered_withdraw(defender, shift);
                (damage, shift.defender_delta, withdrew)
            }
        };

        if let Some(side) = ctx.kind.side_of(attacker.kingdom_id) {
            outcome.damage.add(side, damage);
        }

        let mut entry = CombatLogEntry::attack(
            ctx.tick,
            attacker.id,
            defender.id,
            position,
            damage,
            morale_delta,
        );
        if withdrew {
            entry.note.push_str(&format!(", unit {} withdrawing", defender.id.0));
        }
        log.push(entry);

        if defender.hit_points == 0 || defender.quantity == 0 {
            log.push(CombatLogEntry::death(ctx.tick, attacker.id, defender.id, position));
            dead.push(d);
        }
    }
}

/// Castle damage from the attacking side's siege troops
///
/// Returns the damage applied. No log entry when the attackers field no siege.
pub fn apply_siege(
    units: &[Unit],
    kind: &WarKind,
    stats: &StatTable,
    castle_hp: &mut u32,
    damage_per_troop: u32,
    tick: Tick,
    log: &mut CombatLog,
) -> u32 {
    // Summed wide: a few full-size stacks already exceed u32
    let siege_troops: u64 = units
        .iter()
        .filter(|u| u.is_alive())
        .filter(|u| stats.get(u.unit_type).castle_capable)
        .filter(|u| kind.side_of(u.kingdom_id) == Some(Side::Attacker))
        .map(|u| u64::from(u.quantity))
        .sum();

    if siege_troops == 0 {
        return 0;
    }

    let damage = u32::try_from(siege_troops.saturating_mul(u64::from(damage_per_troop)))
        .unwrap_or(u32::MAX);
    *castle_hp = castle_hp.saturating_sub(damage);
    log.push(CombatLogEntry::siege(tick, damage, *castle_hp));
    damage
}
