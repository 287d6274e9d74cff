//! Target selection and unit-type counter multipliers
//!
//! Counter rows belong to the reference-data layer. Lookups go through an
//! explicit cache that must be invalidated whenever the rows change.

use std::sync::{PoisonError, RwLock};

use ahash::AHashMap;
use serde::Deserialize;

use crate::battle::unit_type::UnitType;
use crate::battle::units::Unit;
use crate::core::error::{Result, WarError};

/// Pick a target: first priority tag with a matching enemy, else the nearest enemy
///
/// Priority order wins over enemy order. Distance ties keep the earlier enemy.
pub fn select_target<'a>(unit: &Unit, enemies: &[&'a Unit]) -> Option<&'a Unit> {
    for wanted in &unit.target_priority {
        if let Some(enemy) = enemies.iter().find(|e| e.unit_type == *wanted) {
            return Some(*enemy);
        }
    }

    enemies
        .iter()
        .min_by_key(|e| unit.position.chebyshev_distance(&e.position))
        .copied()
}

/// Source of counter multipliers (attacker type vs defender type)
pub trait CounterSource: Send + Sync {
    /// `None` when the table has no row for the pair
    fn lookup(&self, attacker: UnitType, defender: UnitType) -> Option<f32>;
}

#[derive(Debug, Deserialize)]
struct CounterRow {
    attacker: UnitType,
    defender: UnitType,
    multiplier: f32,
}

#[derive(Debug, Deserialize)]
struct CounterFile {
    #[serde(default)]
    counter: Vec<CounterRow>,
}

/// Counter table rows keyed by type pair
#[derive(Debug, Clone, Default)]
pub struct CounterTable {
    rows: AHashMap<(UnitType, UnitType), f32>,
}

impl CounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock rows shipped with the game
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.set(UnitType::Spearman, UnitType::Cavalry, 1.5);
        table.set(UnitType::Spearman, UnitType::Knight, 1.5);
        table.set(UnitType::Cavalry, UnitType::Archer, 1.5);
        table.set(UnitType::Knight, UnitType::Archer, 1.5);
        table.set(UnitType::Archer, UnitType::Swordsman, 1.25);
        table.set(UnitType::Crossbowman, UnitType::Knight, 1.5);
        table.set(UnitType::Swordsman, UnitType::Spearman, 1.25);
        table.set(UnitType::Cavalry, UnitType::Siege, 2.0);
        table.set(UnitType::Knight, UnitType::Siege, 2.0);
        table
    }

    /// Parse `[[counter]]` rows from TOML
    ///
    /// ```toml
    /// [[counter]]
    /// attacker = "spearman"
    /// defender = "cavalry"
    /// multiplier = 1.5
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CounterFile = toml::from_str(contents)?;
        let mut table = Self::new();
        for row in file.counter {
            if row.multiplier < 0.0 {
                return Err(WarError::Config(format!(
                    "negative counter multiplier for {} vs {}",
                    row.attacker, row.defender
                )));
            }
            table.set(row.attacker, row.defender, row.multiplier);
        }
        Ok(table)
    }

    pub fn set(&mut self, attacker: UnitType, defender: UnitType, multiplier: f32) {
        self.rows.insert((attacker, defender), multiplier);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CounterSource for CounterTable {
    fn lookup(&self, attacker: UnitType, defender: UnitType) -> Option<f32> {
        self.rows.get(&(attacker, defender)).copied()
    }
}

/// Capacity-bounded memo of counter lookups, shared across tick invocations
///
/// When full the whole cache is flushed; rows are cheap to re-read.
#[derive(Debug)]
pub struct CounterCache {
    entries: RwLock<AHashMap<(UnitType, UnitType), f32>>,
    capacity: usize,
}

impl CounterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Counter multiplier for a type pair, 1.0 when the source has no row
    pub fn multiplier(&self, source: &dyn CounterSource, attacker: UnitType, defender: UnitType) -> f32 {
        let key = (attacker, defender);
        if let Some(value) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return *value;
        }

        let value = source.lookup(attacker, defender).unwrap_or(1.0);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert(key, value);
        value
    }

    /// Drop every cached value (call after the counter table changes)
    pub fn invalidate(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{GridPos, KingdomId, UnitId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unit(id: u64, unit_type: UnitType, x: i32, y: i32) -> Unit {
        Unit::new(UnitId(id), KingdomId(id), unit_type, 10, GridPos::new(x, y))
    }

    #[test]
    fn test_priority_beats_distance() {
        let attacker = unit(1, UnitType::Cavalry, 0, 0)
            .with_target_priority(vec![UnitType::Archer]);
        let swordsman = unit(2, UnitType::Swordsman, 1, 0);
        let archer = unit(3, UnitType::Archer, 9, 9);

        let target = select_target(&attacker, &[&swordsman, &archer]).unwrap();
        assert_eq!(target.id, UnitId(3));
    }

    #[test]
    fn test_priority_list_order_not_enemy_order() {
        let attacker = unit(1, UnitType::Knight, 0, 0)
            .with_target_priority(vec![UnitType::Siege, UnitType::Archer]);
        let archer = unit(2, UnitType::Archer, 1, 0);
        let siege = unit(3, UnitType::Siege, 5, 0);

        let target = select_target(&attacker, &[&archer, &siege]).unwrap();
        assert_eq!(target.id, UnitId(3));
    }

    #[test]
    fn test_nearest_when_no_priority_match() {
        let attacker = unit(1, UnitType::Cavalry, 5, 5)
            .with_target_priority(vec![UnitType::Archer]);
        let far = unit(2, UnitType::Swordsman, 15, 5);
        let near = unit(3, UnitType::Spearman, 7, 6);

        let target = select_target(&attacker, &[&far, &near]).unwrap();
        assert_eq!(target.id, UnitId(3));
    }

    #[test]
    fn test_no_enemies_no_target() {
        let attacker = unit(1, UnitType::Cavalry, 5, 5);
        assert!(select_target(&attacker, &[]).is_none());
    }

    struct CountingSource {
        table: CounterTable,
        calls: AtomicUsize,
    }

    impl CounterSource for CountingSource {
        fn lookup(&self, attacker: UnitType, defender: UnitType) -> Option<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.lookup(attacker, defender)
        }
    }

    #[test]
    fn test_cache_memoizes_and_defaults_to_neutral() {
        let source = CountingSource {
            table: CounterTable::standard(),
            calls: AtomicUsize::new(0),
        };
        let cache = CounterCache::new(16);

        assert_eq!(cache.multiplier(&source, UnitType::Spearman, UnitType::Cavalry), 1.5);
        assert_eq!(cache.multiplier(&source, UnitType::Spearman, UnitType::Cavalry), 1.5);
        assert_eq!(cache.multiplier(&source, UnitType::Archer, UnitType::Archer), 1.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_picks_up_new_rows() {
        let mut table = CounterTable::new();
        let cache = CounterCache::new(16);
        assert_eq!(cache.multiplier(&table, UnitType::Archer, UnitType::Knight), 1.0);

        table.set(UnitType::Archer, UnitType::Knight, 0.5);
        assert_eq!(cache.multiplier(&table, UnitType::Archer, UnitType::Knight), 1.0);

        cache.invalidate();
        assert!(cache.is_empty());
        assert_eq!(cache.multiplier(&table, UnitType::Archer, UnitType::Knight), 0.5);
    }

    #[test]
    fn test_cache_capacity_bounded() {
        let table = CounterTable::standard();
        let cache = CounterCache::new(3);
        for defender in UnitType::ALL {
            cache.multiplier(&table, UnitType::Swordsman, defender);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_counter_table_from_toml() {
        let table = CounterTable::from_toml_str(
            r#"
            [[counter]]
            attacker = "spearman"
            defender = "knight"
            multiplier = 1.75
            "#,
        )
        .unwrap();
        assert_eq!(table.lookup(UnitType::Spearman, UnitType::Knight), Some(1.75));
        assert_eq!(table.lookup(UnitType::Knight, UnitType::Spearman), None);
        assert_eq!(table.len(), 1);
    }
}
