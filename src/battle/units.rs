//! Unit roster entries: position, stance, morale and orders
//!
//! A unit is a stack of `quantity` troops of one type owned by one kingdom.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::MORALE_MAX;
use crate::battle::unit_type::UnitType;
use crate::core::types::{GridPos, KingdomId, UnitId};

/// Behavioral mode governing movement
///
/// Falling back is not a stance of its own: it kicks in whenever morale drops
/// below the unit's withdraw threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStance {
    #[default]
    HoldGround,
    AdvanceEngage,
    PatrolZone,
}

/// Roster status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Active,
    Destroyed,
}

/// Morale on the canonical 0-100 scale
///
/// Rosters may carry either representation: an integer is read as points,
/// a float as a 0.0-1.0 fraction. Both are converted once at load time and
/// nothing inside the engine works on fractions. Serialized as points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "MoraleRepr")]
pub struct Morale(u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum MoraleRepr {
    Points(u64),
    Fraction(f32),
}

impl From<MoraleRepr> for Morale {
    fn from(repr: MoraleRepr) -> Self {
        match repr {
            MoraleRepr::Points(points) => Morale::new(points.min(u64::from(MORALE_MAX)) as u8),
            MoraleRepr::Fraction(fraction) => Morale::from_fraction(fraction),
        }
    }
}

impl Morale {
    pub const MAX: Morale = Morale(MORALE_MAX);

    pub fn new(value: u8) -> Self {
        Self(value.min(MORALE_MAX))
    }

    /// Convert from the fractional 0.0-1.0 representation
    pub fn from_fraction(fraction: f32) -> Self {
        let scaled = (fraction.clamp(0.0, 1.0) * f32::from(MORALE_MAX)).round();
        Self(scaled as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn raise(&mut self, amount: u8) {
        self.0 = self.0.saturating_add(amount).min(MORALE_MAX);
    }

    pub fn lower(&mut self, amount: u8) {
        self.0 = self.0.saturating_sub(amount);
    }
}

impl Default for Morale {
    fn default() -> Self {
        Self::MAX
    }
}

/// Rectangle a patrolling unit wanders inside (inclusive corners)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolZone {
    pub min: GridPos,
    pub max: GridPos,
}

impl PatrolZone {
    /// Corners may be given in any order
    pub fn new(a: GridPos, b: GridPos) -> Self {
        Self {
            min: GridPos::new(a.x.min(b.x), a.y.min(b.y)),
            max: GridPos::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x) && (self.min.y..=self.max.y).contains(&pos.y)
    }

    /// Uniformly random cell inside the zone
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> GridPos {
        // Re-normalize in case the zone was deserialized with swapped corners
        let zone = PatrolZone::new(self.min, self.max);
        GridPos::new(
            rng.gen_range(zone.min.x..=zone.max.x),
            rng.gen_range(zone.min.y..=zone.max.y),
        )
    }
}

/// A unit taking part in a war
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub kingdom_id: KingdomId,
    pub unit_type: UnitType,
    pub quantity: u32,
    pub hit_points: u32,
    pub position: GridPos,
    pub stance: UnitStance,
    pub morale: Morale,
    pub status: UnitStatus,

    // Orders
    #[serde(default)]
    pub path: VecDeque<GridPos>,
    #[serde(default)]
    pub patrol_zone: Option<PatrolZone>,
    #[serde(default)]
    pub fallback_point: Option<GridPos>,
    #[serde(default)]
    pub withdraw_threshold: Option<Morale>,
    #[serde(default)]
    pub target_priority: Vec<UnitType>,

    // Published for the UI layer
    #[serde(default)]
    pub visible_enemies: Vec<UnitId>,
}

impl Unit {
    /// Create a unit with full morale and hit points derived from default troop stats
    pub fn new(
        id: UnitId,
        kingdom_id: KingdomId,
        unit_type: UnitType,
        quantity: u32,
        position: GridPos,
    ) -> Self {
        let hit_points = quantity.saturating_mul(unit_type.default_properties().troop_hit_points);
        Self {
            id,
            kingdom_id,
            unit_type,
            quantity,
            hit_points,
            position,
            stance: UnitStance::default(),
            morale: Morale::default(),
            status: UnitStatus::Active,
            path: VecDeque::new(),
            patrol_zone: None,
            fallback_point: None,
            withdraw_threshold: None,
            target_priority: Vec::new(),
            visible_enemies: Vec::new(),
        }
    }

    pub fn with_stance(mut self, stance: UnitStance) -> Self {
        self.stance = stance;
        self
    }

    pub fn with_path(mut self, waypoints: impl IntoIterator<Item = GridPos>) -> Self {
        self.path = waypoints.into_iter().collect();
        self
    }

    pub fn with_hit_points(mut self, hit_points: u32) -> Self {
        self.hit_points = hit_points;
        self
    }

    pub fn with_patrol_zone(mut self, zone: PatrolZone) -> Self {
        self.patrol_zone = Some(zone);
        self
    }

    pub fn with_fallback(mut self, point: GridPos, threshold: Morale) -> Self {
        self.fallback_point = Some(point);
        self.withdraw_threshold = Some(threshold);
        self
    }

    pub fn with_target_priority(mut self, priority: Vec<UnitType>) -> Self {
        self.target_priority = priority;
        self
    }

    /// Is this unit still on the field?
    pub fn is_alive(&self) -> bool {
        self.status == UnitStatus::Active && self.hit_points > 0 && self.quantity > 0
    }

    /// Is morale below the withdraw threshold?
    pub fn is_withdrawing(&self) -> bool {
        self.withdraw_threshold
            .is_some_and(|threshold| self.morale < threshold)
    }
}
