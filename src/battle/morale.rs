//! Morale shifts from combat exchanges
//!
//! The side that takes damage loses morale, the side that dealt it gains the
//! same amount. Both ends clamp to the 0-100 scale.

use crate::battle::units::Unit;

/// Morale change applied by one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoraleShift {
    pub attacker_delta: i32,
    pub defender_delta: i32,
}

/// Apply the exchange shift; returns the deltas actually applied after clamping
pub fn apply_exchange_morale(attacker: &mut Unit, defender: &mut Unit, shift: u8) -> MoraleShift {
    let attacker_before = i32::from(attacker.morale.value());
    let defender_before = i32::from(defender.morale.value());

    attacker.morale.raise(shift);
    defender.morale.lower(shift);

    MoraleShift {
        attacker_delta: i32::from(attacker.morale.value()) - attacker_before,
        defender_delta: i32::from(defender.morale.value()) - defender_before,
    }
}

/// Did this exchange push the defender past its withdraw threshold?
pub fn triggered_withdraw(defender: &Unit, shift: MoraleShift) -> bool {
    let Some(threshold) = defender.withdraw_threshold else {
        return false;
    };
    let before = i32::from(defender.morale.value()) - shift.defender_delta;
    before >= i32::from(threshold.value()) && defender.morale < threshold
}
