//! War participants and who fights whom
//!
//! Kingdom wars pit one kingdom against another. Alliance wars pit two
//! alliance rosters against each other; membership comes from the
//! participants table.

use serde::{Deserialize, Serialize};

use crate::core::types::{AllianceId, KingdomId};

/// Side of a war
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Row of the alliance-war participants table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceMember {
    pub kingdom_id: KingdomId,
    pub alliance_id: AllianceId,
}

/// Participant model of a war
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarKind {
    Kingdom {
        attacker: KingdomId,
        defender: KingdomId,
    },
    Alliance {
        attacker: AllianceId,
        defender: AllianceId,
        members: Vec<AllianceMember>,
    },
}

impl WarKind {
    /// Which side a kingdom fights on (`None` if it is not a participant)
    pub fn side_of(&self, kingdom: KingdomId) -> Option<Side> {
        match self {
            WarKind::Kingdom { attacker, defender } => {
                if kingdom == *attacker {
                    Some(Side::Attacker)
                } else if kingdom == *defender {
                    Some(Side::Defender)
                } else {
                    None
                }
            }
            WarKind::Alliance {
                attacker,
                defender,
                members,
            } => {
                let alliance = members
                    .iter()
                    .find(|m| m.kingdom_id == kingdom)
                    .map(|m| m.alliance_id)?;
                if alliance == *attacker {
                    Some(Side::Attacker)
                } else if alliance == *defender {
                    Some(Side::Defender)
                } else {
                    None
                }
            }
        }
    }

    /// Do units of these two kingdoms fight each other?
    pub fn are_opposed(&self, a: KingdomId, b: KingdomId) -> bool {
        match (self.side_of(a), self.side_of(b)) {
            (Some(side_a), Some(side_b)) => side_a != side_b,
            _ => false,
        }
    }

    /// Every participating kingdom
    /// Every participant kingdom once, in id order
    pub fn kingdoms(&self) -> Vec<KingdomId> {
        let mut kingdoms = match self {
            WarKind::Kingdom { attacker, defender } => vec![*attacker, *defender],
            WarKind::Alliance { members, .. } => members.iter().map(|m| m.kingdom_id).collect(),
        };
        kingdoms.sort();
        kingdoms.dedup();
        kingdoms
    }

    pub fn is_alliance_war(&self) -> bool {
        matches!(self, WarKind::Alliance { .. })
    }
}
