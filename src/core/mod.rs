pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, ResolverKind, TieBreak};
pub use error::{Result, WarError};
pub use types::{AllianceId, GridPos, KingdomId, Tick, UnitId, WarId};
