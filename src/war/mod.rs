//! Durable side of the engine: storage, write-ahead backup, time and the
//! `WarManager` service that wraps the battle step function with the
//! execution ledger.

pub mod backup;
pub mod clock;
pub mod manager;
pub mod store;

pub use backup::{BackupSink, JsonlBackup, MemoryBackup, TickBackup, TickPayload, TickTrigger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{tick_rng, TickPassReport, WarManager};
pub use store::{
    CombatFlags, CommitOutcome, InMemoryStore, LogTable, TickCommit, WarRecord, WarStore,
    WarTransition,
};
