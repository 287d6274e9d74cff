//! Kingdom Wars - tactical battle tick engine
//!
//! `battle` holds the deterministic per-tick simulation, `war` runs it
//! exactly once per tick against a durable store.

pub mod battle;
pub mod core;
pub mod war;

pub use crate::core::{EngineConfig, Result, WarError};
pub use crate::war::WarManager;
