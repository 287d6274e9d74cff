use thiserror::Error;

use crate::core::types::{Tick, WarId};

#[derive(Error, Debug)]
pub enum WarError {
    #[error("War not found: {0:?}")]
    WarNotFound(WarId),

    #[error("Invalid war transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Tick out of order for {war:?}: expected {expected}, requested {requested}")]
    TickOutOfOrder {
        war: WarId,
        expected: Tick,
        requested: Tick,
    },

    #[error("War {0:?} kept changing during a lifecycle update")]
    Conflict(WarId),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, WarError>;
