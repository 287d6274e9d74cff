//! Write-ahead tick backup
//!
//! Every tick request is written here before the ledger is touched, whether or
//! not it ends up applied. The records exist for forensic replay only.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{Result, WarError};
use crate::core::types::{Tick, WarId};

/// What asked for a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickTrigger {
    Scheduled,
    AutoRestart,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickPayload {
    pub trigger: TickTrigger,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TickPayload {
    pub fn new(trigger: TickTrigger, requested_at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            requested_at,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One backup row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickBackup {
    pub id: Uuid,
    pub war_id: WarId,
    pub tick: Tick,
    pub payload: TickPayload,
    pub created_at: DateTime<Utc>,
}

impl TickBackup {
    pub fn new(war_id: WarId, tick: Tick, payload: TickPayload, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            war_id,
            tick,
            payload,
            created_at,
        }
    }
}

pub trait BackupSink: Send + Sync {
    fn write(&self, backup: &TickBackup) -> Result<()>;
}

/// Keeps backups in memory
#[derive(Debug, Default)]
pub struct MemoryBackup {
    records: Mutex<Vec<TickBackup>>,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TickBackup> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackupSink for MemoryBackup {
    fn write(&self, backup: &TickBackup) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(backup.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlBackup {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlBackup {
    /// Open (or create) the backup file in append mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, in write order
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<TickBackup>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl BackupSink for JsonlBackup {
    fn write(&self, backup: &TickBackup) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| WarError::Store("backup writer lock poisoned".into()))?;
        serde_json::to_writer(&mut *writer, backup)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
