//! On-disk guest bucket and player profile under the data directory.
use anyhow::{Context, Result};
use log::{debug, warn};
use questlog_core::{
    CollabError, GUEST_BUCKET, GuestStore, PlayerAggregate, PlayerStats, QuestRecord,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const PROFILE_FILE: &str = "player.json";

/// Guest bucket kept as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct FileGuestStore {
    path: PathBuf,
}

impl FileGuestStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{GUEST_BUCKET}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backend_error(&self, err: impl std::fmt::Display) -> CollabError {
        CollabError::Backend(format!("{}: {err}", self.path.display()))
    }

    fn write_all(&self, records: &[QuestRecord]) -> Result<(), CollabError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.backend_error(err))?;
        }
        let payload = serde_json::to_string_pretty(records).map_err(|err| self.backend_error(err))?;
        fs::write(&self.path, payload).map_err(|err| self.backend_error(err))?;
        debug!("wrote {} quests to {}", records.len(), self.path.display());
        Ok(())
    }
}

impl GuestStore for FileGuestStore {
    fn get_all(&self) -> Vec<QuestRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!("could not read {}: {err}", self.path.display());
                return Vec::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!("ignoring unreadable bucket {}: {err}", self.path.display());
            Vec::new()
        })
    }

    fn save(&mut self, record: &QuestRecord) -> Result<(), CollabError> {
        let mut records = self.get_all();
        records.insert(0, record.clone());
        self.write_all(&records)
    }

    fn update(&mut self, record: &QuestRecord) -> Result<(), CollabError> {
        let mut records = self.get_all();
        if let Some(slot) = records.iter_mut().find(|r| r.id == record.id) {
            *slot = record.clone();
        }
        self.write_all(&records)
    }

    fn delete(&mut self, id: &str) -> Result<(), CollabError> {
        let mut records = self.get_all();
        records.retain(|r| r.id != id);
        self.write_all(&records)
    }
}

/// Player aggregate and stats as saved between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProfile {
    pub player: PlayerAggregate,
    #[serde(default)]
    pub stats: PlayerStats,
}

pub fn load_profile(data_dir: &Path) -> Result<Option<SavedProfile>> {
    let path = data_dir.join(PROFILE_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", path.display())),
    };
    let profile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(profile))
}

pub fn save_profile(data_dir: &Path, player: &PlayerAggregate, stats: &PlayerStats) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let path = data_dir.join(PROFILE_FILE);
    let profile = SavedProfile {
        player: player.clone(),
        stats: stats.clone(),
    };
    let payload = serde_json::to_string_pretty(&profile)?;
    fs::write(&path, payload).with_context(|| format!("failed to write {}", path.display()))
}
