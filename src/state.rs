use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{ProfileError, Result};

/// State stored in ~/.vibecode/state.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct State {
    /// The profile most recently switched to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,

    /// Auto-backup profile written by that switch; switching to it undoes the switch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<String>,

    /// When the state was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl State {
    /// Read state from file, returning default if file doesn't exist
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(ProfileError::io(path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Remember the auto-backup of a switch that is about to mutate
    pub fn record_backup(path: &Path, backup: &str) -> Result<()> {
        let mut locked = LockedState::lock(path)?;
        locked.update(|s| s.last_backup = Some(backup.to_string()))
    }

    /// Record a completed switch under an exclusive lock
    pub fn record_switch(path: &Path, profile: &str, backup: &str) -> Result<()> {
        let mut locked = LockedState::lock(path)?;
        locked.update(|s| {
            s.active_profile = Some(profile.to_string());
            s.last_backup = Some(backup.to_string());
        })
    }

    /// Forget the active profile if it is `name` (e.g. after deleting it)
    pub fn clear_if_active(path: &Path, name: &str) -> Result<()> {
        if State::read(path)?.active_profile.as_deref() != Some(name) {
            return Ok(());
        }
        let mut locked = LockedState::lock(path)?;
        locked.update(|s| s.active_profile = None)
    }
}

/// A locked state file handle for safe concurrent access
pub struct LockedState {
    file: File,
    state: State,
    path: PathBuf,
}

impl LockedState {
    /// Open and lock the state file for exclusive access
    pub fn lock(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ProfileError::io(parent))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(ProfileError::io(path))?;

        // Blocks until available
        file.lock_exclusive().map_err(ProfileError::io(path))?;

        let state = Self::read_from_file(&file, path)?;

        Ok(Self {
            file,
            state,
            path: path.to_path_buf(),
        })
    }

    fn read_from_file(mut file: &File, path: &Path) -> Result<State> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(ProfileError::io(path))?;

        if content.trim().is_empty() {
            return Ok(State::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Get the current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Update and save the state
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut State),
    {
        f(&mut self.state);
        self.state.updated_at = Some(Utc::now());
        self.save()
    }

    fn save(&mut self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.state)?;

        let io_err = || ProfileError::io(&self.path);
        self.file.set_len(0).map_err(io_err())?;
        self.file.seek(SeekFrom::Start(0)).map_err(io_err())?;
        self.file.write_all(content.as_bytes()).map_err(io_err())?;
        self.file.sync_all().map_err(io_err())?;
        log::debug!("Wrote state to {}", self.path.display());

        Ok(())
    }
}

impl Drop for LockedState {
    fn drop(&mut self) {
        // Ignore errors during drop
        let _ = FileExt::unlock(&self.file);
    }
}
