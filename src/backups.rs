//! Configuration backups.
//!
//! Each backup is a directory under `backups/` holding `settings.json`,
//! `keybindings.json` and `metadata.json`. Labelled backups are named
//! `before-<label>` and only the latest per label is kept; unlabelled ones
//! are `manual-backup-<timestamp>`.

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config_store::{ConfigStore, KeyBinding, Settings, theme_of};
use crate::error::{ProfileError, Result};
use crate::fs_utils::{exists, read_json, write_json_atomic};
use crate::paths::Paths;

const LABELLED_PREFIX: &str = "before-";
const MANUAL_PREFIX: &str = "manual-backup-";
const LEGACY_PREFIX: &str = "backup-";

/// Theme name reported when a backup's settings carry no theme
pub const DEFAULT_THEME_NAME: &str = "Default Dark Modern";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupMetadata {
    theme_name: String,
    timestamp: String,
    date: String,
    platform: String,
    tool_version: String,
}

/// A backup as listed to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub name: String,
    pub path: PathBuf,
    pub theme_label: String,
    pub captured_theme: String,
    pub timestamp: String,
    pub human_date: String,
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    backups_dir: PathBuf,
}

impl BackupStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            backups_dir: paths.backups_dir.clone(),
        }
    }

    /// Directory name a backup with this label is stored under
    pub fn backup_name(label: Option<&str>, timestamp: &str) -> String {
        match label {
            Some(label) => format!("{}{}", LABELLED_PREFIX, slugify(label)),
            None => format!("{}{}", MANUAL_PREFIX, timestamp),
        }
    }

    /// Snapshot the live settings and keybindings
    ///
    /// An existing backup with the same label is replaced. The new snapshot
    /// is fully written to a staging directory before the old one goes away.
    pub async fn create_backup(&self, config: &ConfigStore, label: Option<&str>) -> Result<BackupRecord> {
        let settings = config.read_settings().await?;
        let keybindings = config.read_keybindings().await?;
        self.write_backup(label, &settings, &keybindings).await
    }

    pub async fn write_backup(
        &self,
        label: Option<&str>,
        settings: &Settings,
        keybindings: &[KeyBinding],
    ) -> Result<BackupRecord> {
        let now = Utc::now();
        let timestamp = now
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let name = Self::backup_name(label, &timestamp);
        let target = self.backups_dir.join(&name);
        let staging = self.backups_dir.join(format!(".{}.tmp", name));

        if exists(&staging).await {
            fs::remove_dir_all(&staging)
                .await
                .map_err(ProfileError::io(&staging))?;
        }
        fs::create_dir_all(&staging)
            .await
            .map_err(ProfileError::io(&staging))?;

        let metadata = BackupMetadata {
            theme_name: label.unwrap_or("Manual Backup").to_string(),
            timestamp: timestamp.clone(),
            date: now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            platform: std::env::consts::OS.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        write_json_atomic(&staging.join("settings.json"), settings).await?;
        write_json_atomic(&staging.join("keybindings.json"), &keybindings).await?;
        write_json_atomic(&staging.join("metadata.json"), &metadata).await?;

        if exists(&target).await {
            fs::remove_dir_all(&target)
                .await
                .map_err(ProfileError::io(&target))?;
        }
        fs::rename(&staging, &target)
            .await
            .map_err(ProfileError::io(&target))?;
        log::info!("Created backup {}", target.display());

        Ok(BackupRecord {
            name,
            path: target,
            theme_label: metadata.theme_name,
            captured_theme: theme_of(settings).unwrap_or_else(|| DEFAULT_THEME_NAME.to_string()),
            timestamp,
            human_date: metadata.date,
        })
    }

    /// List backups, newest first by recorded timestamp
    pub async fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        if !exists(&self.backups_dir).await {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.backups_dir)
            .await
            .map_err(ProfileError::io(&self.backups_dir))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(ProfileError::io(&self.backups_dir))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(LABELLED_PREFIX) || name.starts_with(MANUAL_PREFIX) {
                records.push(read_record(&name, &entry.path()).await);
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Find a backup by exact name, falling back to a unique substring match
    pub async fn find_backup(&self, query: &str) -> Result<BackupRecord> {
        let backups = self.list_backups().await?;
        if let Some(exact) = backups.iter().find(|b| b.name == query) {
            return Ok(exact.clone());
        }
        let mut matches = backups.into_iter().filter(|b| b.name.contains(query));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            _ => Err(ProfileError::BackupNotFound(query.to_string())),
        }
    }

    /// Write a backup's settings and keybindings back as the live config
    pub async fn restore_backup(&self, config: &ConfigStore, name: &str) -> Result<BackupRecord> {
        let record = self.find_backup(name).await?;
        let settings: Settings = read_json(&record.path.join("settings.json")).await?;
        let keybindings: Vec<KeyBinding> = read_json(&record.path.join("keybindings.json")).await?;

        config.write_settings(&settings).await?;
        config.write_keybindings(&keybindings).await?;
        log::info!("Restored backup {}", record.name);
        Ok(record)
    }

    /// Remove `backup-*` entries left by older versions
    pub async fn cleanup_legacy_backups(&self) -> Result<usize> {
        if !exists(&self.backups_dir).await {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.backups_dir)
            .await
            .map_err(ProfileError::io(&self.backups_dir))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(ProfileError::io(&self.backups_dir))?
        {
            let is_legacy = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(LEGACY_PREFIX));
            if !is_legacy {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path).await.map_err(ProfileError::io(&path))?;
            } else {
                fs::remove_file(&path).await.map_err(ProfileError::io(&path))?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

/// Build a record from whatever is on disk; unreadable parts fall back to defaults
async fn read_record(name: &str, path: &Path) -> BackupRecord {
    let mut record = BackupRecord {
        name: name.to_string(),
        path: path.to_path_buf(),
        theme_label: name.to_string(),
        captured_theme: "Unknown".to_string(),
        timestamp: String::new(),
        human_date: "Unknown".to_string(),
    };

    let metadata_path = path.join("metadata.json");
    if exists(&metadata_path).await {
        match read_json::<serde_json::Value>(&metadata_path).await {
            Ok(meta) => {
                let field = |key: &str| meta.get(key).and_then(|v| v.as_str()).map(str::to_string);
                if let Some(label) = field("themeName") {
                    record.theme_label = label;
                }
                record.timestamp = field("timestamp").unwrap_or_default();
                if let Some(date) = field("date") {
                    record.human_date = date;
                }
            }
            Err(e) => log::warn!("Unreadable backup metadata {}: {}", metadata_path.display(), e),
        }
    }

    let settings_path = path.join("settings.json");
    if exists(&settings_path).await {
        match read_json::<Settings>(&settings_path).await {
            Ok(settings) => {
                record.captured_theme =
                    theme_of(&settings).unwrap_or_else(|| DEFAULT_THEME_NAME.to_string());
            }
            Err(e) => log::warn!("Unreadable backup settings {}: {}", settings_path.display(), e),
        }
    }

    record
}

fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
