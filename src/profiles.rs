//! Profile data model and on-disk store.
//!
//! Profiles live at `<profiles_dir>/<name>/profile.json`, one directory per
//! profile. Each record is written atomically, so a profile is never left
//! half-written.
//!
//! The store keeps an in-memory cache of loaded profiles. The cache is only
//! touched through this type; call [`ProfileStore::invalidate`] or
//! [`ProfileStore::refresh`] after something else changed the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::fs;

use crate::config_store::{KeyBinding, Settings};
use crate::error::{ProfileError, Result};
use crate::extensions::dedup_ids;
use crate::fs_utils::{exists, read_json, write_json_atomic};
use crate::paths::Paths;

/// Schema version written into new profiles
pub const PROFILE_VERSION: &str = "1.0.0";

const MAX_NAME_LEN: usize = 96;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionMode {
    /// Target list replaces the current set (modulo protection)
    #[default]
    Strict,
    /// Target list is only added; nothing is removed
    Additive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default)]
    pub mode: ExtensionMode,
    #[serde(default)]
    pub list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

/// A named snapshot of settings, keybindings and an extension set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub keybindings: Vec<KeyBinding>,
    pub metadata: ProfileMetadata,
}

impl Profile {
    /// Parse a profile from JSON text, normalizing the extension list
    pub fn from_json(content: &str) -> Result<Self> {
        let mut profile: Profile = serde_json::from_str(content)
            .map_err(|e| ProfileError::InvalidProfileStructure(e.to_string()))?;
        profile.normalize();
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Description shown in listings: top-level first, then metadata
    pub fn display_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.metadata.description.as_deref())
            .filter(|d| !d.is_empty())
    }

    fn normalize(&mut self) {
        dedup_ids(&mut self.extensions.list);
        if let Some(protected) = self.extensions.protected.as_mut() {
            dedup_ids(protected);
        }
    }
}

/// Lightweight listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub extension_count: usize,
    pub theme: Option<String>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            description: profile.display_description().map(str::to_string),
            created_at: profile.metadata.created_at,
            updated_at: profile.metadata.updated_at,
            extension_count: profile.extensions.list.len(),
            theme: profile.theme.clone(),
        }
    }
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens so that a
/// name always maps to a single directory under the profiles dir.
pub fn validate_profile_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| ProfileError::InvalidProfileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("name cannot be longer than 96 characters"));
    }

    // Allow a-z, A-Z, 0-9, -, _
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "only alphanumeric characters, hyphens (-), and underscores (_) are allowed",
        ));
    }

    Ok(())
}

/// Owns the on-disk profile records
#[derive(Debug)]
pub struct ProfileStore {
    paths: Paths,
    cache: Mutex<HashMap<String, Profile>>,
}

impl ProfileStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            paths: paths.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Profile>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop every cached profile
    pub fn invalidate(&self) {
        self.cache().clear();
    }

    /// Drop the cache and reload every profile from disk
    pub async fn refresh(&self) -> Result<Vec<ProfileSummary>> {
        self.invalidate();
        self.list().await
    }

    pub async fn exists(&self, name: &str) -> bool {
        validate_profile_name(name).is_ok() && exists(&self.paths.profile_file(name)).await
    }

    pub async fn load(&self, name: &str) -> Result<Profile> {
        if let Some(profile) = self.cache().get(name) {
            return Ok(profile.clone());
        }

        validate_profile_name(name).map_err(|_| ProfileError::ProfileNotFound(name.to_string()))?;
        let path = self.paths.profile_file(name);
        if !exists(&path).await {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(ProfileError::io(&path))?;
        let profile = Profile::from_json(&content)?;
        log::debug!("Loaded profile '{}' from {}", name, path.display());

        self.cache().insert(name.to_string(), profile.clone());
        Ok(profile)
    }

    /// Persist a profile under its own name
    ///
    /// Fails with `ProfileAlreadyExists` when the name is taken and
    /// `overwrite` is false.
    pub async fn save(&self, profile: &Profile, overwrite: bool) -> Result<()> {
        validate_profile_name(&profile.name)?;
        let path = self.paths.profile_file(&profile.name);

        if !overwrite && exists(&path).await {
            return Err(ProfileError::ProfileAlreadyExists(profile.name.clone()));
        }

        let mut normalized = profile.clone();
        normalized.normalize();
        write_json_atomic(&path, &normalized).await?;
        log::info!("Saved profile '{}'", profile.name);

        self.cache().insert(normalized.name.clone(), normalized);
        Ok(())
    }

    /// List profile summaries, most recently updated first
    pub async fn list(&self) -> Result<Vec<ProfileSummary>> {
        let dir = &self.paths.profiles_dir;
        if !exists(dir).await {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(ProfileError::io(dir))?;
        while let Some(entry) = entries.next_entry().await.map_err(ProfileError::io(dir))? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        let mut summaries = Vec::new();
        for name in names {
            if !exists(&self.paths.profile_file(&name)).await {
                continue;
            }
            match self.load(&name).await {
                Ok(profile) => summaries.push(ProfileSummary::from(&profile)),
                Err(e) => log::warn!("Skipping profile '{}': {}", name, e),
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name).await {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }

        let dir = self.paths.profile_dir(name);
        fs::remove_dir_all(&dir)
            .await
            .map_err(ProfileError::io(&dir))?;
        self.cache().remove(name);
        log::info!("Deleted profile '{}'", name);
        Ok(())
    }

    /// Rename a profile, rewriting its `name` field
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<Profile> {
        validate_profile_name(new_name)?;
        let mut profile = self.load(old_name).await?;
        if self.exists(new_name).await {
            return Err(ProfileError::ProfileAlreadyExists(new_name.to_string()));
        }

        profile.name = new_name.to_string();
        profile.metadata.updated_at = Utc::now();
        self.save(&profile, false).await?;
        self.delete(old_name).await?;
        Ok(profile)
    }

    /// Write a profile to an arbitrary file for manual sharing
    pub async fn export_to_file(&self, name: &str, output: &Path) -> Result<()> {
        let profile = self.load(name).await?;
        write_json_atomic(output, &profile).await
    }

    /// Read a profile file and store it, optionally under a new name
    pub async fn import_from_file(
        &self,
        input: &Path,
        target_name: Option<&str>,
        overwrite: bool,
    ) -> Result<Profile> {
        let value: serde_json::Value = read_json(input).await?;
        let mut profile: Profile = serde_json::from_value(value)
            .map_err(|e| ProfileError::InvalidProfileStructure(e.to_string()))?;
        if let Some(name) = target_name {
            profile.name = name.to_string();
        }
        profile.metadata.updated_at = Utc::now();
        self.save(&profile, overwrite).await?;
        Ok(profile)
    }
}
