//! Theme packs: named bundles of settings, layout, keybindings and the
//! extensions they rely on.
//!
//! Built-in packs are compiled into the binary. Custom packs live at
//! `<custom_themes_dir>/<id>.vibe-pack.json` and shadow a built-in pack with
//! the same id. Applying a pack backs up the live configuration first, then
//! merges the pack's settings over it. Packs tagged `default` or `factory`
//! replace the settings outright so the editor returns to a known state.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::fs;

use crate::backups::BackupStore;
use crate::config_store::{ConfigStore, KeyBinding, Settings};
use crate::error::{ProfileError, Result};
use crate::extensions::ExtensionManager;
use crate::fs_utils::{exists, read_json, write_json_atomic};
use crate::paths::Paths;

pub const THEME_PACK_SUFFIX: &str = ".vibe-pack.json";

const THEME_PACK_VERSION: &str = "1.0.0";

const BUILTIN_PACKS: &[(&str, &str)] = &[
    ("default", include_str!("../themes/default.vibe-pack.json")),
    ("midnight-hacker", include_str!("../themes/midnight-hacker.vibe-pack.json")),
    ("morning-light", include_str!("../themes/morning-light.vibe-pack.json")),
    ("zen-focus", include_str!("../themes/zen-focus.vibe-pack.json")),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zen_mode: Option<bool>,
}

impl LayoutConfig {
    /// Editor settings this layout maps onto
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::new();
        if let Some(location) = &self.sidebar_location {
            settings.insert("workbench.sideBar.location".into(), location.clone().into());
        }
        if let Some(alignment) = &self.panel_alignment {
            settings.insert("workbench.panel.defaultLocation".into(), alignment.clone().into());
        }
        if let Some(zen) = self.zen_mode {
            settings.insert("zenMode.centerLayout".into(), zen.into());
        }
        settings
    }
}

/// A shareable look-and-feel bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub extensions: Vec<String>,
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutConfig>,
    #[serde(default, rename = "customCSS", skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keybindings: Option<Vec<KeyBinding>>,
}

impl ThemePack {
    /// Build a custom pack from a settings snapshot
    pub fn from_settings(name: &str, settings: Settings) -> Self {
        Self {
            id: theme_id_from_name(name),
            name: name.trim().to_string(),
            description: format!("Custom theme: {}", name.trim()),
            tags: vec!["custom".to_string()],
            preview: None,
            author: Some(std::env::var("USER").unwrap_or_else(|_| "Unknown".to_string())),
            version: Some(THEME_PACK_VERSION.to_string()),
            extensions: Vec::new(),
            settings,
            layout: None,
            custom_css: None,
            keybindings: None,
        }
    }

    /// Factory packs replace the settings instead of merging into them
    pub fn is_factory(&self) -> bool {
        self.tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case("default") || t.eq_ignore_ascii_case("factory"))
    }

    /// Case-insensitive match on name, description or any tag
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags
            .iter()
            .any(|t| tags.iter().any(|wanted| wanted.eq_ignore_ascii_case(t)))
    }

    pub fn validate(&self) -> Result<()> {
        validate_theme_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(ProfileError::InvalidThemePack("name cannot be empty".into()));
        }
        Ok(())
    }
}

/// Lowercase, hyphenated id derived from a display name
pub fn theme_id_from_name(name: &str) -> String {
    let mut id = String::new();
    for c in name.trim().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            if !id.is_empty() && !id.ends_with('-') {
                id.push('-');
            }
        } else if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        }
    }
    id.trim_end_matches('-').to_string()
}

fn validate_theme_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ProfileError::InvalidThemePack("id cannot be empty".into()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ProfileError::InvalidThemePack(format!(
            "id '{}' may only contain lowercase letters, digits and hyphens",
            id
        )));
    }
    Ok(())
}

fn parse_pack(content: &str) -> Result<ThemePack> {
    let pack: ThemePack =
        serde_json::from_str(content).map_err(|e| ProfileError::InvalidThemePack(e.to_string()))?;
    pack.validate()?;
    Ok(pack)
}

/// Packs compiled into the binary
pub fn builtin_packs() -> Vec<ThemePack> {
    BUILTIN_PACKS
        .iter()
        .filter_map(|(id, content)| match parse_pack(content) {
            Ok(pack) => Some(pack),
            Err(e) => {
                log::warn!("Skipping built-in theme '{}': {}", id, e);
                None
            }
        })
        .collect()
}

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_PACKS.iter().any(|(builtin, _)| *builtin == id)
}

/// Owns the custom theme directory and a cache of every known pack
#[derive(Debug)]
pub struct ThemeStore {
    paths: Paths,
    cache: Mutex<HashMap<String, ThemePack>>,
}

impl ThemeStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            paths: paths.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, ThemePack>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parse every `*.vibe-pack.json` in the custom directory
    ///
    /// Each file is reported with its own result so callers can decide
    /// whether a broken file matters.
    pub async fn scan_custom(&self) -> Result<Vec<(PathBuf, Result<ThemePack>)>> {
        let dir = &self.paths.custom_themes_dir;
        if !exists(dir).await {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(dir).await.map_err(ProfileError::io(dir))?;
        while let Some(entry) = entries.next_entry().await.map_err(ProfileError::io(dir))? {
            let is_pack = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(THEME_PACK_SUFFIX));
            if is_pack {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut scanned = Vec::new();
        for path in files {
            let parsed = match fs::read_to_string(&path).await {
                Ok(content) => parse_pack(&content),
                Err(e) => Err(ProfileError::io(&path)(e)),
            };
            scanned.push((path, parsed));
        }
        Ok(scanned)
    }

    /// Every pack, built-ins first; unreadable custom files are skipped
    pub async fn load_themes(&self) -> Result<Vec<ThemePack>> {
        let mut themes = builtin_packs();
        for (path, parsed) in self.scan_custom().await? {
            match parsed {
                Ok(pack) => match themes.iter_mut().find(|t| t.id == pack.id) {
                    Some(slot) => *slot = pack,
                    None => themes.push(pack),
                },
                Err(e) => log::warn!("Skipping theme file {}: {}", path.display(), e),
            }
        }

        let mut cache = self.cache();
        cache.clear();
        for theme in &themes {
            cache.insert(theme.id.clone(), theme.clone());
        }
        Ok(themes)
    }

    pub async fn get_theme(&self, id: &str) -> Result<ThemePack> {
        if let Some(theme) = self.cache().get(id) {
            return Ok(theme.clone());
        }
        self.load_themes()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ProfileError::ThemeNotFound(id.to_string()))
    }

    pub async fn search_themes(&self, query: &str) -> Result<Vec<ThemePack>> {
        Ok(self
            .load_themes()
            .await?
            .into_iter()
            .filter(|t| t.matches(query))
            .collect())
    }

    pub async fn filter_by_tags(&self, tags: &[String]) -> Result<Vec<ThemePack>> {
        Ok(self
            .load_themes()
            .await?
            .into_iter()
            .filter(|t| t.has_any_tag(tags))
            .collect())
    }

    /// True when a custom pack file exists for `id`
    pub async fn is_custom(&self, id: &str) -> bool {
        validate_theme_id(id).is_ok() && exists(&self.paths.custom_theme_file(id)).await
    }

    /// Write a pack to the custom directory
    pub async fn save_theme(&self, pack: &ThemePack, overwrite: bool) -> Result<()> {
        pack.validate()?;
        if !overwrite && self.is_custom(&pack.id).await {
            return Err(ProfileError::ThemeAlreadyExists(pack.id.clone()));
        }

        let path = self.paths.custom_theme_file(&pack.id);
        write_json_atomic(&path, pack).await?;
        log::info!("Saved theme '{}' to {}", pack.id, path.display());
        self.cache().insert(pack.id.clone(), pack.clone());
        Ok(())
    }

    /// Delete a custom pack; built-in packs cannot be deleted
    pub async fn delete_theme(&self, id: &str) -> Result<()> {
        if !self.is_custom(id).await {
            return Err(if is_builtin(id) {
                ProfileError::BuiltInTheme(id.to_string())
            } else {
                ProfileError::ThemeNotFound(id.to_string())
            });
        }

        let path = self.paths.custom_theme_file(id);
        fs::remove_file(&path).await.map_err(ProfileError::io(&path))?;
        self.cache().remove(id);
        log::info!("Deleted theme '{}'", id);
        Ok(())
    }

    pub async fn export_theme(&self, id: &str, output: &Path) -> Result<()> {
        let pack = self.get_theme(id).await?;
        write_json_atomic(output, &pack).await
    }

    /// Read a pack file and store it as a custom pack
    pub async fn import_theme(&self, input: &Path, overwrite: bool) -> Result<ThemePack> {
        let value: serde_json::Value = read_json(input).await.map_err(|e| match e {
            ProfileError::Json(e) => ProfileError::InvalidThemePack(e.to_string()),
            other => other,
        })?;
        let pack: ThemePack = serde_json::from_value(value)
            .map_err(|e| ProfileError::InvalidThemePack(e.to_string()))?;
        self.save_theme(&pack, overwrite).await?;
        Ok(pack)
    }
}

/// What to apply from a pack; settings are always applied
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    pub backup: bool,
    pub layout: bool,
    pub keybindings: bool,
    pub install_extensions: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            backup: true,
            layout: true,
            keybindings: true,
            install_extensions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub theme: String,
    /// Backup Store entry holding the pre-apply configuration
    pub backup: Option<String>,
    pub installed: Vec<String>,
    pub already_installed: Vec<String>,
}

/// Applies theme packs to the live configuration
pub struct ThemeApplier<'a> {
    pub config: &'a ConfigStore,
    pub backups: &'a BackupStore,
    pub extensions: &'a dyn ExtensionManager,
}

impl ThemeApplier<'_> {
    pub async fn apply(&self, pack: &ThemePack, options: &ApplyOptions) -> Result<ApplyReport> {
        let backup = if options.backup {
            let record = self.backups.create_backup(self.config, Some(&pack.name)).await?;
            Some(record.name)
        } else {
            None
        };

        if pack.is_factory() {
            self.config.write_settings(&pack.settings).await?;
        } else {
            self.config.merge_settings(&pack.settings).await?;
        }

        if options.keybindings
            && let Some(keybindings) = &pack.keybindings
        {
            self.config.write_keybindings(keybindings).await?;
        }

        if options.layout
            && let Some(layout) = &pack.layout
        {
            let layout_settings = layout.to_settings();
            if !layout_settings.is_empty() {
                self.config.merge_settings(&layout_settings).await?;
            }
        }

        let mut installed = Vec::new();
        let mut already_installed = Vec::new();
        if options.install_extensions && !pack.extensions.is_empty() {
            let present: HashSet<String> =
                self.extensions.list_installed().await?.into_iter().collect();
            for id in &pack.extensions {
                if present.contains(id) {
                    already_installed.push(id.clone());
                    continue;
                }
                self.extensions.install(id).await?;
                log::info!("Installed extension {} for theme '{}'", id, pack.id);
                installed.push(id.clone());
            }
        }

        log::info!("Applied theme '{}'", pack.id);
        Ok(ApplyReport {
            theme: pack.id.clone(),
            backup,
            installed,
            already_installed,
        })
    }
}
