//! Editor configuration access.
//!
//! Reads and writes the editor's `settings.json` and `keybindings.json`.
//! A missing file reads as empty; writes are full replaces unless
//! [`ConfigStore::merge_settings`] is used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs_utils::{exists, read_json, write_json_atomic};
use crate::paths::Paths;

/// Settings key holding the active color theme
pub const THEME_KEY: &str = "workbench.colorTheme";

/// Editor settings object
pub type Settings = Map<String, Value>;

/// A single keybinding entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// Reads and writes the live editor configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    settings_path: PathBuf,
    keybindings_path: PathBuf,
}

impl ConfigStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            settings_path: paths.editor_settings.clone(),
            keybindings_path: paths.editor_keybindings.clone(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub async fn read_settings(&self) -> Result<Settings> {
        if !exists(&self.settings_path).await {
            return Ok(Settings::new());
        }
        read_json(&self.settings_path).await
    }

    /// Replace the whole settings file
    pub async fn write_settings(&self, settings: &Settings) -> Result<()> {
        write_json_atomic(&self.settings_path, settings).await
    }

    /// Shallow merge: top-level keys of `overlay` overwrite the live ones
    pub async fn merge_settings(&self, overlay: &Settings) -> Result<()> {
        let mut current = self.read_settings().await?;
        for (key, value) in overlay {
            current.insert(key.clone(), value.clone());
        }
        self.write_settings(&current).await
    }

    pub async fn read_keybindings(&self) -> Result<Vec<KeyBinding>> {
        if !exists(&self.keybindings_path).await {
            return Ok(Vec::new());
        }
        read_json(&self.keybindings_path).await
    }

    /// Replace the whole keybindings file
    pub async fn write_keybindings(&self, keybindings: &[KeyBinding]) -> Result<()> {
        write_json_atomic(&self.keybindings_path, &keybindings).await
    }

    /// The theme currently set in the live settings, if any
    pub async fn current_theme(&self) -> Result<Option<String>> {
        Ok(theme_of(&self.read_settings().await?))
    }
}

/// Extract the theme from a settings object
pub fn theme_of(settings: &Settings) -> Option<String> {
    settings
        .get(THEME_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_paths;
    use serde_json::json;
    use tempfile::TempDir;

    fn settings(value: Value) -> Settings {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_missing_files_read_empty() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(&setup_test_paths(&temp));
        assert!(store.read_settings().await.unwrap().is_empty());
        assert!(store.read_keybindings().await.unwrap().is_empty());
        assert!(store.current_theme().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_settings_with_comments() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        std::fs::create_dir_all(&paths.editor_dir).unwrap();
        std::fs::write(
            &paths.editor_settings,
            "{\n  // theme\n  \"workbench.colorTheme\": \"Monokai\"\n}",
        )
        .unwrap();

        let store = ConfigStore::new(&paths);
        assert_eq!(store.current_theme().await.unwrap().as_deref(), Some("Monokai"));
    }

    #[tokio::test]
    async fn test_merge_is_shallow_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(&setup_test_paths(&temp));
        store
            .write_settings(&settings(json!({"a": 1, "nested": {"x": 1, "y": 2}})))
            .await
            .unwrap();

        store
            .merge_settings(&settings(json!({"nested": {"x": 5}, "b": true})))
            .await
            .unwrap();

        let merged = store.read_settings().await.unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 1, "nested": {"x": 5}, "b": true}));
    }

    #[tokio::test]
    async fn test_keybindings_replace() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(&setup_test_paths(&temp));
        let bindings = vec![KeyBinding {
            key: "ctrl+k".into(),
            command: "editor.action.format".into(),
            when: Some("editorTextFocus".into()),
            args: None,
        }];

        store.write_keybindings(&bindings).await.unwrap();
        assert_eq!(store.read_keybindings().await.unwrap(), bindings);

        store.write_keybindings(&[]).await.unwrap();
        assert!(store.read_keybindings().await.unwrap().is_empty());
    }
}
