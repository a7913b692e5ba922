//! Profile switching logic.
//!
//! This module implements the core mechanism of `vibeprof`: moving the live
//! editor configuration from its current state to a stored profile.
//!
//! A switch runs in a fixed order:
//! 1. Load the target and compute a [`ProfileDiff`] against the live state.
//! 2. Stop there for a dry run, or ask the [`ConfirmSwitch`] gate.
//! 3. Snapshot the live state, both as a `before-<name>-<millis>` profile and
//!    as a labelled entry in the backup store.
//! 4. Uninstall removable extensions, then install missing ones, one at a
//!    time. The first failure stops the switch; nothing is rolled back.
//! 5. Replace settings, then keybindings.
//! 6. Record the active profile in the state file.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::backups::BackupStore;
use crate::config_store::{ConfigStore, KeyBinding, Settings, THEME_KEY, theme_of};
use crate::error::{ProfileError, Result};
use crate::extensions::{ExtensionManager, diff_extensions, filter_protected};
use crate::profiles::{
    ExtensionConfig, ExtensionMode, PROFILE_VERSION, Profile, ProfileMetadata, ProfileStore,
    validate_profile_name,
};
use crate::protected::ProtectedStore;
use crate::state::State;

const AUTO_BACKUP_PREFIX: &str = "before-";

/// Longest target-name fragment kept in an auto-backup name
const AUTO_BACKUP_NAME_BUDGET: usize = 75;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThemeDiff {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionChanges {
    pub to_install: Vec<String>,
    /// Removals that survive protection and the extension mode
    pub to_remove: Vec<String>,
    pub to_keep: Vec<String>,
    /// Would-be removals held back by the protected set
    pub protected: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SettingsChanges {
    pub changed: usize,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeybindingChanges {
    /// 1 when the keybinding list differs, else 0
    pub changed: usize,
}

/// What switching to a profile would change. Derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileDiff {
    pub theme: ThemeDiff,
    pub extensions: ExtensionChanges,
    pub settings: SettingsChanges,
    pub keybindings: KeybindingChanges,
}

impl ProfileDiff {
    pub fn is_noop(&self) -> bool {
        self.theme.from == self.theme.to
            && self.extensions.to_install.is_empty()
            && self.extensions.to_remove.is_empty()
            && self.settings == SettingsChanges::default()
            && self.keybindings.changed == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOptions {
    pub dry_run: bool,
    pub keep_theme: bool,
    pub keep_extensions: bool,
    pub skip_confirm: bool,
}

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub with_theme: bool,
    pub with_extensions: bool,
    pub description: Option<String>,
    pub overwrite: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            with_theme: false,
            with_extensions: true,
            description: None,
            overwrite: false,
        }
    }
}

/// Gate asked before a switch mutates anything
pub trait ConfirmSwitch {
    fn confirm(&self, profile: &str, diff: &ProfileDiff) -> Result<bool>;
}

impl<F> ConfirmSwitch for F
where
    F: Fn(&str, &ProfileDiff) -> Result<bool>,
{
    fn confirm(&self, profile: &str, diff: &ProfileDiff) -> Result<bool> {
        self(profile, diff)
    }
}

/// What a completed switch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub profile: String,
    /// Profile-store snapshot of the state before the switch
    pub auto_backup: String,
    /// Backup-store entry holding the previous settings and keybindings
    pub config_backup: String,
    pub removed: Vec<String>,
    pub installed: Vec<String>,
    pub extensions_skipped: bool,
    pub diff: ProfileDiff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    DryRun(ProfileDiff),
    /// The confirmation gate declined; nothing was touched
    Aborted(ProfileDiff),
    Done(SwitchReport),
}

/// Live editor state read once per operation
struct LiveState {
    settings: Settings,
    keybindings: Vec<KeyBinding>,
    extensions: Vec<String>,
}

/// Orchestrates saves, diffs and switches over the stores
pub struct SwitchEngine<'a> {
    pub profiles: &'a ProfileStore,
    pub config: &'a ConfigStore,
    pub backups: &'a BackupStore,
    pub protected: &'a ProtectedStore,
    pub extensions: &'a dyn ExtensionManager,
    pub state_file: &'a Path,
}

impl SwitchEngine<'_> {
    async fn capture(&self, with_extensions: bool) -> Result<LiveState> {
        let settings = self.config.read_settings().await?;
        let keybindings = self.config.read_keybindings().await?;
        let extensions = if with_extensions {
            self.extensions.list_installed().await?
        } else {
            Vec::new()
        };
        Ok(LiveState {
            settings,
            keybindings,
            extensions,
        })
    }

    /// Capture the live configuration as a named profile
    pub async fn save_profile(&self, name: &str, options: &SaveOptions) -> Result<Profile> {
        validate_profile_name(name)?;
        if !options.overwrite && self.profiles.exists(name).await {
            return Err(ProfileError::ProfileAlreadyExists(name.to_string()));
        }

        let live = self.capture(options.with_extensions).await?;
        let profile = self.build_profile(name, live, options).await?;
        self.profiles.save(&profile, options.overwrite).await?;
        Ok(profile)
    }

    async fn build_profile(
        &self,
        name: &str,
        live: LiveState,
        options: &SaveOptions,
    ) -> Result<Profile> {
        let now = Utc::now();
        let created_at = match self.profiles.load(name).await {
            Ok(existing) if options.overwrite => existing.metadata.created_at,
            _ => now,
        };
        let description = options.description.clone().filter(|d| !d.is_empty());
        let theme = if options.with_theme {
            theme_of(&live.settings)
        } else {
            None
        };

        Ok(Profile {
            name: name.to_string(),
            description: description.clone(),
            theme,
            extensions: ExtensionConfig {
                mode: ExtensionMode::Strict,
                list: live.extensions,
                protected: Some(self.protected.get().await?),
            },
            settings: live.settings,
            keybindings: live.keybindings,
            metadata: ProfileMetadata {
                description,
                created_at,
                updated_at: now,
                version: PROFILE_VERSION.to_string(),
            },
        })
    }

    /// Compare the live state with a stored profile. Read-only.
    pub async fn get_profile_diff(&self, name: &str) -> Result<ProfileDiff> {
        let target = self.profiles.load(name).await?;
        let live = self.capture(true).await?;
        self.compute_diff(&target, &live).await
    }

    async fn compute_diff(&self, target: &Profile, live: &LiveState) -> Result<ProfileDiff> {
        let mut protected = self.protected.get().await?;
        if let Some(own) = &target.extensions.protected {
            protected.extend(own.iter().cloned());
        }

        let ext = diff_extensions(&live.extensions, &target.extensions.list);
        let split = filter_protected(&ext.to_remove, &protected);

        let mut to_keep = ext.to_keep;
        let to_remove = match target.extensions.mode {
            ExtensionMode::Strict => split.can_remove,
            ExtensionMode::Additive => {
                let removable: HashSet<&String> = split.can_remove.iter().collect();
                to_keep = live
                    .extensions
                    .iter()
                    .filter(|id| to_keep.contains(id) || removable.contains(id))
                    .cloned()
                    .collect();
                Vec::new()
            }
        };

        Ok(ProfileDiff {
            theme: ThemeDiff {
                from: theme_of(&live.settings),
                to: target_theme(target),
            },
            extensions: ExtensionChanges {
                to_install: ext.to_install,
                to_remove,
                to_keep,
                protected: split.protected_list,
            },
            settings: settings_changes(&live.settings, &target.settings),
            keybindings: KeybindingChanges {
                changed: usize::from(live.keybindings != target.keybindings),
            },
        })
    }

    /// Switch the live configuration to the named profile
    pub async fn switch_profile(
        &self,
        name: &str,
        options: &SwitchOptions,
        confirm: &dyn ConfirmSwitch,
    ) -> Result<SwitchOutcome> {
        let target = self.profiles.load(name).await?;
        let live = self.capture(true).await?;
        let diff = self.compute_diff(&target, &live).await?;

        if options.dry_run {
            log::debug!("Dry run for '{}', nothing applied", name);
            return Ok(SwitchOutcome::DryRun(diff));
        }

        if !options.skip_confirm && !confirm.confirm(name, &diff)? {
            log::info!("Switch to '{}' declined", name);
            return Ok(SwitchOutcome::Aborted(diff));
        }

        let (auto_backup, config_backup) = self.snapshot_before(name, &live).await?;
        State::record_backup(self.state_file, &auto_backup)?;

        let mut removed = Vec::new();
        let mut installed = Vec::new();
        if !options.keep_extensions {
            for id in &diff.extensions.to_remove {
                self.extensions.uninstall(id).await.inspect_err(|e| {
                    log::warn!("Switch to '{}' stopped at removal: {}", name, e)
                })?;
                log::info!("Removed extension {}", id);
                removed.push(id.clone());
            }
            for id in &diff.extensions.to_install {
                self.extensions.install(id).await.inspect_err(|e| {
                    log::warn!("Switch to '{}' stopped at install: {}", name, e)
                })?;
                log::info!("Installed extension {}", id);
                installed.push(id.clone());
            }
        }

        let settings = settings_to_write(&target, &live.settings, options.keep_theme);
        self.config.write_settings(&settings).await?;
        self.config.write_keybindings(&target.keybindings).await?;

        State::record_switch(self.state_file, name, &auto_backup)?;
        log::info!("Switched to profile '{}'", name);

        Ok(SwitchOutcome::Done(SwitchReport {
            profile: name.to_string(),
            auto_backup,
            config_backup,
            removed,
            installed,
            extensions_skipped: options.keep_extensions,
            diff,
        }))
    }

    /// Store the pre-switch state; returns (profile name, backup name)
    async fn snapshot_before(&self, target: &str, live: &LiveState) -> Result<(String, String)> {
        let auto_name = auto_backup_name(target, Utc::now().timestamp_millis());
        let options = SaveOptions {
            with_theme: true,
            with_extensions: true,
            description: Some(format!("Auto-backup before switching to {}", target)),
            overwrite: true,
        };
        let snapshot = LiveState {
            settings: live.settings.clone(),
            keybindings: live.keybindings.clone(),
            extensions: live.extensions.clone(),
        };
        let profile = self.build_profile(&auto_name, snapshot, &options).await?;
        self.profiles.save(&profile, true).await?;

        let record = self
            .backups
            .write_backup(Some(target), &live.settings, &live.keybindings)
            .await?;
        log::info!("Backed up live state as '{}' and '{}'", auto_name, record.name);
        Ok((auto_name, record.name))
    }
}

/// Profile name of the pre-switch snapshot, kept within the name limit
pub fn auto_backup_name(target: &str, millis: i64) -> String {
    let fragment: String = target.chars().take(AUTO_BACKUP_NAME_BUDGET).collect();
    format!("{}{}-{}", AUTO_BACKUP_PREFIX, fragment, millis)
}

/// Theme a switch would leave in place: declared theme, else the settings' own
fn target_theme(target: &Profile) -> Option<String> {
    target.theme.clone().or_else(|| theme_of(&target.settings))
}

fn settings_changes(current: &Settings, target: &Settings) -> SettingsChanges {
    SettingsChanges {
        added: target.keys().filter(|k| !current.contains_key(*k)).count(),
        removed: current.keys().filter(|k| !target.contains_key(*k)).count(),
        changed: current
            .iter()
            .filter(|(k, v)| target.get(*k).is_some_and(|t| t != *v))
            .count(),
    }
}

/// Full-replace settings for the target
///
/// The target's settings are written verbatim. With `keep_theme` and a
/// declared theme, the target's theme key is dropped and the live theme
/// (if any) carried over.
fn settings_to_write(target: &Profile, live: &Settings, keep_theme: bool) -> Settings {
    let mut settings = target.settings.clone();
    if keep_theme && target.theme.is_some() {
        settings.remove(THEME_KEY);
        if let Some(live_theme) = live.get(THEME_KEY) {
            settings.insert(THEME_KEY.to_string(), live_theme.clone());
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use crate::test_utils::{ExtOp, FakeExtensions, sample_profile, setup_test_paths};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        paths: Paths,
        profiles: ProfileStore,
        config: ConfigStore,
        backups: BackupStore,
        protected: ProtectedStore,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let paths = setup_test_paths(&temp);
            Self {
                profiles: ProfileStore::new(&paths),
                config: ConfigStore::new(&paths),
                backups: BackupStore::new(&paths),
                protected: ProtectedStore::new(&paths),
                paths,
                _temp: temp,
            }
        }

        fn engine<'a>(&'a self, extensions: &'a FakeExtensions) -> SwitchEngine<'a> {
            SwitchEngine {
                profiles: &self.profiles,
                config: &self.config,
                backups: &self.backups,
                protected: &self.protected,
                extensions,
                state_file: &self.paths.state_file,
            }
        }

        async fn live_settings(&self, value: serde_json::Value) {
            let settings = value.as_object().unwrap().clone();
            self.config.write_settings(&settings).await.unwrap();
        }
    }

    fn yes() -> impl Fn(&str, &ProfileDiff) -> Result<bool> {
        |_, _| Ok(true)
    }

    fn proceed() -> SwitchOptions {
        SwitchOptions {
            skip_confirm: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_protected_scenario() {
        let fx = Fixture::new();
        fx.protected.add("a").await.unwrap();
        fx.profiles.save(&sample_profile("target", &["b", "c", "d"]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a", "b", "c"]);

        let diff = fx.engine(&exts).get_profile_diff("target").await.unwrap();
        assert_eq!(diff.extensions.to_install, vec!["d"]);
        assert!(diff.extensions.to_remove.is_empty());
        assert_eq!(diff.extensions.protected, vec!["a"]);
        assert_eq!(diff.extensions.to_keep, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_profile_protected_snapshot_is_honored() {
        let fx = Fixture::new();
        let mut target = sample_profile("target", &[]);
        target.extensions.protected = Some(vec!["x".to_string()]);
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["x", "y"]);

        let diff = fx.engine(&exts).get_profile_diff("target").await.unwrap();
        assert_eq!(diff.extensions.to_remove, vec!["y"]);
        assert_eq!(diff.extensions.protected, vec!["x"]);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let fx = Fixture::new();
        fx.live_settings(json!({"editor.fontSize": 12})).await;
        let mut target = sample_profile("target", &["new.ext"]);
        target.settings.insert("editor.fontSize".into(), json!(16));
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["old.ext"]);
        let engine = fx.engine(&exts);

        let options = SwitchOptions {
            dry_run: true,
            ..Default::default()
        };
        let outcome = engine.switch_profile("target", &options, &yes()).await.unwrap();
        let expected = engine.get_profile_diff("target").await.unwrap();
        assert_eq!(outcome, SwitchOutcome::DryRun(expected));

        assert!(exts.ops().is_empty());
        assert_eq!(fx.config.read_settings().await.unwrap()["editor.fontSize"], 12);
        assert!(fx.backups.list_backups().await.unwrap().is_empty());
        assert_eq!(fx.profiles.list().await.unwrap().len(), 1);
        assert!(!fx.paths.state_file.exists());
    }

    #[tokio::test]
    async fn test_declined_confirmation_aborts() {
        let fx = Fixture::new();
        fx.profiles.save(&sample_profile("target", &["d"]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a"]);

        let no = |_: &str, _: &ProfileDiff| -> Result<bool> { Ok(false) };
        let outcome = fx
            .engine(&exts)
            .switch_profile("target", &SwitchOptions::default(), &no)
            .await
            .unwrap();

        assert!(matches!(outcome, SwitchOutcome::Aborted(_)));
        assert!(exts.ops().is_empty());
        assert_eq!(fx.profiles.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_applies_everything_in_order() {
        let fx = Fixture::new();
        fx.live_settings(json!({"workbench.colorTheme": "Light", "old.key": true})).await;
        let mut target = sample_profile("work", &["b", "d"]);
        target.settings.insert("editor.tabSize".into(), json!(2));
        target.keybindings.push(KeyBinding {
            key: "ctrl+k".into(),
            command: "noop".into(),
            when: None,
            args: None,
        });
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a", "b", "c"]);

        let outcome = fx.engine(&exts).switch_profile("work", &proceed(), &yes()).await.unwrap();
        let SwitchOutcome::Done(report) = outcome else {
            panic!("switch did not complete");
        };

        assert_eq!(
            exts.ops(),
            vec![
                ExtOp::Uninstall("a".into()),
                ExtOp::Uninstall("c".into()),
                ExtOp::Install("d".into()),
            ]
        );
        assert_eq!(report.removed, vec!["a", "c"]);
        assert_eq!(report.installed, vec!["d"]);

        // Full replace: keys absent from the target are gone
        let settings = fx.config.read_settings().await.unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings["editor.tabSize"], 2);
        assert_eq!(fx.config.read_keybindings().await.unwrap(), target.keybindings);

        // Undo point holds the previous state
        let backup = fx.profiles.load(&report.auto_backup).await.unwrap();
        assert!(report.auto_backup.starts_with("before-work-"));
        assert_eq!(backup.extensions.list, vec!["a", "b", "c"]);
        assert_eq!(backup.theme.as_deref(), Some("Light"));
        assert_eq!(report.config_backup, "before-work");
        assert_eq!(fx.backups.list_backups().await.unwrap()[0].captured_theme, "Light");

        let state = State::read(&fx.paths.state_file).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("work"));
        assert_eq!(state.last_backup, Some(report.auto_backup));
    }

    #[tokio::test]
    async fn test_keep_theme_leaves_live_theme() {
        let fx = Fixture::new();
        fx.live_settings(json!({"workbench.colorTheme": "Mine"})).await;
        let mut target = sample_profile("themed", &[]);
        target.theme = Some("Theirs".into());
        target.settings.insert(THEME_KEY.into(), json!("Theirs"));
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::default();
        let engine = fx.engine(&exts);

        let options = SwitchOptions {
            keep_theme: true,
            ..proceed()
        };
        engine.switch_profile("themed", &options, &yes()).await.unwrap();
        assert_eq!(fx.config.current_theme().await.unwrap().as_deref(), Some("Mine"));

        engine.switch_profile("themed", &proceed(), &yes()).await.unwrap();
        assert_eq!(fx.config.current_theme().await.unwrap().as_deref(), Some("Theirs"));
    }

    #[tokio::test]
    async fn test_corrupt_protected_list_stops_switch_before_removal() {
        let fx = Fixture::new();
        fx.protected.add("keep.me").await.unwrap();
        std::fs::write(&fx.paths.protected_file, r#"{"extensions": ["keep.me",]"#).unwrap();
        fx.profiles.save(&sample_profile("empty", &[]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["keep.me"]);

        let err = fx
            .engine(&exts)
            .switch_profile("empty", &proceed(), &yes())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidProfileStructure(_)));
        assert!(exts.ops().is_empty());
        assert_eq!(exts.installed(), vec!["keep.me"]);
        assert!(State::read(&fx.paths.state_file).unwrap().last_backup.is_none());
    }

    #[tokio::test]
    async fn test_declared_theme_is_not_injected() {
        let fx = Fixture::new();
        fx.live_settings(json!({"workbench.colorTheme": "Mine"})).await;
        let mut target = sample_profile("bare", &[]);
        target.theme = Some("Declared".into());
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::default();

        fx.engine(&exts)
            .switch_profile("bare", &proceed(), &yes())
            .await
            .unwrap();
        assert!(fx.config.read_settings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keep_extensions_twice_touches_nothing() {
        let fx = Fixture::new();
        fx.profiles.save(&sample_profile("target", &["x", "y"]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a"]);
        let engine = fx.engine(&exts);
        let options = SwitchOptions {
            keep_extensions: true,
            ..proceed()
        };

        engine.switch_profile("target", &options, &yes()).await.unwrap();
        engine.switch_profile("target", &options, &yes()).await.unwrap();
        assert!(exts.ops().is_empty());
    }

    #[tokio::test]
    async fn test_matching_state_is_noop() {
        let fx = Fixture::new();
        fx.profiles.save(&sample_profile("target", &["a", "b"]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a", "b"]);

        let diff = fx.engine(&exts).get_profile_diff("target").await.unwrap();
        assert!(diff.is_noop());
        fx.engine(&exts).switch_profile("target", &proceed(), &yes()).await.unwrap();
        assert!(exts.ops().is_empty());
    }

    #[tokio::test]
    async fn test_additive_mode_never_removes() {
        let fx = Fixture::new();
        let mut target = sample_profile("target", &["b"]);
        target.extensions.mode = ExtensionMode::Additive;
        fx.profiles.save(&target, false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a", "b"]);

        let outcome = fx.engine(&exts).switch_profile("target", &proceed(), &yes()).await.unwrap();
        let SwitchOutcome::Done(report) = outcome else {
            panic!("switch did not complete");
        };
        assert!(report.removed.is_empty());
        assert_eq!(report.diff.extensions.to_keep, vec!["a", "b"]);
        assert!(exts.ops().is_empty());
    }

    #[tokio::test]
    async fn test_failed_extension_stops_switch() {
        let fx = Fixture::new();
        fx.live_settings(json!({"keep": "me"})).await;
        fx.profiles.save(&sample_profile("target", &["d", "e"]), false).await.unwrap();
        let exts = FakeExtensions::with_installed(&["a"]).failing_on("d");

        let err = fx
            .engine(&exts)
            .switch_profile("target", &proceed(), &yes())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::ExtensionOperationFailed { ref id, .. } if id == "d"));

        // The removal before the failure stays applied
        assert_eq!(exts.ops(), vec![ExtOp::Uninstall("a".into())]);
        assert_eq!(fx.config.read_settings().await.unwrap()["keep"], "me");

        let state = State::read(&fx.paths.state_file).unwrap();
        assert!(state.active_profile.is_none());
        assert!(state.last_backup.unwrap().starts_with("before-target-"));
    }

    #[tokio::test]
    async fn test_switch_to_missing_profile() {
        let fx = Fixture::new();
        let exts = FakeExtensions::default();
        let err = fx
            .engine(&exts)
            .switch_profile("ghost", &proceed(), &yes())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn test_save_profile_and_overwrite() {
        let fx = Fixture::new();
        fx.live_settings(json!({"workbench.colorTheme": "Dark"})).await;
        fx.protected.add("keep.me").await.unwrap();
        let exts = FakeExtensions::with_installed(&["a", "b"]);
        let engine = fx.engine(&exts);

        let plain = engine.save_profile("work", &SaveOptions::default()).await.unwrap();
        assert_eq!(plain.theme, None);
        assert_eq!(plain.extensions.list, vec!["a", "b"]);
        assert_eq!(plain.extensions.protected, Some(vec!["keep.me".to_string()]));

        let err = engine.save_profile("work", &SaveOptions::default()).await.unwrap_err();
        assert!(matches!(err, ProfileError::ProfileAlreadyExists(_)));

        let options = SaveOptions {
            with_theme: true,
            with_extensions: false,
            description: Some("Daily".into()),
            overwrite: true,
        };
        let resaved = engine.save_profile("work", &options).await.unwrap();
        assert_eq!(resaved.theme.as_deref(), Some("Dark"));
        assert!(resaved.extensions.list.is_empty());
        assert_eq!(resaved.metadata.created_at, plain.metadata.created_at);
        assert!(resaved.metadata.updated_at >= plain.metadata.updated_at);
    }

    #[test]
    fn test_auto_backup_name_stays_valid() {
        let long = "x".repeat(96);
        let name = auto_backup_name(&long, 1_700_000_000_000);
        assert!(validate_profile_name(&name).is_ok());
        assert_eq!(auto_backup_name("work", 42), "before-work-42");
    }

    #[test]
    fn test_settings_changes_counts() {
        let current = json!({"a": 1, "b": 2, "c": 3}).as_object().unwrap().clone();
        let target = json!({"b": 2, "c": 4, "d": 5}).as_object().unwrap().clone();
        assert_eq!(
            settings_changes(&current, &target),
            SettingsChanges {
                changed: 1,
                added: 1,
                removed: 1
            }
        );
    }
}
