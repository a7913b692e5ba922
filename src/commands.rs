//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command
//! (`profile save`, `profile switch`, `backup list`, etc.). It serves as the
//! coordination layer between:
//! - `crate::ui` for user interaction (output, prompts).
//! - `crate::app::App` for the stores and the switch engine.
//! - `crate::sharing` for remote sharing.
//! - `crate::state` for persistent state.
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anstyle::AnsiColor;
use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};

use crate::app::App;
use crate::backups::DEFAULT_THEME_NAME;
use crate::credentials::{CredentialChain, TerminalPrompt};
use crate::doctor::run_doctor;
use crate::error::ProfileError;
use crate::share_code;
use crate::state::{LockedState, State};
use crate::switch::{ProfileDiff, SaveOptions, SwitchOptions, SwitchOutcome, SwitchReport};
use crate::themes::{ApplyOptions, THEME_PACK_SUFFIX, ThemePack, is_builtin};
use crate::ui::Ui;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Attach a next-step hint to the errors users can act on
fn with_hint(err: ProfileError) -> anyhow::Error {
    let hint = match &err {
        ProfileError::ProfileNotFound(_) => {
            "Use 'vibeprof profile list' to see available profiles."
        }
        ProfileError::ProfileAlreadyExists(_) => {
            "Use 'vibeprof profile show <name>' to inspect the existing profile first."
        }
        ProfileError::BackupNotFound(_) => "Use 'vibeprof backup list' to see available backups.",
        ProfileError::InvalidShareCode(_) | ProfileError::ShareCodeNotFound(_) => {
            "Share codes look like VIBE-1a2b3c. Ask the sender to run 'vibeprof profile share' again."
        }
        ProfileError::ThemeNotFound(_) => "Use 'vibeprof theme list' to see available themes.",
        ProfileError::ThemeAlreadyExists(_) => {
            "Pick another name, or use 'vibeprof theme delete <id>' to remove the old one first."
        }
        ProfileError::ExtensionListFailed(_) => {
            "Set VIBEPROF_EDITOR_CLI if the editor binary is not called `code`."
        }
        _ => return anyhow::Error::new(err),
    };
    anyhow!("{}\nHint: {}", err, hint)
}

// -----------------------------------------------------------------------------
// Profiles
// -----------------------------------------------------------------------------

/// Save the live editor setup as a profile
pub async fn save(app: &App, name: &str, options: &SaveOptions, ui: &Ui) -> Result<()> {
    app.paths.ensure_dirs()?;

    let spinner = ui.spinner(format!("Saving profile '{}'...", name));
    let profile = match app.switch_engine().save_profile(name, options).await {
        Ok(profile) => {
            ui.spinner_finish_ok(&spinner, format!("Saved profile '{}'", name));
            profile
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, "Failed to save profile");
            return Err(with_hint(e));
        }
    };

    ui.println(format!(
        "  {} {} extensions, {} settings, {} keybindings",
        ui.icon_ok(),
        profile.extensions.list.len(),
        profile.settings.len(),
        profile.keybindings.len()
    ));
    if let Some(theme) = &profile.theme {
        ui.println(format!("  {} Theme: {}", ui.icon_ok(), theme));
    }
    Ok(())
}

/// Switch the live setup to a profile
pub async fn switch(app: &App, name: &str, options: &SwitchOptions, ui: &Ui) -> Result<()> {
    if !options.dry_run && !options.skip_confirm && !ui.interactive {
        bail!(
            "Refusing to switch without confirmation in a non-interactive session.\nHint: Pass --yes to skip the prompt, or --dry-run to preview."
        );
    }

    let confirm = |profile: &str, diff: &ProfileDiff| -> crate::error::Result<bool> {
        ui.section(format!("Switching to '{}'", profile));
        ui.newline();
        ui.print_diff(diff);
        ui.newline();
        Ok(ui
            .confirm(
                "Apply these changes?",
                "Your current setup is backed up first",
                false,
            )
            .unwrap_or_else(|e| {
                log::debug!("Confirmation prompt failed: {:#}", e);
                false
            }))
    };

    match app.switch_engine().switch_profile(name, options, &confirm).await {
        Ok(SwitchOutcome::DryRun(diff)) => {
            ui.section(format!("Dry run: switching to '{}'", name));
            ui.newline();
            ui.print_diff(&diff);
            ui.newline();
            ui.info("Dry run: nothing was changed.");
        }
        Ok(SwitchOutcome::Aborted(_)) => ui.warn("Switch cancelled."),
        Ok(SwitchOutcome::Done(report)) => print_report(&report, ui),
        Err(e @ ProfileError::ExtensionOperationFailed { .. }) => {
            let undo = State::read(&app.paths.state_file)
                .ok()
                .and_then(|s| s.last_backup);
            match undo {
                Some(backup) => bail!(
                    "{}\nHint: Changes made before the failure were kept. Run 'vibeprof profile switch {}' to go back.",
                    e,
                    backup
                ),
                None => bail!("{}", e),
            }
        }
        Err(e) => return Err(with_hint(e)),
    }
    Ok(())
}

fn print_report(report: &SwitchReport, ui: &Ui) {
    ui.ok(format!("Switched to profile '{}'", report.profile));
    if report.extensions_skipped {
        ui.info("Extensions left untouched (--keep-extensions).");
    } else {
        ui.extension_list("Removed", "-", &report.removed, AnsiColor::Red);
        ui.extension_list("Installed", "+", &report.installed, AnsiColor::Green);
        ui.extension_list(
            "Protected (kept)",
            "=",
            &report.diff.extensions.protected,
            AnsiColor::Yellow,
        );
    }
    ui.newline();
    ui.println(ui.dim(format!("Settings backup: {}", report.config_backup)));
    ui.println(ui.dim(format!(
        "Undo with: vibeprof profile switch {}",
        report.auto_backup
    )));
}

/// List all stored profiles
pub async fn list(app: &App, ui: &Ui) -> Result<()> {
    let profiles = app.profiles.list().await.context("Failed to list profiles")?;

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one from your current setup with:");
        ui.println(format!("  {} profile save <name>", ui.bold("vibeprof")));
        return Ok(());
    }

    let state = State::read(&app.paths.state_file).unwrap_or_default();
    let active = state.active_profile.as_deref();

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Description"),
        ui.header_cell("Extensions"),
        ui.header_cell("Theme"),
        ui.header_cell("Updated"),
    ]);

    for summary in &profiles {
        let is_active = active == Some(summary.name.as_str());
        let name_cell = if is_active {
            ui.colored_cell(&summary.name, AnsiColor::Green)
        } else {
            ui.cell(&summary.name)
        };
        table.add_row(vec![
            ui.cell(if is_active { ui.icon_ok() } else { "" }),
            name_cell,
            ui.cell(summary.description.clone().unwrap_or_default()),
            ui.cell(summary.extension_count.to_string()),
            ui.cell(summary.theme.clone().unwrap_or_else(|| "-".to_string())),
            ui.cell(summary.updated_at.format(DATE_FORMAT).to_string()),
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Show detailed information about a profile
pub async fn show(app: &App, name: &str, ui: &Ui) -> Result<()> {
    let profile = app.profiles.load(name).await.map_err(with_hint)?;

    ui.section(format!("Profile: {}", profile.name));
    ui.newline();

    let mut table = ui.simple_table();
    if let Some(description) = profile.display_description() {
        table.add_row(vec![ui.cell("Description:"), ui.cell(description)]);
    }
    table.add_row(vec![
        ui.cell("Theme:"),
        ui.cell(profile.theme.clone().unwrap_or_else(|| "(not captured)".into())),
    ]);
    table.add_row(vec![
        ui.cell("Extension mode:"),
        ui.cell(format!("{:?}", profile.extensions.mode).to_lowercase()),
    ]);
    table.add_row(vec![
        ui.cell("Settings:"),
        ui.cell(format!("{} keys", profile.settings.len())),
    ]);
    table.add_row(vec![
        ui.cell("Keybindings:"),
        ui.cell(profile.keybindings.len().to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Created:"),
        ui.cell(profile.metadata.created_at.format(DATE_FORMAT).to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Updated:"),
        ui.cell(profile.metadata.updated_at.format(DATE_FORMAT).to_string()),
    ]);
    table.add_row(vec![ui.cell("Version:"), ui.cell(&profile.metadata.version)]);
    ui.println(table.to_string());

    ui.extension_list("Extensions", "•", &profile.extensions.list, AnsiColor::Cyan);
    if let Some(protected) = &profile.extensions.protected {
        ui.extension_list("Protected", "=", protected, AnsiColor::Yellow);
    }
    Ok(())
}

/// Delete a profile
pub async fn delete(app: &App, name: &str, force: bool, ui: &Ui) -> Result<()> {
    if !app.profiles.exists(name).await {
        return Err(with_hint(ProfileError::ProfileNotFound(name.to_string())));
    }

    let confirmed = ui.confirm(
        &format!("Are you sure you want to delete profile '{}'?", name),
        "This permanently deletes the stored profile",
        force,
    )?;
    if !confirmed {
        ui.warn("Deletion cancelled.");
        return Ok(());
    }

    app.profiles.delete(name).await?;
    State::clear_if_active(&app.paths.state_file, name)?;
    ui.ok(format!("Deleted profile '{}'", name));
    Ok(())
}

pub async fn rename(app: &App, old_name: &str, new_name: &str, ui: &Ui) -> Result<()> {
    app.profiles
        .rename(old_name, new_name)
        .await
        .map_err(with_hint)?;

    let state = State::read(&app.paths.state_file).unwrap_or_default();
    if state.active_profile.as_deref() == Some(old_name) {
        let mut locked = LockedState::lock(&app.paths.state_file)?;
        locked.update(|s| s.active_profile = Some(new_name.to_string()))?;
    }

    ui.ok(format!("Renamed profile '{}' to '{}'", old_name, new_name));
    Ok(())
}

/// Preview what switching to a profile would change
pub async fn diff(app: &App, name: &str, ui: &Ui) -> Result<()> {
    let diff = app
        .switch_engine()
        .get_profile_diff(name)
        .await
        .map_err(with_hint)?;

    ui.section(format!("Changes when switching to '{}'", name));
    ui.newline();
    if diff.is_noop() {
        ui.ok("Your current setup already matches this profile.");
        return Ok(());
    }
    ui.print_diff(&diff);
    Ok(())
}

pub async fn export(app: &App, name: &str, output: Option<&Path>, ui: &Ui) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.vibe-profile.json", name)));

    app.profiles
        .export_to_file(name, &output)
        .await
        .map_err(with_hint)?;
    ui.ok(format!("Exported profile '{}' to {}", name, output.display()));
    ui.println(ui.dim(format!(
        "Import elsewhere with: vibeprof profile import-file {}",
        output.display()
    )));
    Ok(())
}

pub async fn import_file(
    app: &App,
    input: &Path,
    name: Option<&str>,
    overwrite: bool,
    ui: &Ui,
) -> Result<()> {
    app.paths.ensure_dirs()?;
    let profile = app
        .profiles
        .import_from_file(input, name, overwrite)
        .await
        .map_err(with_hint)?;
    ui.ok(format!(
        "Imported profile '{}' ({} extensions)",
        profile.name,
        profile.extensions.list.len()
    ));
    Ok(())
}

// -----------------------------------------------------------------------------
// Sharing
// -----------------------------------------------------------------------------

/// Accept either a share code or a gist URL
fn normalize_share_code(input: &str) -> Result<String> {
    let code = if input.contains("gist.github.com/") {
        share_code::from_gist_url(input)
    } else {
        share_code::decode(input).map(|_| input.trim().to_string())
    };
    code.map_err(with_hint)
}

pub async fn share(app: &App, name: &str, ui: &Ui) -> Result<()> {
    let credentials = CredentialChain::new(&app.paths, Box::new(TerminalPrompt::new(ui)));
    let service = app.sharing(&credentials);

    ui.info(format!("Sharing profile '{}'...", name));
    let code = service.share(name).await.map_err(with_hint)?;

    ui.ok("Profile shared!");
    ui.newline();
    ui.println(format!("  Share code: {}", ui.bold(&code)));
    ui.newline();
    ui.println(ui.dim(format!("Import on another machine with: vibeprof profile import {}", code)));
    Ok(())
}

/// Import a shared profile, confirming before replacing a local one
pub async fn import(
    app: &App,
    code: &str,
    name: Option<&str>,
    force: bool,
    ui: &Ui,
) -> Result<()> {
    let code = normalize_share_code(code)?;
    app.paths.ensure_dirs()?;
    let credentials = CredentialChain::new(&app.paths, Box::new(TerminalPrompt::new(ui)));
    let service = app.sharing(&credentials);

    let spinner = ui.spinner(format!("Fetching {}...", code));
    let info = match service.get_profile_info(&code).await {
        Ok(info) => {
            ui.spinner_finish_ok(&spinner, format!("Found profile '{}'", info.name));
            info
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, "Failed to fetch shared profile");
            return Err(with_hint(e));
        }
    };

    let target = name.unwrap_or(&info.name);
    if app.profiles.exists(target).await {
        let confirmed = ui.confirm(
            &format!("Profile '{}' already exists. Overwrite it?", target),
            "The local profile will be replaced",
            force,
        )?;
        if !confirmed {
            ui.warn("Import cancelled.");
            return Ok(());
        }
    }

    let profile = service
        .import_profile(&code, name)
        .await
        .map_err(with_hint)?;
    ui.ok(format!(
        "Imported profile '{}' ({} extensions)",
        profile.name,
        profile.extensions.list.len()
    ));
    ui.println(ui.dim(format!("Switch to it with: vibeprof profile switch {}", profile.name)));
    Ok(())
}

/// Preview a shared profile without importing it
pub async fn info(app: &App, code: &str, ui: &Ui) -> Result<()> {
    let code = normalize_share_code(code)?;
    let credentials = CredentialChain::new(&app.paths, Box::new(TerminalPrompt::new(ui)));
    let service = app.sharing(&credentials);

    let spinner = ui.spinner(format!("Fetching {}...", code));
    let info = match service.get_profile_info(&code).await {
        Ok(info) => {
            spinner.finish_and_clear();
            info
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, "Failed to fetch shared profile");
            return Err(with_hint(e));
        }
    };

    ui.section(format!("Shared profile: {}", info.name));
    ui.newline();
    let mut table = ui.simple_table();
    table.add_row(vec![ui.cell("Description:"), ui.cell(&info.description)]);
    table.add_row(vec![
        ui.cell("Extensions:"),
        ui.cell(info.extension_count.to_string()),
    ]);
    table.add_row(vec![
        ui.cell("Theme:"),
        ui.cell(info.theme.clone().unwrap_or_else(|| "(not captured)".into())),
    ]);
    table.add_row(vec![
        ui.cell("Created:"),
        ui.cell(info.created_at.format(DATE_FORMAT).to_string()),
    ]);
    ui.println(table.to_string());
    ui.newline();
    ui.println(ui.dim(format!("Import with: vibeprof profile import {}", code)));
    Ok(())
}

// -----------------------------------------------------------------------------
// Protected extensions
// -----------------------------------------------------------------------------

pub async fn protected_list(app: &App, ui: &Ui) -> Result<()> {
    let protected = app.protected.get().await.map_err(with_hint)?;
    if protected.is_empty() {
        ui.info("No protected extensions.");
        ui.println(ui.dim("Protect one with: vibeprof profile protected add <extension-id>"));
        return Ok(());
    }
    ui.extension_list("Protected extensions", "=", &protected, AnsiColor::Yellow);
    Ok(())
}

pub async fn protected_add(app: &App, id: &str, ui: &Ui) -> Result<()> {
    if app.protected.add(id).await? {
        ui.ok(format!("'{}' will never be removed by a switch", id));
    } else {
        ui.info(format!("'{}' is already protected", id));
    }
    Ok(())
}

pub async fn protected_remove(app: &App, id: &str, ui: &Ui) -> Result<()> {
    if app.protected.remove(id).await? {
        ui.ok(format!("'{}' is no longer protected", id));
    } else {
        ui.info(format!("'{}' was not protected", id));
    }
    Ok(())
}

pub async fn protected_set(app: &App, ids: Vec<String>, ui: &Ui) -> Result<()> {
    app.protected.set(ids).await?;
    let count = app.protected.get().await?.len();
    ui.ok(format!("Protected list replaced ({} extension(s))", count));
    Ok(())
}

// -----------------------------------------------------------------------------
// Backups
// -----------------------------------------------------------------------------

pub async fn backup_create(app: &App, label: Option<&str>, ui: &Ui) -> Result<()> {
    app.paths.ensure_dirs()?;
    let record = app
        .backups
        .create_backup(&app.config, label)
        .await
        .context("Failed to back up current settings")?;
    ui.ok(format!("Created backup '{}'", record.name));
    ui.println(ui.dim(format!("Theme: {}", record.captured_theme)));
    Ok(())
}

/// List all backups
pub async fn backup_list(app: &App, ui: &Ui) -> Result<()> {
    let backups = app.backups.list_backups().await.context("Failed to list backups")?;
    if backups.is_empty() {
        ui.warn("No backups found.");
        ui.newline();
        ui.println("Backups are created automatically when switching profiles.");
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Name"),
        ui.header_cell("Label"),
        ui.header_cell("Theme"),
        ui.header_cell("Date"),
    ]);
    for backup in &backups {
        table.add_row(vec![
            ui.cell(&backup.name),
            ui.cell(&backup.theme_label),
            ui.cell(&backup.captured_theme),
            ui.cell(&backup.human_date),
        ]);
    }

    ui.section("Backups");
    ui.println(table.to_string());
    ui.newline();
    ui.info(format!("{} backup(s) found", backups.len()));
    Ok(())
}

/// Restore a backup over the live settings and keybindings
pub async fn backup_restore(app: &App, name: &str, yes: bool, ui: &Ui) -> Result<()> {
    let record = app.backups.find_backup(name).await.map_err(with_hint)?;

    let confirmed = ui.confirm(
        &format!("Restore '{}' over your current settings?", record.name),
        "Current settings and keybindings are backed up first",
        yes,
    )?;
    if !confirmed {
        ui.warn("Restore cancelled.");
        return Ok(());
    }

    let safety = app.backups.create_backup(&app.config, Some("restore")).await?;
    app.backups.restore_backup(&app.config, &record.name).await?;
    ui.ok(format!("Restored backup '{}'", record.name));
    ui.println(ui.dim(format!("Previous settings saved as '{}'", safety.name)));
    Ok(())
}

/// Remove backups left in the legacy `backup-*` layout
pub async fn backup_clean(app: &App, ui: &Ui) -> Result<()> {
    let removed = app.backups.cleanup_legacy_backups().await?;
    if removed > 0 {
        ui.ok(format!("Removed {} legacy backup(s)", removed));
    } else {
        ui.ok("No legacy backups to clean");
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Theme packs
// -----------------------------------------------------------------------------

fn print_theme_table(themes: &[ThemePack], ui: &Ui) {
    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Id"),
        ui.header_cell("Name"),
        ui.header_cell("Description"),
        ui.header_cell("Tags"),
        ui.header_cell("Source"),
    ]);
    for theme in themes {
        table.add_row(vec![
            ui.cell(&theme.id),
            ui.cell(&theme.name),
            ui.cell(&theme.description),
            ui.cell(theme.tags.join(", ")),
            ui.cell(if is_builtin(&theme.id) { "built-in" } else { "custom" }),
        ]);
    }
    ui.println(table.to_string());
}

/// List theme packs, optionally only those carrying one of `tags`
pub async fn theme_list(app: &App, tags: &[String], ui: &Ui) -> Result<()> {
    let themes = if tags.is_empty() {
        app.themes.load_themes().await
    } else {
        app.themes.filter_by_tags(tags).await
    }
    .context("Failed to load theme packs")?;

    if themes.is_empty() {
        ui.warn("No theme packs match.");
        return Ok(());
    }
    ui.section("Theme Packs");
    print_theme_table(&themes, ui);
    ui.newline();
    ui.println(ui.dim("Apply one with: vibeprof theme apply <id>"));
    Ok(())
}

pub async fn theme_search(app: &App, query: &str, ui: &Ui) -> Result<()> {
    let themes = app.themes.search_themes(query).await?;
    if themes.is_empty() {
        ui.warn(format!("No theme packs match '{}'.", query));
        return Ok(());
    }
    ui.section(format!("Theme packs matching '{}'", query));
    print_theme_table(&themes, ui);
    Ok(())
}

/// Apply a theme pack over the live configuration
pub async fn theme_apply(app: &App, id: &str, options: &ApplyOptions, ui: &Ui) -> Result<()> {
    app.paths.ensure_dirs()?;
    let pack = app.themes.get_theme(id).await.map_err(with_hint)?;

    let spinner = ui.spinner(format!("Applying theme '{}'...", pack.name));
    let report = match app.theme_applier().apply(&pack, options).await {
        Ok(report) => {
            ui.spinner_finish_ok(&spinner, format!("Applied theme '{}'", pack.name));
            report
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, "Failed to apply theme");
            return Err(with_hint(e));
        }
    };

    if pack.is_factory() {
        ui.info("Settings were reset to the pack's defaults.");
    }
    ui.extension_list("Installed", "+", &report.installed, AnsiColor::Green);
    if let Some(backup) = &report.backup {
        ui.println(ui.dim(format!(
            "Previous settings saved as '{}'. Undo with: vibeprof backup restore {}",
            backup, backup
        )));
    }
    Ok(())
}

/// Capture the live settings as a custom theme pack
pub async fn theme_create(
    app: &App,
    name: &str,
    description: Option<String>,
    tags: Vec<String>,
    extensions: Vec<String>,
    overwrite: bool,
    ui: &Ui,
) -> Result<()> {
    let settings = app
        .config
        .read_settings()
        .await
        .context("Failed to read current settings")?;

    let mut pack = ThemePack::from_settings(name, settings);
    if let Some(description) = description {
        pack.description = description;
    }
    if !tags.is_empty() {
        pack.tags = tags;
    }
    pack.extensions = extensions;

    app.themes
        .save_theme(&pack, overwrite)
        .await
        .map_err(with_hint)?;
    ui.ok(format!("Created theme '{}' ({})", pack.name, pack.id));
    ui.println(ui.dim(format!("Apply it with: vibeprof theme apply {}", pack.id)));
    Ok(())
}

pub async fn theme_delete(app: &App, id: &str, force: bool, ui: &Ui) -> Result<()> {
    if !app.themes.is_custom(id).await {
        let err = if is_builtin(id) {
            ProfileError::BuiltInTheme(id.to_string())
        } else {
            ProfileError::ThemeNotFound(id.to_string())
        };
        return Err(with_hint(err));
    }

    let confirmed = ui.confirm(
        &format!("Delete theme '{}'?", id),
        "The custom theme pack file is removed",
        force,
    )?;
    if !confirmed {
        ui.warn("Deletion cancelled.");
        return Ok(());
    }

    app.themes.delete_theme(id).await?;
    ui.ok(format!("Deleted theme '{}'", id));
    Ok(())
}

pub async fn theme_export(app: &App, id: &str, output: Option<&Path>, ui: &Ui) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}{}", id, THEME_PACK_SUFFIX)));

    app.themes
        .export_theme(id, &output)
        .await
        .map_err(with_hint)?;
    ui.ok(format!("Exported theme '{}' to {}", id, output.display()));
    Ok(())
}

pub async fn theme_import(app: &App, input: &Path, overwrite: bool, ui: &Ui) -> Result<()> {
    let pack = app
        .themes
        .import_theme(input, overwrite)
        .await
        .map_err(with_hint)?;
    ui.ok(format!("Imported theme '{}' ({})", pack.name, pack.id));
    Ok(())
}

// -----------------------------------------------------------------------------
// Status
// -----------------------------------------------------------------------------

/// Show the active profile and live theme
pub async fn current(app: &App, ui: &Ui) -> Result<()> {
    let state = State::read(&app.paths.state_file).unwrap_or_default();

    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();
    match &state.active_profile {
        Some(profile) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(profile)]);
            if let Some(updated) = &state.updated_at {
                table.add_row(vec![
                    ui.cell("Last switched:"),
                    ui.cell(updated.format(DATE_FORMAT).to_string()),
                ]);
            }
        }
        None => {
            table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        }
    }
    if let Some(backup) = &state.last_backup {
        table.add_row(vec![ui.cell("Undo point:"), ui.cell(backup)]);
    }

    let theme_cell = match app.config.current_theme().await {
        Ok(Some(theme)) => ui.cell(theme),
        Ok(None) => ui.cell(format!("{} (default)", DEFAULT_THEME_NAME)),
        Err(e) => ui.colored_cell(format!("unreadable settings: {}", e), AnsiColor::Red),
    };
    table.add_row(vec![ui.cell("Live theme:"), theme_cell]);

    ui.println(table.to_string());
    Ok(())
}

pub async fn doctor(app: &App, ui: &Ui) -> Result<()> {
    let failed = run_doctor(app, ui).await;
    if failed == 0 {
        ui.ok("All checks passed");
    } else {
        ui.warn(format!("{} check(s) reported issues", failed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeExtensions, sample_profile, setup_test_paths};
    use crate::ui::ColorMode;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_ui() -> Ui {
        let mut ui = Ui::new(ColorMode::Never, false);
        ui.interactive = false;
        ui
    }

    fn test_app(temp: &TempDir, installed: &[&str]) -> App {
        let paths = setup_test_paths(temp);
        paths.ensure_dirs().unwrap();
        App::with_extensions(paths, Box::new(FakeExtensions::with_installed(installed)))
    }

    fn yes() -> SwitchOptions {
        SwitchOptions {
            skip_confirm: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_empty() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        assert!(list(&app, &test_ui()).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_list_and_show() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &["a.b"]);
        let ui = test_ui();

        save(&app, "work", &SaveOptions::default(), &ui).await.unwrap();
        list(&app, &ui).await.unwrap();
        show(&app, "work", &ui).await.unwrap();
        assert!(app.profiles.exists("work").await);
    }

    #[tokio::test]
    async fn test_save_duplicate_has_hint() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();

        save(&app, "work", &SaveOptions::default(), &ui).await.unwrap();
        let err = save(&app, "work", &SaveOptions::default(), &ui).await.unwrap_err();
        assert!(err.to_string().contains("Hint:"));
    }

    #[tokio::test]
    async fn test_switch_nonexistent() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let err = switch(&app, "ghost", &yes(), &test_ui()).await.unwrap_err();
        assert!(err.to_string().contains("vibeprof profile list"));
    }

    #[tokio::test]
    async fn test_switch_requires_yes_when_not_interactive() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        app.profiles.save(&sample_profile("work", &[]), false).await.unwrap();

        let err = switch(&app, "work", &SwitchOptions::default(), &test_ui())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));

        let dry_run = SwitchOptions {
            dry_run: true,
            ..Default::default()
        };
        switch(&app, "work", &dry_run, &test_ui()).await.unwrap();
        assert!(State::read(&app.paths.state_file).unwrap().active_profile.is_none());
    }

    #[tokio::test]
    async fn test_switch_then_current() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &["old.ext"]);
        let ui = test_ui();
        app.profiles.save(&sample_profile("work", &["new.ext"]), false).await.unwrap();

        switch(&app, "work", &yes(), &ui).await.unwrap();
        current(&app, &ui).await.unwrap();

        let state = State::read(&app.paths.state_file).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("work"));
    }

    #[tokio::test]
    async fn test_failed_switch_points_at_undo() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        paths.ensure_dirs().unwrap();
        let exts = FakeExtensions::with_installed(&[]).failing_on("bad.ext");
        let app = App::with_extensions(paths, Box::new(exts));
        app.profiles.save(&sample_profile("work", &["bad.ext"]), false).await.unwrap();

        let err = switch(&app, "work", &yes(), &test_ui()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.ext"));
        assert!(message.contains("vibeprof profile switch before-work-"));
    }

    #[tokio::test]
    async fn test_delete_clears_active_state() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();
        app.profiles.save(&sample_profile("work", &[]), false).await.unwrap();
        State::record_switch(&app.paths.state_file, "work", "before-work-1").unwrap();

        delete(&app, "work", true, &ui).await.unwrap();
        assert!(!app.profiles.exists("work").await);
        assert!(State::read(&app.paths.state_file).unwrap().active_profile.is_none());
        assert!(delete(&app, "work", true, &ui).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_follows_active_profile() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        app.profiles.save(&sample_profile("work", &[]), false).await.unwrap();
        State::record_switch(&app.paths.state_file, "work", "before-work-1").unwrap();

        rename(&app, "work", "job", &test_ui()).await.unwrap();
        let state = State::read(&app.paths.state_file).unwrap();
        assert_eq!(state.active_profile.as_deref(), Some("job"));
    }

    #[tokio::test]
    async fn test_protected_commands() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();

        protected_add(&app, "a.b", &ui).await.unwrap();
        protected_add(&app, "a.b", &ui).await.unwrap();
        protected_set(&app, vec!["c.d".into(), "c.d".into(), "e.f".into()], &ui)
            .await
            .unwrap();
        protected_remove(&app, "e.f", &ui).await.unwrap();
        protected_list(&app, &ui).await.unwrap();
        assert_eq!(app.protected.get().await.unwrap(), vec!["c.d".to_string()]);
    }

    #[tokio::test]
    async fn test_backup_create_restore_and_clean() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();
        let original = json!({"editor.fontSize": 14}).as_object().unwrap().clone();
        app.config.write_settings(&original).await.unwrap();

        backup_create(&app, Some("Before Experiment"), &ui).await.unwrap();
        let changed = json!({"editor.fontSize": 20}).as_object().unwrap().clone();
        app.config.write_settings(&changed).await.unwrap();

        backup_list(&app, &ui).await.unwrap();
        backup_restore(&app, "experiment", true, &ui).await.unwrap();
        assert_eq!(app.config.read_settings().await.unwrap(), original);

        std::fs::create_dir_all(app.paths.backup_dir("backup-old")).unwrap();
        backup_clean(&app, &ui).await.unwrap();
        assert!(!app.paths.backup_dir("backup-old").exists());
    }

    #[tokio::test]
    async fn test_export_then_import_file() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();
        app.profiles.save(&sample_profile("work", &["a.b"]), false).await.unwrap();

        let file = temp.path().join("work.json");
        export(&app, "work", Some(&file), &ui).await.unwrap();
        import_file(&app, &file, Some("copy"), false, &ui).await.unwrap();
        assert!(app.profiles.exists("copy").await);
    }

    #[tokio::test]
    async fn test_import_accepts_gist_url() {
        let server = MockServer::start().await;
        let shared = sample_profile("team", &["x.y"]);
        Mock::given(method("GET"))
            .and(path("/gists/c0ffee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c0ffee",
                "files": {
                    "vibecode-profile.json": {"content": shared.to_json().unwrap()}
                }
            })))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let mut paths = setup_test_paths(&temp);
        paths.gist_api = format!("{}/gists", server.uri());
        let app = App::with_extensions(paths, Box::new(FakeExtensions::default()));
        let ui = test_ui();

        info(&app, "VIBE-c0ffee", &ui).await.unwrap();
        import(&app, "https://gist.github.com/someone/c0ffee", None, true, &ui)
            .await
            .unwrap();
        let imported = app.profiles.load("team").await.unwrap();
        assert!(imported
            .metadata
            .description
            .unwrap()
            .ends_with("(Imported via VIBE-c0ffee)"));
    }

    #[tokio::test]
    async fn test_theme_create_apply_and_delete() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();
        let mine = json!({"workbench.colorTheme": "Nord", "editor.fontSize": 13});
        app.config
            .write_settings(mine.as_object().unwrap())
            .await
            .unwrap();

        theme_create(&app, "My Nord", None, vec![], vec![], false, &ui)
            .await
            .unwrap();
        let err = theme_create(&app, "My Nord", None, vec![], vec![], false, &ui)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Hint:"));

        theme_apply(&app, "zen-focus", &ApplyOptions::default(), &ui)
            .await
            .unwrap();
        assert_eq!(app.config.current_theme().await.unwrap().as_deref(), Some("Default Dark Modern"));

        theme_apply(&app, "my-nord", &ApplyOptions::default(), &ui)
            .await
            .unwrap();
        let live = app.config.read_settings().await.unwrap();
        assert_eq!(live["workbench.colorTheme"], "Nord");
        assert_eq!(live["breadcrumbs.enabled"], false);

        theme_list(&app, &["custom".to_string()], &ui).await.unwrap();
        theme_search(&app, "nord", &ui).await.unwrap();
        theme_delete(&app, "my-nord", true, &ui).await.unwrap();
        assert!(!app.themes.is_custom("my-nord").await);
        assert!(theme_delete(&app, "default", true, &ui).await.is_err());
    }

    #[tokio::test]
    async fn test_theme_apply_unknown_has_hint() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let err = theme_apply(&app, "nope", &ApplyOptions::default(), &test_ui())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vibeprof theme list"));
    }

    #[tokio::test]
    async fn test_theme_export_then_import() {
        let temp = TempDir::new().unwrap();
        let app = test_app(&temp, &[]);
        let ui = test_ui();
        let file = temp.path().join("light.vibe-pack.json");

        theme_export(&app, "morning-light", Some(&file), &ui).await.unwrap();
        theme_import(&app, &file, false, &ui).await.unwrap();
        assert!(app.themes.is_custom("morning-light").await);
    }

    #[test]
    fn test_normalize_share_code() {
        assert_eq!(normalize_share_code(" VIBE-ab12 ").unwrap(), "VIBE-ab12");
        assert!(normalize_share_code("ABC").unwrap_err().to_string().contains("Hint:"));
    }
}
