//! Diagnostic tool for vibeprof.
//!
//! Implements `vibeprof doctor`, which checks:
//! - the data directories and the editor user directory
//! - the state file and the profiles it points at
//! - the live settings and keybindings files
//! - the editor CLI used for extensions
//! - every stored profile
//! - the protected list and custom theme packs
//! - sharing credentials
//!
//! Each check prints its findings and reports pass/fail.

use anstyle::AnsiColor;
use tokio::fs;

use crate::app::App;
use crate::credentials::validate_token_format;
use crate::fs_utils::exists;
use crate::paths::TOKEN_ENV_VAR;
use crate::state::State;
use crate::themes::builtin_packs;
use crate::ui::Ui;

/// Run every check; returns the number of checks that found problems
pub async fn run_doctor(app: &App, ui: &Ui) -> usize {
    let paths = &app.paths;
    ui.section("vibeprof Doctor");
    ui.newline();

    let mut failed = 0;
    let mut tally = |ok: bool| {
        if !ok {
            failed += 1;
        }
    };

    tally(
        check_step(ui, "Directories", async || {
            let mut ok = true;
            for (label, dir) in [
                ("Data directory", &paths.base_dir),
                ("Profiles directory", &paths.profiles_dir),
                ("Backups directory", &paths.backups_dir),
            ] {
                if exists(dir).await {
                    ui.println(format!("  {} {} exists: {}", ui.icon_ok(), label, dir.display()));
                } else {
                    ui.println(format!("  {} {} missing: {}", ui.icon_err(), label, dir.display()));
                    ok = false;
                }
            }

            if exists(&paths.editor_dir).await {
                ui.println(format!(
                    "  {} Editor directory exists: {}",
                    ui.icon_ok(),
                    paths.editor_dir.display()
                ));
            } else {
                // The editor may simply not have been started yet
                ui.println(format!(
                    "  {} Editor directory missing: {}",
                    ui.icon_warn(),
                    paths.editor_dir.display()
                ));
            }
            ok
        })
        .await,
    );

    tally(
        check_step(ui, "State File", async || match State::read(&paths.state_file) {
            Ok(state) => {
                ui.println(format!("  {} State file readable", ui.icon_ok()));
                let mut ok = true;
                if let Some(name) = &state.active_profile {
                    if app.profiles.exists(name).await {
                        ui.println(format!("  {} Active profile: {}", ui.icon_ok(), name));
                    } else {
                        ui.println(format!("  {} Active profile '{}' is MISSING", ui.icon_err(), name));
                        ok = false;
                    }
                } else {
                    ui.println(format!("  {} No active profile set", ui.icon_warn()));
                }
                if let Some(backup) = &state.last_backup {
                    if app.profiles.exists(backup).await {
                        ui.println(format!("  {} Undo point available: {}", ui.icon_ok(), backup));
                    } else {
                        ui.println(format!("  {} Undo point '{}' was deleted", ui.icon_warn(), backup));
                    }
                }
                ok
            }
            Err(e) => {
                ui.println(format!("  {} State file corrupt: {}", ui.icon_err(), e));
                false
            }
        })
        .await,
    );

    tally(
        check_step(ui, "Editor Configuration", async || {
            let mut ok = true;
            match app.config.read_settings().await {
                Ok(settings) => ui.println(format!(
                    "  {} settings.json readable ({} keys, theme: {})",
                    ui.icon_ok(),
                    settings.len(),
                    crate::config_store::theme_of(&settings).unwrap_or_else(|| "(default)".into())
                )),
                Err(e) => {
                    ui.println(format!("  {} settings.json invalid: {}", ui.icon_err(), e));
                    ok = false;
                }
            }
            match app.config.read_keybindings().await {
                Ok(bindings) => ui.println(format!(
                    "  {} keybindings.json readable ({} bindings)",
                    ui.icon_ok(),
                    bindings.len()
                )),
                Err(e) => {
                    ui.println(format!("  {} keybindings.json invalid: {}", ui.icon_err(), e));
                    ok = false;
                }
            }
            ok
        })
        .await,
    );

    tally(
        check_step(ui, "Editor CLI", async || match app.extensions.list_installed().await {
            Ok(installed) => {
                ui.println(format!(
                    "  {} '{}' works ({} extensions installed)",
                    ui.icon_ok(),
                    paths.editor_cli,
                    installed.len()
                ));
                true
            }
            Err(e) => {
                ui.println(format!("  {} {}", ui.icon_err(), e));
                ui.println(ui.dim("    Set VIBEPROF_EDITOR_CLI if the editor binary is not `code`."));
                false
            }
        })
        .await,
    );

    tally(
        check_step(ui, "Profiles", async || {
            let names = match profile_dir_names(app).await {
                Ok(names) => names,
                Err(e) => {
                    ui.println(format!("  {} Failed to read profiles: {}", ui.icon_err(), e));
                    return false;
                }
            };
            if names.is_empty() {
                ui.println(format!("  {} No profiles found", ui.icon_warn()));
                return true;
            }

            ui.println(format!("  Found {} profiles:", names.len()));
            app.profiles.invalidate();
            let mut all_valid = true;
            for name in names {
                match app.profiles.load(&name).await {
                    Ok(profile) if profile.name == name => ui.println(format!(
                        "    {} {} ({} extensions)",
                        ui.icon_ok(),
                        name,
                        profile.extensions.list.len()
                    )),
                    Ok(profile) => ui.println(format!(
                        "    {} {} (record is named '{}')",
                        ui.icon_warn(),
                        name,
                        profile.name
                    )),
                    Err(e) => {
                        ui.println(format!("    {} {} ({})", ui.icon_err(), name, e));
                        all_valid = false;
                    }
                }
            }
            all_valid
        })
        .await,
    );

    tally(
        check_step(ui, "Protected Extensions", async || {
            if !exists(&paths.protected_file).await {
                ui.println(format!("  {} No protected extensions", ui.icon_ok()));
                return true;
            }
            match app.protected.get().await {
                Ok(list) => {
                    ui.println(format!("  {} {} protected extension(s)", ui.icon_ok(), list.len()));
                    true
                }
                Err(e) => {
                    ui.println(format!("  {} Protected list unreadable: {}", ui.icon_err(), e));
                    false
                }
            }
        })
        .await,
    );

    tally(
        check_step(ui, "Theme Packs", async || match app.themes.scan_custom().await {
            Ok(scanned) => {
                let broken: Vec<_> = scanned.iter().filter(|(_, parsed)| parsed.is_err()).collect();
                ui.println(format!(
                    "  {} {} built-in, {} custom theme pack(s)",
                    ui.icon_ok(),
                    builtin_packs().len(),
                    scanned.len() - broken.len()
                ));
                for (path, parsed) in &broken {
                    if let Err(e) = parsed {
                        ui.println(format!("  {} {}: {}", ui.icon_err(), path.display(), e));
                    }
                }
                broken.is_empty()
            }
            Err(e) => {
                ui.println(format!("  {} Custom theme directory unreadable: {}", ui.icon_err(), e));
                false
            }
        })
        .await,
    );

    check_step(ui, "Sharing Credentials", async || {
        if std::env::var_os(TOKEN_ENV_VAR).is_some() {
            ui.println(format!("  {} Token provided by ${}", ui.icon_ok(), TOKEN_ENV_VAR));
        } else if let Ok(token) = fs::read_to_string(&paths.token_file).await {
            if validate_token_format(token.trim()).is_ok() {
                ui.println(format!("  {} Token file present", ui.icon_ok()));
            } else {
                ui.println(format!("  {} Token file has an unexpected format", ui.icon_warn()));
            }
        } else {
            ui.println(format!(
                "  {} No token yet; `vibeprof profile share` will walk you through setup",
                ui.icon_warn()
            ));
        }
        true
    })
    .await;

    failed
}

async fn profile_dir_names(app: &App) -> std::io::Result<Vec<String>> {
    let dir = &app.paths.profiles_dir;
    let mut names = Vec::new();
    if !exists(dir).await {
        return Ok(names);
    }
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

async fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: AsyncFnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn().await;
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}
