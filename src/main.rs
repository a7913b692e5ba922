use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use vibeprof::{
    app::App,
    commands,
    paths::Paths,
    switch::{SaveOptions, SwitchOptions},
    themes::ApplyOptions,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "vibeprof")]
#[command(about = "VibeCode Profile Switcher - snapshot, switch and share editor profiles")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Print debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage, switch and share profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage settings backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Browse, apply and manage theme packs
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },

    /// Show the active profile and live theme
    Current,

    /// Run diagnostics on the vibeprof setup
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save the current editor setup as a profile
    Save {
        /// Name of the profile to create
        name: String,

        /// Short description shown in listings
        #[arg(short, long)]
        description: Option<String>,

        /// Record the current color theme in the profile
        #[arg(long)]
        with_theme: bool,

        /// Do not record installed extensions
        #[arg(long)]
        no_extensions: bool,

        /// Replace an existing profile with the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Switch the editor to a profile
    Switch {
        /// Name of the profile to activate
        name: String,

        /// Show what would change without applying it
        #[arg(long)]
        dry_run: bool,

        /// Keep the current color theme
        #[arg(long)]
        keep_theme: bool,

        /// Leave installed extensions untouched
        #[arg(long)]
        keep_extensions: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List all profiles
    List,

    /// Show detailed information about a profile
    Show {
        name: String,
    },

    /// Delete a profile
    Delete {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Rename a profile
    Rename {
        old_name: String,
        new_name: String,
    },

    /// Preview what switching to a profile would change
    Diff {
        name: String,
    },

    /// Upload a profile and print a share code
    Share {
        name: String,
    },

    /// Import a profile from a share code or gist URL
    Import {
        /// Share code (VIBE-...) or gist URL
        code: String,

        /// Store under a different name
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing profile without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Preview a shared profile without importing it
    Info {
        /// Share code (VIBE-...) or gist URL
        code: String,
    },

    /// Write a profile to a JSON file
    Export {
        name: String,

        /// Output file (defaults to <name>.vibe-profile.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read a profile from a JSON file
    ImportFile {
        file: PathBuf,

        /// Store under a different name
        #[arg(long)]
        name: Option<String>,

        /// Replace an existing profile with the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Manage extensions that switching never removes
    Protected {
        #[command(subcommand)]
        command: ProtectedCommands,
    },
}

#[derive(Subcommand)]
enum ProtectedCommands {
    /// List protected extensions
    List,

    /// Protect an extension
    Add {
        id: String,
    },

    /// Stop protecting an extension
    Remove {
        id: String,
    },

    /// Replace the protected list
    Set {
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up the current settings and keybindings
    Create {
        /// Label used in the backup name
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all backups
    List,

    /// Restore a backup over the current settings
    Restore {
        /// Backup name or a unique part of it
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove backups left by older versions
    Clean,
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// List available theme packs
    List {
        /// Only show packs with one of these tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Apply a theme pack over the current settings
    Apply {
        id: String,

        /// Do not back up the current settings first
        #[arg(long)]
        no_backup: bool,

        /// Do not install the pack's extensions
        #[arg(long)]
        no_extensions: bool,

        /// Apply settings only (no layout, keybindings or extensions)
        #[arg(long)]
        settings_only: bool,
    },

    /// Search theme packs by name, description or tag
    Search {
        query: String,
    },

    /// Save the current settings as a custom theme pack
    Create {
        /// Display name; the id is derived from it
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Extensions the pack relies on (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// Replace an existing custom pack with the same id
        #[arg(long)]
        overwrite: bool,
    },

    /// Delete a custom theme pack
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Write a theme pack to a file
    Export {
        id: String,

        /// Output file (defaults to <id>.vibe-pack.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a theme pack from a file
    Import {
        file: PathBuf,

        /// Replace an existing custom pack with the same id
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "vibeprof", &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new()?;
    let ui = Ui::new(cli.color, cli.no_color);
    let app = App::new(paths);

    match cli.command {
        Commands::Profile { command } => run_profile(&app, command, &ui).await,
        Commands::Backup { command } => run_backup(&app, command, &ui).await,
        Commands::Theme { command } => run_theme(&app, command, &ui).await,
        Commands::Current => commands::current(&app, &ui).await,
        Commands::Doctor => commands::doctor(&app, &ui).await,
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_profile(app: &App, command: ProfileCommands, ui: &Ui) -> Result<()> {
    match command {
        ProfileCommands::Save {
            name,
            description,
            with_theme,
            no_extensions,
            overwrite,
        } => {
            let options = SaveOptions {
                with_theme,
                with_extensions: !no_extensions,
                description,
                overwrite,
            };
            commands::save(app, &name, &options, ui).await
        }
        ProfileCommands::Switch {
            name,
            dry_run,
            keep_theme,
            keep_extensions,
            yes,
        } => {
            let options = SwitchOptions {
                dry_run,
                keep_theme,
                keep_extensions,
                skip_confirm: yes,
            };
            commands::switch(app, &name, &options, ui).await
        }
        ProfileCommands::List => commands::list(app, ui).await,
        ProfileCommands::Show { name } => commands::show(app, &name, ui).await,
        ProfileCommands::Delete { name, force } => commands::delete(app, &name, force, ui).await,
        ProfileCommands::Rename { old_name, new_name } => {
            commands::rename(app, &old_name, &new_name, ui).await
        }
        ProfileCommands::Diff { name } => commands::diff(app, &name, ui).await,
        ProfileCommands::Share { name } => commands::share(app, &name, ui).await,
        ProfileCommands::Import { code, name, force } => {
            commands::import(app, &code, name.as_deref(), force, ui).await
        }
        ProfileCommands::Info { code } => commands::info(app, &code, ui).await,
        ProfileCommands::Export { name, output } => {
            commands::export(app, &name, output.as_deref(), ui).await
        }
        ProfileCommands::ImportFile {
            file,
            name,
            overwrite,
        } => commands::import_file(app, &file, name.as_deref(), overwrite, ui).await,
        ProfileCommands::Protected { command } => match command {
            ProtectedCommands::List => commands::protected_list(app, ui).await,
            ProtectedCommands::Add { id } => commands::protected_add(app, &id, ui).await,
            ProtectedCommands::Remove { id } => commands::protected_remove(app, &id, ui).await,
            ProtectedCommands::Set { ids } => commands::protected_set(app, ids, ui).await,
        },
    }
}

async fn run_backup(app: &App, command: BackupCommands, ui: &Ui) -> Result<()> {
    match command {
        BackupCommands::Create { label } => commands::backup_create(app, label.as_deref(), ui).await,
        BackupCommands::List => commands::backup_list(app, ui).await,
        BackupCommands::Restore { name, yes } => {
            commands::backup_restore(app, &name, yes, ui).await
        }
        BackupCommands::Clean => commands::backup_clean(app, ui).await,
    }
}

async fn run_theme(app: &App, command: ThemeCommands, ui: &Ui) -> Result<()> {
    match command {
        ThemeCommands::List { tags } => commands::theme_list(app, &tags, ui).await,
        ThemeCommands::Apply {
            id,
            no_backup,
            no_extensions,
            settings_only,
        } => {
            let options = ApplyOptions {
                backup: !no_backup,
                layout: !settings_only,
                keybindings: !settings_only,
                install_extensions: !no_extensions && !settings_only,
            };
            commands::theme_apply(app, &id, &options, ui).await
        }
        ThemeCommands::Search { query } => commands::theme_search(app, &query, ui).await,
        ThemeCommands::Create {
            name,
            description,
            tags,
            extensions,
            overwrite,
        } => commands::theme_create(app, &name, description, tags, extensions, overwrite, ui).await,
        ThemeCommands::Delete { id, force } => commands::theme_delete(app, &id, force, ui).await,
        ThemeCommands::Export { id, output } => {
            commands::theme_export(app, &id, output.as_deref(), ui).await
        }
        ThemeCommands::Import { file, overwrite } => {
            commands::theme_import(app, &file, overwrite, ui).await
        }
    }
}
