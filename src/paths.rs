use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Default remote blob store endpoint
pub const DEFAULT_GIST_API: &str = "https://api.github.com/gists";

/// Environment variable holding the remote store token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// All computed paths and endpoints used by vibeprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.vibecode (or $VIBEPROF_HOME)
    pub base_dir: PathBuf,
    /// ~/.vibecode/profiles
    pub profiles_dir: PathBuf,
    /// ~/.vibecode/backups
    pub backups_dir: PathBuf,
    /// ~/.vibecode/custom-themes
    pub custom_themes_dir: PathBuf,
    /// ~/.vibecode/state.json
    pub state_file: PathBuf,
    /// ~/.vibecode/protected-extensions.json
    pub protected_file: PathBuf,
    /// ~/.vibecode/github-token
    pub token_file: PathBuf,
    /// Editor user data dir, e.g. ~/.config/Code/User (or $VIBEPROF_EDITOR_DIR)
    pub editor_dir: PathBuf,
    /// <editor_dir>/settings.json
    pub editor_settings: PathBuf,
    /// <editor_dir>/keybindings.json
    pub editor_keybindings: PathBuf,
    /// Editor CLI used for extension management (`code` or $VIBEPROF_EDITOR_CLI)
    pub editor_cli: String,
    /// Remote store API base (or $VIBEPROF_GIST_API)
    pub gist_api: String,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;

        let base_dir = env_path("VIBEPROF_HOME")
            .unwrap_or_else(|| base_dirs.home_dir().join(".vibecode"));
        let editor_dir = env_path("VIBEPROF_EDITOR_DIR")
            .unwrap_or_else(|| base_dirs.config_dir().join("Code").join("User"));
        let editor_cli = std::env::var("VIBEPROF_EDITOR_CLI").unwrap_or_else(|_| "code".into());
        let gist_api =
            std::env::var("VIBEPROF_GIST_API").unwrap_or_else(|_| DEFAULT_GIST_API.into());

        Ok(Self::with_dirs(&base_dir, &editor_dir, editor_cli, gist_api))
    }

    /// Lay out every path below an explicit data dir and editor dir
    pub fn with_dirs(
        base_dir: &Path,
        editor_dir: &Path,
        editor_cli: impl Into<String>,
        gist_api: impl Into<String>,
    ) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            profiles_dir: base_dir.join("profiles"),
            backups_dir: base_dir.join("backups"),
            custom_themes_dir: base_dir.join("custom-themes"),
            state_file: base_dir.join("state.json"),
            protected_file: base_dir.join("protected-extensions.json"),
            token_file: base_dir.join("github-token"),
            editor_dir: editor_dir.to_path_buf(),
            editor_settings: editor_dir.join("settings.json"),
            editor_keybindings: editor_dir.join("keybindings.json"),
            editor_cli: editor_cli.into(),
            gist_api: gist_api.into(),
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    /// Get the path to a specific profile's record
    pub fn profile_file(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join("profile.json")
    }

    /// Get the path to a custom theme pack file
    pub fn custom_theme_file(&self, id: &str) -> PathBuf {
        self.custom_themes_dir.join(format!("{}.vibe-pack.json", id))
    }

    /// Get the path to a backup directory
    pub fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(name)
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.profiles_dir).with_context(|| {
            format!(
                "Failed to create profiles directory: {:?}",
                self.profiles_dir
            )
        })?;
        std::fs::create_dir_all(&self.backups_dir).with_context(|| {
            format!("Failed to create backups directory: {:?}", self.backups_dir)
        })?;
        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
