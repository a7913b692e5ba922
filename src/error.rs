//! Error taxonomy for the profile engine.
//!
//! Library modules return [`ProfileError`]; the command layer wraps it in
//! `anyhow` for display.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Profile '{0}' already exists. Use --overwrite to replace it.")]
    ProfileAlreadyExists(String),

    #[error("Invalid profile structure: {0}")]
    InvalidProfileStructure(String),

    #[error("Backup '{0}' not found")]
    BackupNotFound(String),

    #[error("Theme '{0}' not found")]
    ThemeNotFound(String),

    #[error("Theme '{0}' is built in and cannot be deleted")]
    BuiltInTheme(String),

    #[error("Theme '{0}' already exists. Use --overwrite to replace it.")]
    ThemeAlreadyExists(String),

    #[error("Invalid theme pack: {0}")]
    InvalidThemePack(String),

    #[error("Invalid profile name '{name}': {reason}")]
    InvalidProfileName { name: String, reason: String },

    /// The remote store answered 404 for the id behind a share code
    #[error("Share code '{0}' not found on the remote store")]
    ShareCodeNotFound(String),

    #[error("Invalid share code: {0}")]
    InvalidShareCode(String),

    #[error(
        "Authentication with the remote store failed. Check your token.\nGet a new token from: https://github.com/settings/tokens (select \"gist\" scope)"
    )]
    AuthenticationFailed,

    #[error("Invalid token format. GitHub tokens start with \"ghp_\" or \"github_pat_\".")]
    InvalidCredentialFormat,

    #[error("Token setup cancelled. You can export to a file instead: vibeprof profile export <name>")]
    CredentialSetupCancelled,

    #[error("Remote store error: {status} - {message}")]
    RemoteStoreError { status: u16, message: String },

    #[error("Extension operation failed for '{id}': {cause}")]
    ExtensionOperationFailed { id: String, cause: String },

    #[error("Failed to list installed extensions: {0}")]
    ExtensionListFailed(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

impl ProfileError {
    /// Build a closure that tags an `io::Error` with the path it happened on
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
