//! Credential resolution for the remote store.
//!
//! Lookup order: the `GITHUB_TOKEN` environment variable, the token file
//! in the data dir, then an interactive prompt. A token obtained through
//! the prompt is validated and saved to the token file.

use async_trait::async_trait;
use inquire::{Password, PasswordDisplayMode, Select};
use std::path::PathBuf;
use tokio::fs;

use crate::error::{ProfileError, Result};
use crate::paths::{Paths, TOKEN_ENV_VAR};
use crate::ui::Ui;

/// Page that creates a token with the `gist` scope preselected
pub const TOKEN_SETUP_URL: &str =
    "https://github.com/settings/tokens/new?scopes=gist&description=VibeCode+Profile+Sharing";

const TOKEN_PREFIXES: [&str; 2] = ["ghp_", "github_pat_"];

/// Supplies the credential used for authenticated uploads
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<String>;
}

/// Interactive step of credential setup
///
/// Returns `Ok(None)` when the user cancels.
pub trait TokenPrompt: Send + Sync {
    fn prompt_token(&self) -> Result<Option<String>>;
}

/// Check that a token looks like a GitHub personal access token
pub fn validate_token_format(token: &str) -> Result<()> {
    if TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
        Ok(())
    } else {
        Err(ProfileError::InvalidCredentialFormat)
    }
}

/// Environment, then token file, then prompt
pub struct CredentialChain {
    token_file: PathBuf,
    prompt: Box<dyn TokenPrompt>,
}

impl CredentialChain {
    pub fn new(paths: &Paths, prompt: Box<dyn TokenPrompt>) -> Self {
        Self {
            token_file: paths.token_file.clone(),
            prompt,
        }
    }

    async fn from_file(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.token_file).await {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProfileError::io(&self.token_file)(e)),
        }
    }

    async fn persist(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.token_file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(ProfileError::io(parent))?;
        }
        fs::write(&self.token_file, token)
            .await
            .map_err(ProfileError::io(&self.token_file))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.token_file, perms)
                .await
                .map_err(ProfileError::io(&self.token_file))?;
        }

        log::info!("Saved token to {}", self.token_file.display());
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for CredentialChain {
    async fn credential(&self) -> Result<String> {
        if let Some(token) = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
        {
            log::debug!("Using token from ${}", TOKEN_ENV_VAR);
            return Ok(token);
        }

        if let Some(token) = self.from_file().await? {
            log::debug!("Using token from {}", self.token_file.display());
            return Ok(token);
        }

        let token = self
            .prompt
            .prompt_token()?
            .ok_or(ProfileError::CredentialSetupCancelled)?;
        let token = token.trim().to_string();
        validate_token_format(&token)?;
        self.persist(&token).await?;
        Ok(token)
    }
}

/// A fixed credential, for callers that already hold a token
pub struct StaticCredential(pub String);

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// One-time token setup in the terminal
pub struct TerminalPrompt {
    ui: Ui,
}

impl TerminalPrompt {
    pub fn new(ui: &Ui) -> Self {
        Self { ui: ui.clone() }
    }
}

const OPEN_BROWSER: &str = "Open GitHub in the browser (recommended)";
const HAVE_TOKEN: &str = "I already have a token";
const CANCEL: &str = "Cancel";

impl TokenPrompt for TerminalPrompt {
    fn prompt_token(&self) -> Result<Option<String>> {
        let ui = &self.ui;
        ui.section("GitHub Token Required (One-Time Setup)");
        ui.println("Sharing profiles needs a GitHub token with the \"gist\" scope.");
        ui.newline();

        let choice = match Select::new("How do you want to continue?", vec![OPEN_BROWSER, HAVE_TOKEN, CANCEL])
            .prompt()
        {
            Ok(choice) => choice,
            Err(e) => {
                log::debug!("Token setup prompt aborted: {}", e);
                return Ok(None);
            }
        };

        match choice {
            OPEN_BROWSER => {
                ui.info("Opening browser...");
                ui.println(format!("  {}", TOKEN_SETUP_URL));
                if let Err(e) = open::that(TOKEN_SETUP_URL) {
                    log::debug!("Failed to open browser: {}", e);
                    ui.warn("Could not open the browser. Please visit the URL above manually.");
                }
                ui.newline();
                ui.println("  1. Click \"Generate token\"");
                ui.println("  2. Copy the token (starts with ghp_...)");
                ui.println("  3. Paste it below");
                ui.newline();
            }
            HAVE_TOKEN => {}
            _ => return Ok(None),
        }

        let token = match Password::new("Paste token:")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
        {
            Ok(token) => token,
            Err(e) => {
                log::debug!("Token prompt aborted: {}", e);
                return Ok(None);
            }
        };

        validate_token_format(token.trim())?;
        ui.ok("Token accepted. You can now share profiles!");
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_paths;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct ScriptedPrompt {
        answer: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl TokenPrompt for ScriptedPrompt {
        fn prompt_token(&self) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    fn chain(paths: &Paths, answer: Option<&str>) -> (CredentialChain, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let prompt = ScriptedPrompt {
            answer: answer.map(str::to_string),
            calls: calls.clone(),
        };
        (CredentialChain::new(paths, Box::new(prompt)), calls)
    }

    fn clear_env() {
        unsafe { std::env::remove_var(TOKEN_ENV_VAR) };
    }

    #[test]
    fn test_validate_token_format() {
        assert!(validate_token_format("ghp_abc").is_ok());
        assert!(validate_token_format("github_pat_abc").is_ok());
        assert!(matches!(
            validate_token_format("gho_abc"),
            Err(ProfileError::InvalidCredentialFormat)
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_wins() {
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        std::fs::create_dir_all(&paths.base_dir).unwrap();
        std::fs::write(&paths.token_file, "ghp_from_file").unwrap();
        unsafe { std::env::set_var(TOKEN_ENV_VAR, "ghp_from_env") };

        let (chain, calls) = chain(&paths, None);
        assert_eq!(chain.credential().await.unwrap(), "ghp_from_env");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_token_file_is_trimmed() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);
        std::fs::create_dir_all(&paths.base_dir).unwrap();
        std::fs::write(&paths.token_file, "  ghp_from_file\n").unwrap();

        let (chain, calls) = chain(&paths, None);
        assert_eq!(chain.credential().await.unwrap(), "ghp_from_file");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_prompted_token_is_persisted() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);

        let (chain, calls) = chain(&paths, Some("github_pat_new "));
        assert_eq!(chain.credential().await.unwrap(), "github_pat_new");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_to_string(&paths.token_file).unwrap(), "github_pat_new");
    }

    #[tokio::test]
    #[serial]
    async fn test_prompt_cancel_and_bad_format() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp);

        let (cancelled, _) = chain(&paths, None);
        assert!(matches!(
            cancelled.credential().await,
            Err(ProfileError::CredentialSetupCancelled)
        ));

        let (bad, _) = chain(&paths, Some("not-a-token"));
        assert!(matches!(
            bad.credential().await,
            Err(ProfileError::InvalidCredentialFormat)
        ));
        assert!(!paths.token_file.exists());
    }
}
