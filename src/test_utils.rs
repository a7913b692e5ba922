//! Test utilities shared across test modules
//!
//! Helpers here build a throwaway data dir and editor dir inside a temp
//! directory, sample profiles, and an in-memory extension manager.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::config_store::Settings;
use crate::error::{ProfileError, Result};
use crate::extensions::ExtensionManager;
use crate::paths::{DEFAULT_GIST_API, Paths};
use crate::profiles::{ExtensionConfig, PROFILE_VERSION, Profile, ProfileMetadata};

/// Create a Paths struct for testing using a temporary directory
///
/// Mimics the real ~/.vibecode/ and editor User/ layout.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_dirs(
        &temp_dir.path().join(".vibecode"),
        &temp_dir.path().join("Code/User"),
        "code",
        DEFAULT_GIST_API,
    )
}

/// A strict-mode profile with no theme and empty settings
pub fn sample_profile(name: &str, extensions: &[&str]) -> Profile {
    let now = Utc::now();
    Profile {
        name: name.to_string(),
        description: None,
        theme: None,
        extensions: ExtensionConfig {
            list: extensions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        settings: Settings::new(),
        keybindings: Vec::new(),
        metadata: ProfileMetadata {
            description: None,
            created_at: now,
            updated_at: now,
            version: PROFILE_VERSION.to_string(),
        },
    }
}

/// Extension operation recorded by [`FakeExtensions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtOp {
    Install(String),
    Uninstall(String),
}

/// In-memory extension manager
///
/// Keeps installation order, logs every mutating call and can be told to
/// fail on a specific id.
#[derive(Debug, Default)]
pub struct FakeExtensions {
    installed: Mutex<Vec<String>>,
    ops: Mutex<Vec<ExtOp>>,
    fail_on: Option<String>,
}

impl FakeExtensions {
    pub fn with_installed(ids: &[&str]) -> Self {
        Self {
            installed: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail_on = Some(id.to_string());
        self
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<ExtOp> {
        self.ops.lock().unwrap().clone()
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(id) {
            return Err(ProfileError::ExtensionOperationFailed {
                id: id.to_string(),
                cause: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ExtensionManager for FakeExtensions {
    async fn list_installed(&self) -> Result<Vec<String>> {
        Ok(self.installed())
    }

    async fn install(&self, id: &str) -> Result<()> {
        self.check(id)?;
        self.ops.lock().unwrap().push(ExtOp::Install(id.to_string()));
        let mut installed = self.installed.lock().unwrap();
        if !installed.iter().any(|i| i == id) {
            installed.push(id.to_string());
        }
        Ok(())
    }

    async fn uninstall(&self, id: &str) -> Result<()> {
        self.check(id)?;
        self.ops.lock().unwrap().push(ExtOp::Uninstall(id.to_string()));
        self.installed.lock().unwrap().retain(|i| i != id);
        Ok(())
    }
}
