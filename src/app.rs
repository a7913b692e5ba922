//! Service container built once per process.
//!
//! Every store is constructed here from a single [`Paths`] value and handed
//! out by reference, so commands never reach for global state.

use crate::backups::BackupStore;
use crate::config_store::ConfigStore;
use crate::credentials::CredentialProvider;
use crate::extensions::{EditorCli, ExtensionManager};
use crate::paths::Paths;
use crate::profiles::ProfileStore;
use crate::protected::ProtectedStore;
use crate::sharing::SharingService;
use crate::switch::SwitchEngine;
use crate::themes::{ThemeApplier, ThemeStore};

pub struct App {
    pub paths: Paths,
    pub config: ConfigStore,
    pub profiles: ProfileStore,
    pub backups: BackupStore,
    pub protected: ProtectedStore,
    pub themes: ThemeStore,
    pub extensions: Box<dyn ExtensionManager>,
}

impl App {
    /// Wire every store to `paths`, driving extensions through the editor CLI
    pub fn new(paths: Paths) -> Self {
        let extensions = Box::new(EditorCli::new(paths.editor_cli.clone()));
        Self::with_extensions(paths, extensions)
    }

    pub fn with_extensions(paths: Paths, extensions: Box<dyn ExtensionManager>) -> Self {
        Self {
            config: ConfigStore::new(&paths),
            profiles: ProfileStore::new(&paths),
            backups: BackupStore::new(&paths),
            protected: ProtectedStore::new(&paths),
            themes: ThemeStore::new(&paths),
            extensions,
            paths,
        }
    }

    pub fn switch_engine(&self) -> SwitchEngine<'_> {
        SwitchEngine {
            profiles: &self.profiles,
            config: &self.config,
            backups: &self.backups,
            protected: &self.protected,
            extensions: self.extensions.as_ref(),
            state_file: &self.paths.state_file,
        }
    }

    pub fn theme_applier(&self) -> ThemeApplier<'_> {
        ThemeApplier {
            config: &self.config,
            backups: &self.backups,
            extensions: self.extensions.as_ref(),
        }
    }

    pub fn sharing<'a>(&'a self, credentials: &'a dyn CredentialProvider) -> SharingService<'a> {
        SharingService::new(&self.profiles, credentials, self.paths.gist_api.clone())
    }
}
