//! Process-wide list of extensions that a switch must never remove.
//!
//! Persisted as `{ "extensions": [id, ...] }`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ProfileError, Result};
use crate::extensions::dedup_ids;
use crate::fs_utils::{exists, read_json, write_json_atomic};
use crate::paths::Paths;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProtectedFile {
    #[serde(default)]
    extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProtectedStore {
    path: PathBuf,
}

impl ProtectedStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.protected_file.clone(),
        }
    }

    /// Current list; a missing file yields an empty list
    ///
    /// A file that exists but does not parse is an error. Treating it as
    /// empty would let a switch remove extensions the user protected.
    pub async fn get(&self) -> Result<Vec<String>> {
        if !exists(&self.path).await {
            return Ok(Vec::new());
        }
        match read_json::<ProtectedFile>(&self.path).await {
            Ok(file) => Ok(file.extensions),
            Err(ProfileError::Json(e)) => Err(ProfileError::InvalidProfileStructure(format!(
                "protected list {} is not valid: {}",
                self.path.display(),
                e
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn set(&self, extensions: Vec<String>) -> Result<()> {
        let mut extensions = extensions;
        dedup_ids(&mut extensions);
        write_json_atomic(&self.path, &ProtectedFile { extensions }).await
    }

    /// Add an id; returns false if it was already protected
    pub async fn add(&self, id: &str) -> Result<bool> {
        let mut current = self.get().await?;
        if current.iter().any(|e| e == id) {
            return Ok(false);
        }
        current.push(id.to_string());
        self.set(current).await?;
        log::info!("Protected extension '{}'", id);
        Ok(true)
    }

    /// Remove an id; returns false if it was not protected
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut current = self.get().await?;
        let before = current.len();
        current.retain(|e| e != id);
        if current.len() == before {
            return Ok(false);
        }
        self.set(current).await?;
        log::info!("Unprotected extension '{}'", id);
        Ok(true)
    }
}
