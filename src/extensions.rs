//! Extension set differencing and the extension-management capability.
//!
//! [`diff_extensions`] and [`filter_protected`] are pure; installing and
//! removing extensions goes through the [`ExtensionManager`] trait so the
//! switch engine can be driven by the editor CLI or by a test double.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::process::Command;

use crate::error::{ProfileError, Result};

/// Result of comparing the current extension set with a target set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionDiff {
    /// In target but not current, in target order
    pub to_install: Vec<String>,
    /// In current but not target, in current order
    pub to_remove: Vec<String>,
    /// In both, in current order
    pub to_keep: Vec<String>,
}

/// Removal set partitioned by the protection list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedSplit {
    pub can_remove: Vec<String>,
    pub protected_list: Vec<String>,
}

pub fn diff_extensions(current: &[String], target: &[String]) -> ExtensionDiff {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let target_set: HashSet<&str> = target.iter().map(String::as_str).collect();

    ExtensionDiff {
        to_install: target
            .iter()
            .filter(|id| !current_set.contains(id.as_str()))
            .cloned()
            .collect(),
        to_remove: current
            .iter()
            .filter(|id| !target_set.contains(id.as_str()))
            .cloned()
            .collect(),
        to_keep: current
            .iter()
            .filter(|id| target_set.contains(id.as_str()))
            .cloned()
            .collect(),
    }
}

pub fn filter_protected(to_remove: &[String], protected: &[String]) -> ProtectedSplit {
    let protected_set: HashSet<&str> = protected.iter().map(String::as_str).collect();
    let (protected_list, can_remove): (Vec<String>, Vec<String>) = to_remove
        .iter()
        .cloned()
        .partition(|id| protected_set.contains(id.as_str()));

    ProtectedSplit {
        can_remove,
        protected_list,
    }
}

/// Drop repeated ids, keeping the first occurrence
pub fn dedup_ids(ids: &mut Vec<String>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

/// External capability that lists, installs and removes extensions by id
#[async_trait]
pub trait ExtensionManager: Send + Sync {
    async fn list_installed(&self) -> Result<Vec<String>>;

    async fn install(&self, id: &str) -> Result<()>;

    async fn uninstall(&self, id: &str) -> Result<()>;
}

/// [`ExtensionManager`] backed by the editor's command line (`code`)
#[derive(Debug, Clone)]
pub struct EditorCli {
    program: String,
}

impl EditorCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> std::result::Result<String, String> {
        log::debug!("Running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| format!("failed to run '{}': {}", self.program, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(if stderr.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                stderr
            })
        }
    }
}

#[async_trait]
impl ExtensionManager for EditorCli {
    async fn list_installed(&self) -> Result<Vec<String>> {
        let stdout = self
            .run(&["--list-extensions"])
            .await
            .map_err(ProfileError::ExtensionListFailed)?;
        Ok(parse_extension_list(&stdout))
    }

    async fn install(&self, id: &str) -> Result<()> {
        self.run(&["--install-extension", id, "--force"])
            .await
            .map(|_| ())
            .map_err(|cause| ProfileError::ExtensionOperationFailed {
                id: id.to_string(),
                cause,
            })
    }

    async fn uninstall(&self, id: &str) -> Result<()> {
        self.run(&["--uninstall-extension", id])
            .await
            .map(|_| ())
            .map_err(|cause| ProfileError::ExtensionOperationFailed {
                id: id.to_string(),
                cause,
            })
    }
}

fn parse_extension_list(stdout: &str) -> Vec<String> {
    let mut ids: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    dedup_ids(&mut ids);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_preserves_source_order() {
        let diff = diff_extensions(&ids(&["c", "a", "b"]), &ids(&["e", "b", "d", "a"]));
        assert_eq!(diff.to_install, ids(&["e", "d"]));
        assert_eq!(diff.to_remove, ids(&["c"]));
        assert_eq!(diff.to_keep, ids(&["a", "b"]));
    }

    #[test]
    fn test_diff_set_identities() {
        let a = ids(&["x", "y", "z", "w"]);
        let b = ids(&["y", "w", "v"]);
        let diff = diff_extensions(&a, &b);

        for id in &diff.to_install {
            assert!(b.contains(id) && !a.contains(id));
            assert!(!diff.to_remove.contains(id));
        }
        for id in &diff.to_remove {
            assert!(a.contains(id) && !b.contains(id));
        }
        for id in &diff.to_keep {
            assert!(a.contains(id) && b.contains(id));
        }
        assert_eq!(diff.to_remove.len() + diff.to_keep.len(), a.len());
        assert_eq!(diff.to_install.len() + diff.to_keep.len(), b.len());
    }

    #[test]
    fn test_identical_sets_are_noop() {
        let diff = diff_extensions(&ids(&["a", "b"]), &ids(&["b", "a"]));
        assert!(diff.to_install.is_empty());
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.to_keep, ids(&["a", "b"]));
    }

    #[test]
    fn test_filter_protected_partitions_exactly() {
        let to_remove = ids(&["a", "b", "c", "d"]);
        let split = filter_protected(&to_remove, &ids(&["c", "a", "zzz"]));
        assert_eq!(split.can_remove, ids(&["b", "d"]));
        assert_eq!(split.protected_list, ids(&["a", "c"]));

        let mut union = split.can_remove.clone();
        union.extend(split.protected_list.clone());
        union.sort();
        assert_eq!(union, to_remove);
    }

    #[test]
    fn test_protected_scenario() {
        let diff = diff_extensions(&ids(&["a", "b", "c"]), &ids(&["b", "c", "d"]));
        let split = filter_protected(&diff.to_remove, &ids(&["a"]));
        assert_eq!(diff.to_install, ids(&["d"]));
        assert!(split.can_remove.is_empty());
        assert_eq!(split.protected_list, ids(&["a"]));
    }

    #[test]
    fn test_parse_extension_list() {
        let parsed = parse_extension_list("ms-python.python\n\n  esbenp.prettier-vscode \nms-python.python\n");
        assert_eq!(parsed, ids(&["ms-python.python", "esbenp.prettier-vscode"]));
    }

    #[tokio::test]
    async fn test_missing_cli_reports_list_failure() {
        let cli = EditorCli::new("vibeprof-definitely-missing-binary");
        let err = cli.list_installed().await.unwrap_err();
        assert!(matches!(err, ProfileError::ExtensionListFailed(_)));

        let err = cli.install("a.b").await.unwrap_err();
        assert!(matches!(err, ProfileError::ExtensionOperationFailed { ref id, .. } if id == "a.b"));
    }
}
