//! Filesystem utility functions
//!
//! JSON read/write helpers shared by the stores. Writes are atomic: the
//! content goes to a sibling temp file which is then renamed over the target.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

use crate::error::{ProfileError, Result};

/// Read and parse a JSON file, tolerating `//` and `/* */` comments
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .await
        .map_err(ProfileError::io(path))?;
    let cleaned = strip_json_comments(&content);
    Ok(serde_json::from_str(&cleaned)?)
}

/// Serialize `value` as 2-space indented JSON and write it atomically
///
/// Parent directories are created as needed.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(ProfileError::io(parent))?;
    }

    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)
        .await
        .map_err(ProfileError::io(&temp_path))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(ProfileError::io(path))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Check whether a path exists without following errors
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Remove comments from JSON-with-comments content
///
/// String literals are respected, so `"http://x"` survives intact.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
