//! Share codes: `VIBE-<remote id>`.
//!
//! The prefix is case-sensitive, the hex id is not. Decoding is pure.

use crate::error::{ProfileError, Result};

pub const SHARE_CODE_PREFIX: &str = "VIBE-";

pub fn encode(remote_id: &str) -> String {
    format!("{}{}", SHARE_CODE_PREFIX, remote_id)
}

/// Extract the remote id from a share code
///
/// Surrounding whitespace is ignored.
pub fn decode(code: &str) -> Result<String> {
    let code = code.trim();

    let Some(remote_id) = code.strip_prefix(SHARE_CODE_PREFIX) else {
        return Err(ProfileError::InvalidShareCode(format!(
            "expected format {}<id>, got '{}'",
            SHARE_CODE_PREFIX, code
        )));
    };

    if remote_id.is_empty() {
        return Err(ProfileError::InvalidShareCode("missing remote id".to_string()));
    }

    if !remote_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ProfileError::InvalidShareCode(format!(
            "remote id '{}' must be hexadecimal",
            remote_id
        )));
    }

    Ok(remote_id.to_string())
}

pub fn is_valid(code: &str) -> bool {
    decode(code).is_ok()
}

/// Turn a `gist.github.com/<user>/<id>` URL into a share code
pub fn from_gist_url(url: &str) -> Result<String> {
    let invalid = || ProfileError::InvalidShareCode(format!("not a gist URL: '{}'", url));

    let (_, rest) = url.split_once("gist.github.com/").ok_or_else(invalid)?;
    let mut segments = rest.split(['/', '?', '#']);
    let _user = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let id = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

    let code = encode(id);
    decode(&code).map_err(|_| invalid())?;
    Ok(code)
}
