//! Profile sharing through GitHub Gists.
//!
//! A shared profile is a public gist holding a single `vibecode-profile.json`
//! file. Uploads need a credential; fetches are anonymous.

use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::credentials::CredentialProvider;
use crate::error::{ProfileError, Result};
use crate::profiles::{Profile, ProfileStore, validate_profile_name};
use crate::share_code;

/// Gist file the profile JSON is stored under
pub const PROFILE_FILE_NAME: &str = "vibecode-profile.json";

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("vibeprof/", env!("CARGO_PKG_VERSION"));

/// Preview of a shared profile, fetched without importing it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedProfileInfo {
    pub name: String,
    pub description: String,
    pub extension_count: usize,
    pub created_at: DateTime<Utc>,
    pub theme: Option<String>,
}

impl From<&Profile> for SharedProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            description: profile
                .metadata
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "No description".to_string()),
            extension_count: profile.extensions.list.len(),
            created_at: profile.metadata.created_at,
            theme: profile.theme.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedGist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Publishes profiles and pulls them back by share code
pub struct SharingService<'a> {
    profiles: &'a ProfileStore,
    credentials: &'a dyn CredentialProvider,
    http_client: reqwest::Client,
    api_base: String,
}

impl<'a> SharingService<'a> {
    pub fn new(
        profiles: &'a ProfileStore,
        credentials: &'a dyn CredentialProvider,
        api_base: impl Into<String>,
    ) -> Self {
        Self::with_client(profiles, credentials, api_base, reqwest::Client::new())
    }

    /// Use a preconfigured HTTP client (proxies, timeouts)
    pub fn with_client(
        profiles: &'a ProfileStore,
        credentials: &'a dyn CredentialProvider,
        api_base: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            profiles,
            credentials,
            http_client: client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Upload a stored profile and return its share code
    ///
    /// Every call creates a new gist, so sharing the same profile twice
    /// yields two different codes.
    pub async fn share(&self, name: &str) -> Result<String> {
        let profile = self.profiles.load(name).await?;
        let token = self.credentials.credential().await?;

        let payload = json!({
            "description": format!(
                "VibeCode Profile: {} - {}",
                profile.name,
                profile
                    .metadata
                    .description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or("Shared profile")
            ),
            "public": true,
            "files": {
                PROFILE_FILE_NAME: { "content": profile.to_json()? }
            }
        });

        log::debug!("Creating gist for profile '{}'", name);
        let response = self
            .http_client
            .post(&self.api_base)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let response = match response.status() {
            StatusCode::UNAUTHORIZED => return Err(ProfileError::AuthenticationFailed),
            status if !status.is_success() => return Err(remote_error(response).await),
            _ => response,
        };

        let created: CreatedGist = response.json().await?;
        let code = share_code::encode(&created.id);
        log::info!("Shared profile '{}' as {}", name, code);
        Ok(code)
    }

    /// Download the profile behind a share code without storing it
    pub async fn fetch(&self, code: &str) -> Result<Profile> {
        let remote_id = share_code::decode(code)?;
        let url = format!("{}/{}", self.api_base, remote_id);

        log::debug!("Fetching gist {}", remote_id);
        let response = self
            .http_client
            .get(&url)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let response = match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProfileError::ShareCodeNotFound(code.trim().to_string()));
            }
            status if !status.is_success() => return Err(remote_error(response).await),
            _ => response,
        };

        let gist: Gist = response.json().await?;
        let file = gist.files.get(PROFILE_FILE_NAME).ok_or_else(|| {
            ProfileError::InvalidShareCode("profile data not found in the shared entry".to_string())
        })?;

        let content = match (&file.content, file.truncated, &file.raw_url) {
            (Some(content), false, _) => content.clone(),
            (_, _, Some(raw_url)) => self.fetch_raw(raw_url).await?,
            _ => {
                return Err(ProfileError::InvalidProfileStructure(
                    "shared entry has no content".to_string(),
                ));
            }
        };

        Profile::from_json(&content)
    }

    async fn fetch_raw(&self, raw_url: &str) -> Result<String> {
        log::debug!("Gist file truncated, fetching {}", raw_url);
        let response = self
            .http_client
            .get(raw_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(response.text().await?)
    }

    /// Fetch a shared profile and store it locally
    ///
    /// The stored copy is tagged with the share code in its metadata
    /// description. An existing local profile with the same name is replaced.
    pub async fn import_profile(&self, code: &str, target_name: Option<&str>) -> Result<Profile> {
        let mut profile = self.fetch(code).await?;

        if let Some(name) = target_name {
            profile.name = name.to_string();
        }
        validate_profile_name(&profile.name)?;

        let marker = format!("(Imported via {})", code.trim());
        profile.metadata.description =
            Some(tag_description(profile.metadata.description.as_deref(), &marker));
        // Listings prefer the top-level description, so it carries the marker too
        if profile.description.as_deref().is_some_and(|d| !d.is_empty()) {
            profile.description = Some(tag_description(profile.description.as_deref(), &marker));
        }
        profile.metadata.updated_at = Utc::now();

        self.profiles.save(&profile, true).await?;
        log::info!("Imported profile '{}' from {}", profile.name, code.trim());
        Ok(profile)
    }

    pub async fn get_profile_info(&self, code: &str) -> Result<SharedProfileInfo> {
        let profile = self.fetch(code).await?;
        Ok(SharedProfileInfo::from(&profile))
    }
}

async fn remote_error(response: Response) -> ProfileError {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("Unknown error").to_string();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(fallback),
        Err(_) => fallback,
    };
    ProfileError::RemoteStoreError {
        status: status.as_u16(),
        message,
    }
}

fn tag_description(description: Option<&str>, marker: &str) -> String {
    format!("{} {}", description.unwrap_or(""), marker)
        .trim()
        .to_string()
}
