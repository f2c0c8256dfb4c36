use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// A Galaxy data library as returned by `/api/libraries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub root_folder_id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// A folder inside a library. Galaxy reports listed folders by path (`/GTFs`)
/// and freshly created ones by bare name (`GTFs`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

impl Folder {
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    pub fn path(&self) -> String {
        if self.name.starts_with('/') {
            self.name.clone()
        } else {
            format!("/{}", self.name)
        }
    }

    /// Library path of an item named `name` directly inside this folder.
    /// `name` is taken verbatim and may itself contain `/`.
    pub fn child_path(&self, name: &str) -> String {
        let path = self.path();
        format!("{}/{name}", path.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<DatasetState>,
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetState {
    New,
    Upload,
    Queued,
    Running,
    SettingMetadata,
    Paused,
    Ok,
    Error,
    FailedMetadata,
    Discarded,
    #[serde(other)]
    Unknown,
}

impl DatasetState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DatasetState::Ok
                | DatasetState::Error
                | DatasetState::FailedMetadata
                | DatasetState::Discarded
        )
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            DatasetState::New => "new",
            DatasetState::Upload => "upload",
            DatasetState::Queued => "queued",
            DatasetState::Running => "running",
            DatasetState::SettingMetadata => "setting_metadata",
            DatasetState::Paused => "paused",
            DatasetState::Ok => "ok",
            DatasetState::Error => "error",
            DatasetState::FailedMetadata => "failed_metadata",
            DatasetState::Discarded => "discarded",
            DatasetState::Unknown => "unknown",
        };
        write!(f, "{value}")
    }
}

/// Base address of a Galaxy server, normalized without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalaxyUrl(String);

impl GalaxyUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for GalaxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GalaxyUrl {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches('/');
        let url =
            Url::parse(trimmed).map_err(|err| LoaderError::InvalidGalaxyUrl(format!("{value}: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(LoaderError::InvalidGalaxyUrl(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Galaxy API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl FromStr for ApiKey {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LoaderError::InvalidApiKey("key is empty".to_string()));
        }
        if !trimmed.chars().all(|ch| ch.is_ascii_graphic()) {
            return Err(LoaderError::InvalidApiKey(
                "key contains non-printable characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}
